use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use linkbio::config::ClientConfig;
use linkbio::flows::{FlowError, Notification, NotificationKind, Notifier, Session};
use linkbio::net::types::Category;
use linkbio::state::onboarding::{OnboardingState, OnboardingStep};
use linkbio::state::storage::{FileStorage, StorageError};
use linkbio::validation::{LoginForm, OtpForm, ProfileForm, SignupForm, UsernameForm};
use linkbio::{ApiClient, ApiError};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("state directory unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("http client setup failed: {0}")]
    Client(#[from] ApiError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("could not render output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "linkbio", about = "Sign in, onboard and look up link-in-bio profiles")]
struct Cli {
    /// Overrides the API URL from the environment.
    #[arg(long, env = "LINKBIO_API_URL")]
    api_url: Option<String>,

    /// Directory holding the persisted session.
    #[arg(long, env = "LINKBIO_STATE_DIR", default_value = ".linkbio")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    Login(CredentialArgs),
    /// Start a signup; a passcode is mailed to the address.
    Signup(SignupArgs),
    /// Confirm the mailed passcode.
    Verify { otp: String },
    /// Mail a fresh passcode.
    Resend,
    /// Sign in with a Google ID token.
    Google {
        #[arg(long, env = "LINKBIO_GOOGLE_ID_TOKEN", hide_env_values = true)]
        id_token: String,
    },
    /// Reload and print the signed-in user.
    Me,
    Logout,
    Onboarding(OnboardingCommand),
    /// Print the public page for a username.
    Profile { username: String },
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    email: String,

    #[arg(long, env = "LINKBIO_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[command(flatten)]
    credentials: CredentialArgs,

    /// Defaults to `--password`.
    #[arg(long)]
    confirm_password: Option<String>,
}

#[derive(Args, Debug)]
struct OnboardingCommand {
    #[command(subcommand)]
    command: OnboardingSubcommand,
}

#[derive(Subcommand, Debug)]
enum OnboardingSubcommand {
    /// Show collected fields and where to continue.
    Status,
    Category { category: Category },
    Profile(ProfileArgs),
    /// Claim a username and finish onboarding.
    Username { username: String },
    /// Check whether a username is free.
    Check { username: String },
    /// Retry the final submission after a failure.
    Finish,
    /// Discard onboarding progress.
    Reset,
}

#[derive(Args, Debug, Default)]
struct ProfileArgs {
    #[arg(long, default_value = "")]
    display_name: String,
    #[arg(long, default_value = "")]
    business_name: String,
    #[arg(long, default_value = "")]
    business_type: String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, default_value = "")]
    bio: String,
    #[arg(long, default_value = "")]
    creator_type: String,
}

impl ProfileArgs {
    fn into_form(self, category: Category) -> ProfileForm {
        ProfileForm {
            category,
            display_name: self.display_name,
            business_name: self.business_name,
            business_type: self.business_type,
            location: self.location,
            bio: self.bio,
            creator_type: self.creator_type,
        }
    }
}

/// Prints toasts to stderr so stdout stays machine-readable.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        let mark = match notification.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };
        match notification.description {
            Some(description) => eprintln!("[{mark}] {}: {description}", notification.title),
            None => eprintln!("[{mark}] {}", notification.title),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OnboardingStatus {
    resume_at: OnboardingStep,
    next_step: OnboardingStep,
    state: OnboardingState,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Flow(FlowError::Invalid(errors))) => {
            for (field, message) in errors.iter() {
                eprintln!("{field}: {message}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config = config.with_api_url(api_url);
    }
    tracing::debug!(api_url = %config.api_url, state_dir = %cli.state_dir.display(), "starting");

    let api = ApiClient::new(&config)?;
    let storage = Arc::new(FileStorage::open(&cli.state_dir)?);
    let mut session = Session::new(api, storage, StderrNotifier);

    match cli.command {
        Command::Login(args) => {
            let form = LoginForm { email: args.email, password: args.password };
            print_json(&session.login(&form).await?)
        }
        Command::Signup(args) => {
            let confirm_password = args.confirm_password.unwrap_or_else(|| args.credentials.password.clone());
            let form = SignupForm {
                email: args.credentials.email,
                password: args.credentials.password,
                confirm_password,
            };
            session.signup(&form).await?;
            Ok(())
        }
        Command::Verify { otp } => print_json(&session.verify_otp(&OtpForm { otp }).await?),
        Command::Resend => {
            session.resend_otp().await?;
            Ok(())
        }
        Command::Google { id_token } => print_json(&session.google_sign_in(&id_token).await?),
        Command::Me => print_json(&session.refresh_user().await?),
        Command::Logout => {
            session.logout().await;
            Ok(())
        }
        Command::Onboarding(onboarding) => run_onboarding(&mut session, onboarding).await,
        Command::Profile { username } => print_json(&session.view_profile(&username).await?),
    }
}

async fn run_onboarding<N: Notifier>(
    session: &mut Session<N>,
    onboarding: OnboardingCommand,
) -> Result<(), CliError> {
    match onboarding.command {
        OnboardingSubcommand::Status => {
            let resume_at = session.resume();
            let status = OnboardingStatus {
                resume_at,
                next_step: session.onboarding().next_step(),
                state: session.onboarding().snapshot(),
            };
            print_json(&status)
        }
        OnboardingSubcommand::Category { category } => {
            session.choose_category(category).await?;
            Ok(())
        }
        OnboardingSubcommand::Profile(args) => {
            // Without a stored category the flow rejects the form as out of order.
            let category = session.onboarding().state().category.unwrap_or(Category::Business);
            session.save_profile(&args.into_form(category))?;
            Ok(())
        }
        OnboardingSubcommand::Username { username } => {
            print_json(&session.claim_username(&UsernameForm { username }).await?)
        }
        OnboardingSubcommand::Check { username } => {
            print_json(&session.check_username(&UsernameForm { username }).await?)
        }
        OnboardingSubcommand::Finish => print_json(&session.finish_onboarding().await?),
        OnboardingSubcommand::Reset => {
            session.onboarding_mut().reset();
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
