use clap::{CommandFactory, Parser};

use super::*;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parses_onboarding_category() {
    let args = ["linkbio", "--state-dir", "/tmp/lb", "onboarding", "category", "creator"];
    let cli = Cli::try_parse_from(args).unwrap();
    assert_eq!(cli.state_dir, PathBuf::from("/tmp/lb"));
    let Command::Onboarding(onboarding) = cli.command else { panic!("expected onboarding command") };
    assert!(matches!(onboarding.command, OnboardingSubcommand::Category { category: Category::Creator }));
}

#[test]
fn rejects_unknown_category() {
    let result = Cli::try_parse_from(["linkbio", "onboarding", "category", "agency"]);
    assert!(result.is_err());
}

#[test]
fn signup_confirm_password_is_optional() {
    let args = ["linkbio", "signup", "--email", "ada@example.com", "--password", "hunter22"];
    let cli = Cli::try_parse_from(args).unwrap();
    let Command::Signup(args) = cli.command else { panic!("expected signup command") };
    assert_eq!(args.credentials.email, "ada@example.com");
    assert!(args.confirm_password.is_none());
}

#[test]
fn profile_args_fill_form_for_category() {
    let args = ProfileArgs {
        business_name: "Jo's Cafe".to_owned(),
        business_type: "cafe".to_owned(),
        ..ProfileArgs::default()
    };
    let form = args.into_form(Category::Business);
    assert_eq!(form.category, Category::Business);
    assert_eq!(form.business_name, "Jo's Cafe");
    assert!(form.validate().is_ok());
}
