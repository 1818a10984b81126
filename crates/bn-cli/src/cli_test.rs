use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    Cli::command().debug_assert();
}

#[test]
fn test_subcommand_names_match_steps() {
    for step in Step::ALL {
        let cli = Cli::try_parse_from(["bn", step.name()]).unwrap();
        assert_eq!(cli.command.step(), Some(step));
    }
}

#[test]
fn test_global_args() {
    let cli = Cli::try_parse_from(["bn", "run", "-p", "/tmp/project", "--database", ":memory:"])
        .unwrap();
    assert_eq!(cli.global.project_dir, "/tmp/project");
    assert_eq!(cli.global.database.as_deref(), Some(":memory:"));
    assert!(cli.command.step().is_none());
}

#[test]
fn test_check_takes_a_step() {
    let cli = Cli::try_parse_from(["bn", "check", "fusion"]).unwrap();
    let Commands::Check(args) = cli.command else {
        panic!("expected check");
    };
    assert_eq!(args.step, "fusion");
}
