//! Integration tests for the `example run` command.
use bess_appraise::cli::RunOpts;
use bess_appraise::cli::example::{example_names, handle_example_run_command};
use bess_appraise::settings::Settings;
use tempfile::tempdir;

/// Every bundled example should run to completion
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("BESS_APPRAISE_LOG_LEVEL", "off") };

    let dir = tempdir().unwrap();
    let mut count = 0;
    for name in example_names() {
        let output = dir.path().join(format!("{name}.toml"));
        let opts = RunOpts {
            output: Some(output.clone()),
            ..Default::default()
        };
        handle_example_run_command(name, &opts, Some(Settings::default())).unwrap();
        assert!(output.is_file());
        count += 1;
    }

    assert_eq!(count, 4);
}
