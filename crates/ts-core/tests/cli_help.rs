//! CLI tests for ts-core: help text, version, config checks and a short
//! simulated run.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Get a Command for the ts-core binary.
fn ts_core() -> Command {
    let mut cmd = cargo_bin_cmd!("ts-core");
    cmd.env_remove("TS_CONFIG")
        .env_remove("TS_CONFIG_DIR")
        .env("TS_LOG", "warn");
    cmd
}

fn config_file(toml: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    file
}

const QUICK_RUN: &str = r#"
[channel]
host = "127.0.0.1"
port = 0
timeout_secs = 5

[robot]
cycles = 5
speak = false
probe_after_move = false

[sense]
mode = "list"
touch_timesteps = [2]
poll_interval_ms = 1

[inference]
seed = 7
"#;

mod top_level {
    use super::*;

    #[test]
    fn help_flag_works() {
        ts_core()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Tactile Search"));
    }

    #[test]
    fn help_shows_all_commands() {
        ts_core().arg("--help").assert().success().stdout(
            predicate::str::contains("decide")
                .and(predicate::str::contains("robot"))
                .and(predicate::str::contains("simulate"))
                .and(predicate::str::contains("check"))
                .and(predicate::str::contains("version")),
        );
    }

    #[test]
    fn version_subcommand_reports_json() {
        ts_core()
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ts_core_version"));
    }

    #[test]
    fn unknown_subcommand_fails() {
        ts_core().arg("teleport").assert().failure();
    }
}

mod check {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let file = config_file(QUICK_RUN);
        ts_core()
            .args(["check", "--config"])
            .arg(file.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("\"valid\": true"));
    }

    #[test]
    fn invalid_precision_exits_with_config_code() {
        let file = config_file("[model]\nzeta = -1.0\n");
        ts_core()
            .args(["check", "--config"])
            .arg(file.path())
            .assert()
            .code(10)
            .stderr(predicate::str::contains("\"category\":\"configuration\""));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let file = config_file("[robot]\nwheels = 4\n");
        ts_core()
            .args(["check", "--config"])
            .arg(file.path())
            .assert()
            .code(10);
    }

    #[test]
    fn summary_format_is_one_line() {
        let file = config_file(QUICK_RUN);
        ts_core()
            .args(["check", "--format", "summary", "--config"])
            .arg(file.path())
            .assert()
            .success()
            .stdout(predicate::str::starts_with("config ok"));
    }
}

mod simulate {
    use super::*;

    #[test]
    fn short_simulation_prints_a_summary() {
        let file = config_file(QUICK_RUN);
        ts_core()
            .args(["simulate", "--format", "summary", "--config"])
            .arg(file.path())
            .timeout(std::time::Duration::from_secs(60))
            .assert()
            .success()
            .stdout(
                predicate::str::contains("cycles=5").and(predicate::str::contains("touches=1")),
            );
    }

    #[test]
    fn cli_overrides_apply_on_top_of_the_file() {
        let file = config_file(QUICK_RUN);
        ts_core()
            .args(["simulate", "--cycles", "3", "--format", "jsonl", "--config"])
            .arg(file.path())
            .timeout(std::time::Duration::from_secs(60))
            .assert()
            .success()
            .stdout(predicate::function(|out: &str| out.lines().count() == 3));
    }

    #[test]
    fn sensor_mode_cannot_be_simulated() {
        let file = config_file(QUICK_RUN);
        ts_core()
            .args(["simulate", "--sense-mode", "sensor", "--config"])
            .arg(file.path())
            .assert()
            .code(10);
    }
}
