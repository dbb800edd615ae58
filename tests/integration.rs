use std::{env, fs, path::PathBuf, process::Command};

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[colony]\n"
        + "num_food_sources = 10\n"
        + "num_onlooker_bees = 5\n"
        + "num_scout_bees = 1\n"
        + "dim = 2\n"
        + "limit = 5\n"
        + "lower = -50.0\n"
        + "upper = 50.0\n"
        + "objective = \"sphere\"\n"
        + "\n"
        + "[run]\n"
        + "iterations = 50\n"
        + "\n"
        + "[output]\n"
        + "employed_jitter = 2.0\n"
        + "onlooker_jitter = 3.0\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"], true);
    run_bin(&["--sim-dir", test_dir_str, "create"], true);

    assert!(test_dir.join("run-0000/trajectory.msgpack").is_file());
    assert!(test_dir.join("run-0001/trajectory.msgpack").is_file());

    run_bin(&["--sim-dir", test_dir_str, "analyze"], true);

    assert!(test_dir.join("run-0000/results.json").is_file());
    let summary = fs::read_to_string(test_dir.join("summary.json")).expect("failed to read summary");
    assert!(summary.contains("\"n_runs\": 2"));

    run_bin(&["--sim-dir", test_dir_str, "clean"], true);

    assert!(!test_dir.join("run-0000").exists());
    assert!(!test_dir.join("summary.json").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_fails() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("invalid_config_fails");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_contents = String::new()
        + "[colony]\n"
        + "num_food_sources = 1\n"
        + "num_onlooker_bees = 5\n"
        + "num_scout_bees = 1\n"
        + "dim = 2\n"
        + "limit = 5\n"
        + "lower = -50.0\n"
        + "upper = 50.0\n"
        + "objective = \"sphere\"\n"
        + "\n"
        + "[run]\n"
        + "iterations = 50\n";

    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"], false);
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

fn run_bin(args: &[&str], expect_success: bool) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_beehive"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert_eq!(
        output.status.success(),
        expect_success,
        "unexpected exit status of binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}
