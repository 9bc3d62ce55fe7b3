use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) -> String {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_ligand-search"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );

    stdout_str.to_string()
}

fn files_matching(dir: &PathBuf, prefix: &str, suffix: &str) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .expect("failed to read output directory")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with(prefix) && name.ends_with(suffix)
        })
        .collect()
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let out_dir = test_dir.join("out");
    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[search]\n"
        + "pop_size = 10\n"
        + "cx_prob = 0.5\n"
        + "mut_prob = 0.2\n"
        + "n_gen = 3\n"
        + "log = true\n"
        + "\n"
        + "[membrane]\n"
        + "m_length = 10\n"
        + "\n"
        + "[[experiments]]\n"
        + "mutation_rate = 0.1\n"
        + "hof_size = 2\n"
        + "seed = 42\n"
        + "\n"
        + "[[experiments]]\n"
        + "seed = 43\n"
        + "\n"
        + "[experiments.genome]\n"
        + "genes = 3\n"
        + "eps_range = [ 0.5, 2.0,]\n"
        + "sigma_range = [ 1.0, 1.5,]\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    let out_dir_str = out_dir
        .to_str()
        .expect("failed to convert output directory to string");
    let config_str = config_path
        .to_str()
        .expect("failed to convert config path to string");

    let stdout = run_bin(&["--out-dir", out_dir_str, "--config", config_str, "run"]);
    assert!(stdout.contains("6 ligands"));
    assert!(stdout.contains("3 ligands"));

    assert!(out_dir.join("results-0000.msgpack").is_file());

    let logs = files_matching(&out_dir, "ft_", ".tsv");
    assert_eq!(logs.len(), 2);
    for log in &logs {
        let contents = fs::read_to_string(log).expect("failed to read log");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "gen\tnevals\tAvg\tStd\tMin\tMax");
        assert_eq!(lines.len(), 1 + 4);
        for (i_gen, line) in lines[1..].iter().enumerate() {
            let cols: Vec<_> = line.split('\t').collect();
            assert_eq!(cols.len(), 6);
            assert_eq!(cols[0], i_gen.to_string());
        }
    }

    let scripts = files_matching(&out_dir, "results-0000-", ".in");
    let data_files = files_matching(&out_dir, "results-0000-", ".data");
    assert!(!scripts.is_empty());
    assert!(scripts.len() <= 3);
    assert_eq!(scripts.len(), data_files.len());

    let data = fs::read_to_string(out_dir.join("results-0000-exp-00-elite-00.data"))
        .expect("failed to read data file");
    assert!(data.contains("18 atoms"));
    assert!(data.contains("10 bonds"));
    assert!(data.contains("7 angles"));
    assert!(data.contains("9 atom types"));

    run_bin(&["--out-dir", out_dir_str, "--config", config_str, "emit", "--results-idx", "0"]);

    run_bin(&["--out-dir", out_dir_str, "clean"]);
    assert!(files_matching(&out_dir, "", "").is_empty());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_fails() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("invalid_config_fails");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    fs::write(&config_path, "[[experiments]]\n[experiments.genome]\nradius_bits = 0\n")
        .expect("failed to write config file");

    let bin = PathBuf::from(env!("CARGO_BIN_EXE_ligand-search"));
    let output = Command::new(bin)
        .args([
            "--out-dir",
            test_dir.join("out").to_str().expect("invalid path"),
            "--config",
            config_path.to_str().expect("invalid path"),
            "run",
        ])
        .output()
        .expect("failed to execute command");
    assert!(!output.status.success());

    fs::remove_dir_all(&test_dir).ok();
}
