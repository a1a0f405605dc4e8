#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    fn tracesim(config: &Path, output_dir: &Path) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("tracesim");
        cmd.arg("--config").arg(config).arg("--output-dir").arg(output_dir);
        cmd
    }

    #[test]
    fn test_cli_run_writes_reports_and_summary() {
        let output_dir = tempdir().unwrap();
        let output = tracesim(Path::new("tests/data/params.json"), output_dir.path())
            .output()
            .unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(stdout.contains("Execution Summary"));
        assert!(stdout.contains("Messages sent:"));

        for report in ["daily_dispatch", "risk_change_histogram", "disease_status"] {
            assert!(output_dir.path().join(format!("{report}.csv")).exists());
        }
        let mut reader =
            csv::Reader::from_path(output_dir.path().join("disease_status.csv")).unwrap();
        assert_eq!(reader.records().count(), 20);
    }

    #[test]
    fn test_cli_refuses_to_overwrite_reports() {
        let output_dir = tempdir().unwrap();
        let config = Path::new("tests/data/params.json");
        tracesim(config, output_dir.path()).assert().success();

        let output = tracesim(config, output_dir.path()).output().unwrap();
        assert!(!output.status.success());
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("File already exists"));

        tracesim(config, output_dir.path())
            .arg("--force-overwrite")
            .assert()
            .success();
    }

    #[test]
    fn test_cli_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("bad.json");
        std::fs::write(
            &config,
            r#"{"tracesim.Params": {"population": 1, "contacts_per_day": 0}}"#,
        )
        .unwrap();
        let output = tracesim(&config, dir.path()).output().unwrap();
        assert!(!output.status.success());
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("population must be at least 2"));
    }
}
