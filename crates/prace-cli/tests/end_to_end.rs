#![cfg(target_os = "linux")]

use std::{fs, path::Path, process::Command};

fn catalog(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("catalog.json");
    let json = r#"{ "jobs": [
        { "name": "idle", "program": "/bin/sh", "args": ["-c", "sleep 30"],
          "timeoutMs": 60000, "memoryLimitBytes": 1073741824 },
        { "name": "refuter", "program": "/bin/sh",
          "args": ["-c", "sleep 0.3; echo 1 > \"$1/$2.cex\"", "sh", "{out}", "foo"],
          "timeoutMs": 60000, "memoryLimitBytes": 1073741824 }
    ] }"#;
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn race_publishes_the_winning_counterexample() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("foo.aig");
    fs::write(&input, b"aag 0 0 0 0 0\n").unwrap();
    let work = root.path().join("work");
    fs::create_dir_all(work.join("idle")).unwrap();
    fs::write(work.join("idle/foo.w.aag"), b"stale").unwrap();
    let out = root.path().join("out");

    let status = Command::new(env!("CARGO_BIN_EXE_prace"))
        .arg("-I")
        .arg(&input)
        .arg("-O")
        .arg(&out)
        .arg("--catalog")
        .arg(catalog(root.path()))
        .arg("--work-dir")
        .arg(&work)
        .arg("--kill-grace-ms")
        .arg("200")
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(fs::read(out.join("foo.cex")).unwrap(), b"1\n");
    assert!(!out.join("foo.w.aag").exists());
    assert!(!work.join("idle/foo.w.aag").exists());
}

#[test]
fn missing_input_fails() {
    let root = tempfile::tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_prace"))
        .arg("-I")
        .arg(root.path().join("absent.aig"))
        .arg("-O")
        .arg(root.path().join("out"))
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn run_without_result_leaves_no_old_verdict() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("foo.aig");
    fs::write(&input, b"aag 0 0 0 0 0\n").unwrap();
    let catalog = root.path().join("catalog.json");
    fs::write(
        &catalog,
        r#"{ "jobs": [ { "name": "quitter", "program": "/bin/sh", "args": ["-c", "exit 1"],
              "timeoutMs": 60000, "memoryLimitBytes": 1073741824 } ] }"#,
    )
    .unwrap();
    let out = root.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("foo.cex"), b"from an earlier run").unwrap();
    fs::write(out.join("foo.w.aag"), b"from an earlier run").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_prace"))
        .arg("-I")
        .arg(&input)
        .arg("-O")
        .arg(&out)
        .arg("--catalog")
        .arg(&catalog)
        .arg("--work-dir")
        .arg(root.path().join("work"))
        .status()
        .unwrap();

    assert!(status.success());
    assert!(!out.join("foo.cex").exists());
    assert!(!out.join("foo.w.aag").exists());
}
