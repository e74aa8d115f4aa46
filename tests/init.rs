use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_codezen"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "codezen init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".codezen.toml");
    assert!(config_path.exists(), ".codezen.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[server]"));
    assert!(content.contains("[database]"));

    // Every option is commented out, so it must parse as plain TOML.
    let parsed: toml::Table = toml::from_str(&content).unwrap();
    assert!(parsed.contains_key("llm"));
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".codezen.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_codezen"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".codezen.toml")).unwrap();
    assert_eq!(content, "# existing");
}
