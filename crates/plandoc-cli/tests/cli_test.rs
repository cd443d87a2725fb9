//! End-to-end checks of the `plandoc` binary that need no network access.

use std::path::Path;
use std::process::{Command, Output};

fn plandoc(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plandoc"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("PLANDOC_API_KEY")
        .env_remove("PLANDOC_MODEL")
        .env_remove("PLANDOC_OUTPUT_DIR")
        .env_remove("PLANDOC_ALLOWED_ORIGINS")
        .output()
        .expect("failed to run plandoc")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let out = plandoc(home.path(), &["--help"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for cmd in ["init", "serve", "generate", "summarize"] {
        assert!(text.contains(cmd), "missing {cmd} in help:\n{text}");
    }
}

#[test]
fn init_writes_config_and_refuses_to_overwrite() {
    let home = tempfile::tempdir().unwrap();
    let out = plandoc(home.path(), &["init"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let path = home.path().join("plandoc").join("config.toml");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[model]"));
    assert!(contents.contains("[server]"));
    assert!(!contents.contains("api_key"));

    let again = plandoc(home.path(), &["init"]);
    assert!(!again.status.success());
    assert!(stderr(&again).contains("--force"));

    let forced = plandoc(home.path(), &["init", "--force", "--api-key", "k"]);
    assert!(forced.status.success(), "{}", stderr(&forced));
    assert!(std::fs::read_to_string(&path).unwrap().contains("api_key"));
    // The key itself never reaches the terminal.
    assert!(!String::from_utf8_lossy(&forced.stdout).contains("= \"k\""));
}

#[test]
fn generate_without_api_key_fails_fast() {
    let home = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out = plandoc(
        home.path(),
        &[
            "generate",
            "--title",
            "Lunar mining",
            "--objective",
            "o",
            "--prompt",
            "p",
            "--output-dir",
            out_dir.path().to_str().unwrap(),
        ],
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("PLANDOC_API_KEY"));
    assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn unknown_format_is_rejected_by_the_parser() {
    let home = tempfile::tempdir().unwrap();
    let out = plandoc(
        home.path(),
        &["summarize", "--title", "t", "--prompt", "p", "--format", "docx"],
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("docx"));
}
