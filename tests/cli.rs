use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Run the binary inside an empty directory with its own config home
fn postwriter(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("postwriter").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL")
        .env_remove("WEBSHARE_PROXY_USERNAME")
        .env_remove("WEBSHARE_PROXY_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    postwriter(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("transcript"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_platforms_command() {
    let home = TempDir::new().unwrap();
    postwriter(&home)
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("LinkedIn [linkedin] (default)"))
        .stdout(predicate::str::contains("YouTube Shorts [youtube-shorts]"));

    // listing platforms needs no configuration
    assert!(!home.path().join("config.yaml").exists());
    assert!(!home.path().join("config").join("social-post-writer").exists());
}

#[test]
fn test_generate_requires_video() {
    let home = TempDir::new().unwrap();
    postwriter(&home)
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("VIDEO"));
}

#[test]
fn test_transcript_reports_invalid_video() {
    let home = TempDir::new().unwrap();
    postwriter(&home)
        .args(["transcript", "not a video"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch transcript: Invalid video id or URL"));
}

#[test]
fn test_draft_without_api_key_fails() {
    let home = TempDir::new().unwrap();
    postwriter(&home)
        .args(["draft", "OZ5OZZZ2cvk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_config_show_writes_default_config() {
    let home = TempDir::new().unwrap();
    postwriter(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Agent Model: gpt-4o-mini"))
        .stdout(predicate::str::contains("OpenAI API Key: not set"))
        .stdout(predicate::str::contains("Default Format: text"));

    #[cfg(target_os = "linux")]
    assert!(home
        .path()
        .join("config")
        .join("social-post-writer")
        .join("config.yaml")
        .exists());
}
