use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Run the CLI with an isolated HOME so the session lands in `home`.
pub async fn run_cli(args: &[&str], home: &Path, base_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chatwire"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("CHATWIRE_BASE_URL", base_url);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("RUST_LOG");

    // The mock server runs on this runtime; keep it free while the CLI runs.
    tokio::task::spawn_blocking(move || cmd.output())
        .await
        .expect("CLI task panicked")
        .expect("Failed to execute CLI")
}

/// Run the CLI and expect success, returning stdout.
pub async fn run_cli_success(args: &[&str], home: &Path, base_url: &str) -> String {
    let output = run_cli(args, home, base_url).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Where the CLI keeps its session for a given HOME.
pub fn session_file(home: &Path) -> PathBuf {
    home.join("data").join("chatwire").join("session.json")
}

/// Write a session file as if a previous run had logged in.
pub fn write_session(home: &Path, access: &str, refresh: &str) {
    let path = session_file(home);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let json = serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "user_info": r#"{"id":"u1","username":"alice"}"#,
    });
    std::fs::write(path, json.to_string()).unwrap();
}

pub fn read_session(home: &Path) -> Option<serde_json::Value> {
    let json = std::fs::read_to_string(session_file(home)).ok()?;
    serde_json::from_str(&json).ok()
}
