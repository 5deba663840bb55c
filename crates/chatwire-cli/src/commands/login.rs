//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long, env = "CHATWIRE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, base_url: &str) -> Result<()> {
    let config = session::config(base_url)?;
    let session = session::open(&config)?;

    output::status("Logging in...");

    let identity = session
        .login(&args.username, &args.password)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    output::field("Username", identity.username());
    output::field("ID", identity.id());
    output::field("Server", config.base_url.as_str());

    Ok(())
}
