//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::output;
use crate::session::{self, LOGIN_HINT};

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the identity as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, base_url: &str) -> Result<()> {
    let session = session::open(&session::config(base_url)?)?;

    let identity = session
        .get_current_identity()
        .await
        .context("Failed to verify session")?
        .context(LOGIN_HINT)?;

    if args.json {
        return output::json_pretty(&identity);
    }

    output::field("Username", identity.username());
    output::field("ID", identity.id());
    for (key, value) in identity.extra() {
        match value.as_str() {
            Some(text) => output::field(key, text),
            None => output::field(key, &value.to_string()),
        }
    }

    Ok(())
}
