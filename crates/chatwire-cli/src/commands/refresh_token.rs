//! Refresh token command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::output;
use crate::session::{self, LOGIN_HINT};

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(_args: RefreshTokenArgs, base_url: &str) -> Result<()> {
    let session = session::open(&session::config(base_url)?)?;
    if !session.is_authenticated() {
        bail!(LOGIN_HINT);
    }

    output::status("Refreshing session...");

    session
        .refresh_if_possible()
        .await
        .context("Failed to refresh session. Run 'chatwire login' to sign in again.")?;

    output::success("Session refreshed successfully");
    Ok(())
}
