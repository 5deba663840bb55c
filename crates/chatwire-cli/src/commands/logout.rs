//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(_args: LogoutArgs, base_url: &str) -> Result<()> {
    let session = session::open(&session::config(base_url)?)?;

    if !session.is_authenticated() {
        output::warning("No active session");
    }
    session.logout();

    output::success("Logged out");
    Ok(())
}
