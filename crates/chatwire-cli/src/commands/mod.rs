//! Subcommand implementations.

mod chat;
mod login;
mod logout;
mod refresh_token;
mod whoami;

use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new session (login)
    Login(login::LoginArgs),

    /// End the session and forget its tokens
    Logout(logout::LogoutArgs),

    /// Display the user of the active session
    Whoami(whoami::WhoamiArgs),

    /// Refresh the session tokens
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// Chat with the assistant
    Chat(chat::ChatArgs),
}

pub async fn handle(command: Command, base_url: &str) -> Result<()> {
    match command {
        Command::Login(args) => login::run(args, base_url).await,
        Command::Logout(args) => logout::run(args, base_url),
        Command::Whoami(args) => whoami::run(args, base_url).await,
        Command::RefreshToken(args) => refresh_token::run(args, base_url).await,
        Command::Chat(args) => chat::run(args, base_url).await,
    }
}
