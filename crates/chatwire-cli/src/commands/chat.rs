//! Chat command implementation.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use chatwire::{ChatClient, ChatMessage, ChatReply, ReplyOutcome};

use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Send a single message and exit; otherwise read messages from stdin
    #[arg(short, long)]
    pub message: Option<String>,

    /// Model to request
    #[arg(long, env = "CHATWIRE_MODEL")]
    pub model: Option<String>,
}

pub async fn run(args: ChatArgs, base_url: &str) -> Result<()> {
    let mut config = session::config(base_url)?;
    if let Some(model) = args.model {
        config = config.with_model(model);
    }

    let session = session::restore(&config)?;
    if !session.is_authenticated() {
        output::warning("Not logged in, replies are simulated");
    }
    let chat = ChatClient::new(session);

    let result = match args.message {
        Some(message) => turn(&chat, &message, &[]).await.and_then(|reply| report(&reply)),
        None => interactive(&chat).await,
    };

    chat.session().wait_for_revalidation().await;
    result
}

async fn interactive(chat: &ChatClient) -> Result<()> {
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("{} ", ">".bold());
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/quit" {
            break;
        }

        let reply = turn(chat, message, &history).await?;
        report(&reply)?;
        if reply.outcome == ReplyOutcome::AuthRefreshed {
            continue;
        }

        history.push(ChatMessage::user(message));
        history.push(ChatMessage::ai(reply.content));
    }

    Ok(())
}

/// Send one message, printing the reply as it streams.
async fn turn(chat: &ChatClient, message: &str, history: &[ChatMessage]) -> Result<ChatReply> {
    let mut stdout = std::io::stdout();
    let mut write_error = None;

    let reply = chat
        .send(message, history, |chunk| {
            if let Err(e) = write!(stdout, "{}", chunk).and_then(|()| stdout.flush()) {
                write_error.get_or_insert(e);
            }
        })
        .await;
    println!();

    if let Some(e) = write_error {
        return Err(e).context("Failed to write reply");
    }
    tracing::debug!(outcome = ?reply.outcome, "Reply finished");
    Ok(reply)
}

fn report(reply: &ChatReply) -> Result<()> {
    match reply.outcome {
        ReplyOutcome::AuthExpired | ReplyOutcome::InvalidSession => {
            bail!("Session ended. Run 'chatwire login' to sign in again.")
        }
        ReplyOutcome::AuthRefreshed => {
            output::warning("Session refreshed, send the message again");
            Ok(())
        }
        ReplyOutcome::Fallback => {
            output::warning("The server could not be reached, the reply was simulated");
            Ok(())
        }
        ReplyOutcome::Streamed | ReplyOutcome::Simulated => Ok(()),
    }
}
