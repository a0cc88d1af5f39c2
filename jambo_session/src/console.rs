//! Line-oriented operator console.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::operator::Operator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Status,
    Reauth,
    Resume(Uuid),
    Send { address: String, text: String },
    Help,
    Quit,
}

impl OperatorCommand {
    /// Parse one console line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_lowercase().as_str() {
            "status" => Ok(Self::Status),
            "reauth" => Ok(Self::Reauth),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "resume" => Uuid::parse_str(rest)
                .map(Self::Resume)
                .map_err(|_| format!("resume needs a conversation id, got {rest:?}")),
            "send" => match rest.split_once(char::is_whitespace) {
                Some((address, text)) if !text.trim().is_empty() => Ok(Self::Send {
                    address: address.to_string(),
                    text: text.trim().to_string(),
                }),
                _ => Err("usage: send <address> <text>".to_string()),
            },
            other => Err(format!("unknown command {other:?}; try help")),
        };
        Some(command)
    }

    #[must_use]
    pub const fn help_text() -> &'static str {
        "Commands:
  status                  show the connection state
  reauth                  discard credentials and show a new code
  resume <conversation>   hand a conversation back to the bot
  send <address> <text>   message a contact as the operator
  help                    show this list
  quit                    stop the bot"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleReply {
    Continue(String),
    Quit,
}

impl Operator {
    pub async fn execute(&self, command: OperatorCommand) -> ConsoleReply {
        let text = match command {
            OperatorCommand::Status => {
                let status = self.status();
                format!(
                    "connected: {} | state: {} | cached contacts: {}",
                    status.connected,
                    status.state,
                    self.cached_contacts().await
                )
            }
            OperatorCommand::Reauth => match self.force_reauthentication() {
                Ok(()) => "Re-authenticating; watch for a new code".to_string(),
                Err(e) => format!("reauth failed: {e}"),
            },
            OperatorCommand::Resume(id) => match self.resume_automated_control(id).await {
                Ok(()) => format!("Automated replies resumed for {id}"),
                Err(e) => format!("resume failed: {e}"),
            },
            OperatorCommand::Send { address, text } => {
                match self.send_manual_message(&address, &text).await {
                    Ok(()) => format!("Sent to {address}"),
                    Err(e) => format!("send failed: {e}"),
                }
            }
            OperatorCommand::Help => OperatorCommand::help_text().to_string(),
            OperatorCommand::Quit => return ConsoleReply::Quit,
        };
        ConsoleReply::Continue(text)
    }
}

/// Read commands from `input` until EOF or `quit`. Returns true if the
/// operator asked to quit.
pub async fn run_console<R>(operator: &Operator, input: R) -> bool
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return false,
            Err(e) => {
                warn!("Console input failed: {e}");
                return false;
            }
        };
        match OperatorCommand::parse(&line) {
            None => {}
            Some(Err(message)) => println!("{message}"),
            Some(Ok(command)) => match operator.execute(command).await {
                ConsoleReply::Continue(text) => println!("{text}"),
                ConsoleReply::Quit => {
                    info!("Quit requested from console");
                    return true;
                }
            },
        }
    }
}
