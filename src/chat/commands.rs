//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the model.

use super::config::{MAX_TOKENS_LIMIT, validate_temperature};

/// Which cache toggle a `/cache` command flips.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CacheTarget {
    /// The cache point after the system prompt.
    System,
    /// Cache points after newly uploaded documents.
    Documents,
}

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history and generated artifacts.
    Clear,

    /// Change the model.
    Model(String),

    /// Set or clear the system prompt.
    /// `None` clears the current system prompt.
    System(Option<String>),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Turn a cache toggle on or off.
    Cache(CacheTarget, bool),

    /// Attach a file to the next message.
    Attach(String),

    /// Drop the pending attachment.
    Detach,

    /// Generate an image from a prompt.
    Imagine(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics (message count, token totals, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use converse::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model claude-haiku-4-5").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "reset" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "max_tokens" => parse_max_tokens(argument),
        "temperature" => match argument {
            Some(arg) => match parse_temperature(arg) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "cache" => parse_cache_command(argument),
        "attach" => match argument {
            Some(path) => ChatCommand::Attach(path.to_string()),
            None => ChatCommand::Invalid("/attach requires a file path".to_string()),
        },
        "detach" => ChatCommand::Detach,
        "imagine" => match argument {
            Some(prompt) => ChatCommand::Imagine(prompt.to_string()),
            None => ChatCommand::Invalid("/imagine requires a prompt".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_cache_command(argument: Option<&str>) -> ChatCommand {
    const USAGE: &str = "/cache expects 'system on|off' or 'documents on|off'";
    let Some(arg) = argument else {
        return ChatCommand::Invalid(USAGE.to_string());
    };

    let mut parts = arg.split_whitespace();
    let target = match parts.next().map(str::to_lowercase).as_deref() {
        Some("system") => CacheTarget::System,
        Some("documents" | "docs") => CacheTarget::Documents,
        _ => return ChatCommand::Invalid(USAGE.to_string()),
    };
    match (parts.next().and_then(parse_on_off), parts.next()) {
        (Some(enabled), None) => ChatCommand::Cache(target, enabled),
        _ => ChatCommand::Invalid(USAGE.to_string()),
    }
}

fn parse_max_tokens(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/max_tokens requires a value".to_string());
    };
    match arg.parse::<u32>() {
        Ok(value) if (1..=MAX_TOKENS_LIMIT).contains(&value) => ChatCommand::MaxTokens(value),
        _ => ChatCommand::Invalid(format!(
            "/max_tokens expects an integer between 1 and {MAX_TOKENS_LIMIT}"
        )),
    }
}

fn parse_temperature(value: &str) -> Result<f32, String> {
    let message = "expects a value between 0 and 1".to_string();
    let parsed: f32 = value.parse().map_err(|_| message.clone())?;
    validate_temperature(parsed).map_err(|_| message)?;
    Ok(parsed)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                    Clear conversation history and generated images
  /model <name>             Change the model (e.g., /model claude-haiku-4-5)
  /system [prompt]          Set system prompt (no argument clears it)
  /max_tokens <n>           Set maximum response tokens (1-12288)
  /temperature <v>          Set temperature 0.0-1.0
  /cache system on|off      Cache the system prompt
  /cache documents on|off   Cache documents sent from now on
  /attach <path>            Attach an image or document to the next message
  /detach                   Drop the pending attachment
  /imagine <prompt>         Generate an image
  /stats                    Show session statistics
  /config                   Show current configuration
  /help                     Show this help message
  /quit                     Exit the chat"#
}
