//! Interactive chat application for the Bedrock Converse API.
//!
//! This binary provides a streaming REPL interface for chatting with models
//! through the Converse Stream API.  The bearer token is read from
//! `AWS_BEARER_TOKEN_BEDROCK`.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! converse-chat
//!
//! # Specify a model and cache the system prompt
//! converse-chat --model claude-haiku-4-5 --cache-system
//!
//! # Read defaults from a YAML file
//! converse-chat --config converse.yaml
//!
//! # Disable colors (useful for piping output)
//! converse-chat --no-color
//! ```
//!
//! Set `RUST_LOG=converse=debug` to see request and stream logging on stderr.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use converse::chat::{
    CacheTarget, ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer,
    help_text, parse_command,
};
use converse::chat::config::parse_model;
use converse::telemetry::thousands;
use converse::{Attachment, BedrockRuntime, ImageGeneration, TracingLogger};

/// Main entry point for the converse-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("converse-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let client = BedrockRuntime::with_options(
        None,
        Some(config.region.clone()),
        None,
        Some(config.timeout),
    )?
    .with_logger(Arc::new(TracingLogger));
    let imagine = ImageGeneration::new(client.clone());
    let mut session = ChatSession::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;
    let mut pending: Option<Attachment> = None;

    println!(
        "Converse Chat (model: {}, region: {})",
        session.model(),
        session.config().region
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let prompt = match &pending {
            Some(attachment) => format!("You [{}]: ", attachment.original_name()),
            None => "You: ".to_string(),
        };
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.reset();
                            pending = None;
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model_name) => {
                            let model = parse_model(&model_name);
                            renderer.print_info(&format!("Model changed to: {}", model));
                            session.set_model(model);
                        }
                        ChatCommand::System(prompt) => match prompt {
                            Some(p) => {
                                renderer.print_info(&format!("System prompt set to: {}", p));
                                session.set_system_prompt(p);
                            }
                            None => {
                                session.set_system_prompt("");
                                renderer.print_info("System prompt cleared.");
                            }
                        },
                        ChatCommand::MaxTokens(value) => {
                            session.set_max_tokens(value);
                            renderer.print_info(&format!("max_tokens set to {value}"));
                        }
                        ChatCommand::Temperature(value) => {
                            session.set_temperature(value);
                            renderer.print_info(&format!("temperature set to {:.2}", value));
                        }
                        ChatCommand::Cache(target, enabled) => {
                            let state = if enabled { "on" } else { "off" };
                            match target {
                                CacheTarget::System => {
                                    session.set_cache_system(enabled);
                                    renderer.print_info(&format!("System prompt caching {state}."));
                                }
                                CacheTarget::Documents => {
                                    session.set_cache_documents(enabled);
                                    renderer.print_info(&format!(
                                        "Document caching {state} for messages sent from now on."
                                    ));
                                }
                            }
                        }
                        ChatCommand::Attach(path) => {
                            match Attachment::from_path(&path, false) {
                                Ok(attachment) => {
                                    renderer.print_info(&format!(
                                        "Attached {} ({}, {} bytes)",
                                        attachment.original_name(),
                                        attachment.format(),
                                        thousands(attachment.bytes().len() as u64)
                                    ));
                                    pending = Some(attachment);
                                }
                                Err(err) => {
                                    renderer.print_error(&format!("Failed to attach: {}", err))
                                }
                            }
                        }
                        ChatCommand::Detach => {
                            if pending.take().is_some() {
                                renderer.print_info("Attachment dropped.");
                            } else {
                                renderer.print_info("Nothing attached.");
                            }
                        }
                        ChatCommand::Imagine(prompt) => {
                            let args = json!({ "prompt": prompt });
                            match session
                                .invoke_capability(&prompt, &imagine, args, &mut renderer)
                                .await
                            {
                                Ok(artifacts) => {
                                    for artifact in artifacts {
                                        let file_name = artifact.file_name();
                                        match std::fs::write(&file_name, &artifact.bytes) {
                                            Ok(()) => renderer
                                                .print_info(&format!("Saved {}", file_name)),
                                            Err(err) => renderer.print_error(&format!(
                                                "Failed to save {}: {}",
                                                file_name, err
                                            )),
                                        }
                                    }
                                }
                                Err(err) => tracing::debug!(error = %err, "image generation failed"),
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message; failures are already shown inline.
                println!("Assistant:");
                if let Err(err) = session
                    .submit(Some(line.to_string()), pending.take(), &mut renderer)
                    .await
                {
                    tracing::debug!(error = %err, "turn failed");
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!("      Generated images: {}", stats.artifact_count);
    println!(
        "      Total tokens: {} in / {} out ({} requests)",
        thousands(stats.total_input_tokens),
        thousands(stats.total_output_tokens),
        stats.total_requests
    );
    if stats.total_cache_read_tokens > 0 || stats.total_cache_write_tokens > 0 {
        println!(
            "      Cache: {} read / {} written",
            thousands(stats.total_cache_read_tokens),
            thousands(stats.total_cache_write_tokens)
        );
    }
    if let Some(input) = stats.last_turn_input_tokens {
        let output = stats.last_turn_output_tokens.unwrap_or(0);
        println!("      Last turn tokens: {input} in / {output} out");
    }
}

fn print_config(session: &ChatSession) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Model: {}", config.model);
    println!("      Region: {}", config.region);
    println!("      Max tokens: {}", config.max_tokens);
    println!("      Temperature: {:.2}", config.temperature);
    if config.system_prompt.is_empty() {
        println!("      System prompt: (none)");
    } else {
        println!("      System prompt: {}", config.system_prompt);
    }
    println!("      Cache system prompt: {}", on_off(config.cache_system));
    println!("      Cache documents: {}", on_off(config.cache_documents));
    println!("      Record errors: {}", on_off(config.record_errors));
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
