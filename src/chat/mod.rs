//! Chat application module for interactive conversations.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! converse client library. It supports:
//!
//! - Streaming responses with a live cursor and a telemetry caption
//! - Image and document attachments with optional prompt caching
//! - Image generation through the `/imagine` command
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing, YAML config files, and configuration
//! - [`session`]: the session context owning the conversation and provider
//! - [`commands`]: Slash command parsing

pub mod commands;
pub mod config;
pub mod session;

pub use crate::render::{PlainTextRenderer, RecordingRenderer, Renderer};
pub use commands::{CacheTarget, ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ConfigFile};
pub use session::{ChatSession, SessionStats, describe_error};
