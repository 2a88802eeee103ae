//! Output rendering for streamed responses.
//!
//! This module provides the [`Renderer`] trait, a plain-text terminal
//! implementation, and an in-memory implementation that records everything
//! it is asked to show.

use std::io::{self, Stdout, Write};

/// ANSI escape code for dim text (used for telemetry captions).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for yellow text (used for notices).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Marker shown after the partial response while it is still streaming.
pub const CURSOR: &str = "▌";

/// Erases the single-column cursor marker.
const ERASE_CURSOR: &str = "\x08 \x08";

/// Trait for rendering streamed responses.
///
/// The stream consumer calls `start_response`, then `print_text` once per text
/// delta, then `finish_response` when the stream is exhausted.  Errors, notices
/// and telemetry captions may arrive at any point.
pub trait Renderer: Send {
    /// Called before the first delta of a response.
    fn start_response(&mut self) {}

    /// Show a new text delta.
    ///
    /// `buffer` is the whole response so far, `delta` is the part that just
    /// arrived; renderers may redraw from either.
    fn print_text(&mut self, buffer: &str, delta: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print the telemetry caption for a finished response.
    fn print_telemetry(&mut self, summary: &str);

    /// Called when a response is complete.
    ///
    /// Removes the streaming cursor and leaves the final text in place.
    fn finish_response(&mut self, text: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Text is written to stdout as it arrives, followed by a cursor marker while
/// the response is still streaming.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    cursor_shown: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    ///
    /// Without color the cursor marker is not drawn either, so output can be
    /// piped.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            cursor_shown: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn hide_cursor(&mut self) {
        if self.cursor_shown {
            print!("{ERASE_CURSOR}");
            self.cursor_shown = false;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, _buffer: &str, delta: &str) {
        self.hide_cursor();
        print!("{delta}");
        if self.use_color {
            print!("{CURSOR}");
            self.cursor_shown = true;
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.hide_cursor();
        if self.use_color {
            eprintln!("\n{ANSI_RED}{error}{ANSI_RESET}");
        } else {
            eprintln!("\n{error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.hide_cursor();
        if self.use_color {
            println!("{ANSI_YELLOW}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }

    fn print_telemetry(&mut self, summary: &str) {
        self.hide_cursor();
        if self.use_color {
            println!("{ANSI_DIM}{summary}{ANSI_RESET}");
        } else {
            println!("{summary}");
        }
        self.flush();
    }

    fn finish_response(&mut self, _text: &str) {
        self.hide_cursor();
        println!();
        self.flush();
    }
}

/// A renderer that records its output in memory.
///
/// Useful for tests and for embedding a session where output is shown by
/// something other than a terminal.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingRenderer {
    /// The live display after each delta, cursor marker included.
    pub partials: Vec<String>,
    /// Error messages.
    pub errors: Vec<String>,
    /// Informational messages.
    pub infos: Vec<String>,
    /// Telemetry captions.
    pub telemetry: Vec<String>,
    /// Final text of each finished response.
    pub finished: Vec<String>,
}

impl RecordingRenderer {
    /// Creates an empty recording.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for RecordingRenderer {
    fn print_text(&mut self, buffer: &str, _delta: &str) {
        self.partials.push(format!("{buffer}{CURSOR}"));
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.infos.push(info.to_string());
    }

    fn print_telemetry(&mut self, summary: &str) {
        self.telemetry.push(summary.to_string());
    }

    fn finish_response(&mut self, text: &str) {
        self.finished.push(text.to_string());
    }
}
