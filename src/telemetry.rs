//! Compact one-line summaries of response telemetry.

use crate::types::ResponseMetadata;

/// Summarize usage and latency, e.g. `Input: 1,234 | Output: 56 | Latency: 812ms`.
///
/// Cache and latency segments appear only when strictly positive.  Returns
/// `None` when nothing was reported or every reported value is zero.
pub fn format(metadata: &ResponseMetadata) -> Option<String> {
    let mut segments = Vec::new();
    let mut any_nonzero = false;

    if let Some(usage) = &metadata.usage {
        any_nonzero |= !usage.is_zero();
        segments.push(format!("Input: {}", thousands(usage.input_tokens as u64)));
        segments.push(format!("Output: {}", thousands(usage.output_tokens as u64)));
        if let Some(read) = usage.cache_read_input_tokens.filter(|&n| n > 0) {
            segments.push(format!("Cache Read: {}", thousands(read as u64)));
        }
        if let Some(write) = usage.cache_write_input_tokens.filter(|&n| n > 0) {
            segments.push(format!("Cache Write: {}", thousands(write as u64)));
        }
    }
    if let Some(metrics) = &metadata.metrics
        && metrics.latency_ms > 0
    {
        any_nonzero = true;
        segments.push(format!("Latency: {}ms", thousands(metrics.latency_ms)));
    }

    if !any_nonzero {
        return None;
    }
    Some(segments.join(" | "))
}

/// Render `n` with comma thousands separators.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
