/*
This code is part of the WhiteboxTools geospatial analysis library.
Created: 16/10/2026
Last Modified: 16/10/2026
License: MIT
*/

use super::ToolEvent;
use log::debug;

/// Classifies one line of tool output.
///
/// A line containing `%` whose last whitespace-delimited token is an integer
/// followed by `%` is a progress line; everything else, including progress
/// lines that cannot be parsed, passes through as a message.
pub fn classify_line(line: &str) -> ToolEvent {
    match parse_progress(line) {
        Some((label, percent)) => ToolEvent::Progress {
            label,
            percent,
            line: line.to_string(),
        },
        None => ToolEvent::Message {
            text: line.to_string(),
        },
    }
}

/// Splits a progress line into its label and percentage.
pub fn parse_progress(line: &str) -> Option<(String, i32)> {
    if !line.contains('%') {
        return None;
    }
    let trimmed = line.trim_end();
    let token = trimmed.split_whitespace().last()?;
    if !token.ends_with('%') {
        debug!("No trailing percentage in progress line: {}", line);
        return None;
    }
    // out-of-range values are passed on as-is
    let percent = match token.trim_end_matches('%').parse::<i32>() {
        Ok(p) => p,
        Err(e) => {
            debug!("Malformed progress line '{}': {}", line, e);
            return None;
        }
    };
    let label = trimmed[..trimmed.len() - token.len()].trim().to_string();
    Some((label, percent))
}
