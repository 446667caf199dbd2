//! Player-facing message templates and the colorizing seam.
//!
//! Templates are opaque strings with `{point}` and `{command}` placeholders.
//! Color markup inside them is never parsed here; the filled template is
//! handed to a [`Colorizer`].

use crate::types::PlayerId;
use serde::{Deserialize, Serialize};

/// Turns template markup into whatever the host's chat renderer expects.
pub trait Colorizer: Send + Sync {
    fn colorize(&self, raw: &str) -> String;
}

/// Translates `&`-prefixed legacy color and format codes into section-sign codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyColorizer;

const LEGACY_CODES: &str = "0123456789abcdefklmnorABCDEFKLMNOR";

impl Colorizer for LegacyColorizer {
    fn colorize(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match chars.peek() {
                Some(&next) if c == '&' && LEGACY_CODES.contains(next) => {
                    out.push('§');
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                }
                _ => out.push(c),
            }
        }
        out
    }
}

/// Removes `&` codes entirely; useful for consoles and logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainColorizer;

impl Colorizer for PlainColorizer {
    fn colorize(&self, raw: &str) -> String {
        LegacyColorizer
            .colorize(raw)
            .split('§')
            .enumerate()
            .map(|(i, part)| {
                if i == 0 {
                    return part;
                }
                // Drop the code character that followed the marker.
                part.char_indices().nth(1).map_or("", |(at, _)| &part[at..])
            })
            .collect()
    }
}

/// Delivers a finished message to a player. Implemented by the host.
pub trait Notifier: Send + Sync {
    fn notify(&self, player: &PlayerId, message: &str);
}

/// Configurable message table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub block_in_capture: String,
    pub block_in_buffer: String,
    pub command_blocked: String,
    pub claim_blocked: String,
    pub entered_capture: String,
    pub entered_buffer: String,
    pub capture_started: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            block_in_capture: "&cYou cannot build inside the capture zone of &e{point}&c.".to_string(),
            block_in_buffer: "&cYou cannot build this close to &e{point}&c.".to_string(),
            command_blocked: "&cThe command &e{command}&c is disabled near &e{point}&c.".to_string(),
            claim_blocked: "&cYou cannot claim land next to &e{point}&c.".to_string(),
            entered_capture: "&6You entered the capture zone of &e{point}&6.".to_string(),
            entered_buffer: "&7You are approaching &e{point}&7.".to_string(),
            capture_started: "&aCapturing &e{point}&a... stay inside the zone!".to_string(),
        }
    }
}

/// Fills a template's placeholders.
pub fn render(template: &str, point: &str, command: Option<&str>) -> String {
    let filled = template.replace("{point}", point);
    match command {
        Some(command) => filled.replace("{command}", command),
        None => filled,
    }
}
