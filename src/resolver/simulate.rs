// src/resolver/simulate.rs
// Deterministic stand-ins used when the real server cannot be reached.
use crate::models::status::{Source, StatusResult};

pub const SIMULATED_ROSTER: [&str; 3] = ["Steve", "Alex", "Notch"];
pub const SIMULATED_PLAYERS_MAX: u32 = 20;
pub const SIMULATED_VERSION: &str = "1.20.4";
pub const SIMULATED_MOTD: &str = "A Minecraft Server (demo)";
pub const SIMULATED_LATENCY_MS: f64 = 42.0;

pub fn status(reason: String) -> StatusResult {
    StatusResult {
        online: true,
        players_online: SIMULATED_ROSTER.len() as u32,
        players_max: SIMULATED_PLAYERS_MAX,
        players_list: SIMULATED_ROSTER.iter().map(|name| name.to_string()).collect(),
        version: SIMULATED_VERSION.to_string(),
        motd: SIMULATED_MOTD.to_string(),
        latency_ms: SIMULATED_LATENCY_MS,
        source: Source::Simulated,
        error: Some(reason),
    }
}

/// Canned console reply, shaped like what a vanilla server prints.
pub fn console_response(command: &str) -> String {
    let words: Vec<&str> = command.split_whitespace().collect();
    match words.as_slice() {
        ["say", rest @ ..] => format!("[Server] {}", rest.join(" ")),
        ["whitelist", "add", player, ..] => format!("Added {} to the whitelist", player),
        ["whitelist", "remove", player, ..] => format!("Removed {} from the whitelist", player),
        ["kick", player, reason @ ..] if !reason.is_empty() => {
            format!("Kicked {}: {}", player, reason.join(" "))
        }
        ["kick", player] => format!("Kicked {}", player),
        ["ban", player, reason @ ..] if !reason.is_empty() => {
            format!("Banned {}: {}", player, reason.join(" "))
        }
        ["ban", player] => format!("Banned {}", player),
        ["pardon", player, ..] => format!("Unbanned {}", player),
        ["time", "set", value, ..] => format!("Set the time to {}", value),
        _ => format!("Executed: {}", command.trim()),
    }
}
