// src/dispatch/format.rs
use std::fmt::Write;
use crate::models::command::CommandResult;
use crate::models::server::ServerAddress;
use crate::models::status::StatusResult;

pub const WELCOME: &str = "👋 Welcome! This bot watches and manages a Minecraft server.";
pub const SERVER_ONLINE: &str = "Server is online";
pub const SERVER_OFFLINE: &str = "Server is offline";
pub const UNAUTHORIZED: &str = "❌ You are not allowed to use this command";
pub const NO_PLAYERS: &str = "👥 No players online";
pub const PLAYER_LIST_UNAVAILABLE: &str = "Player list unavailable";
pub const BROADCAST_HINT: &str = "💬 To message everyone on the server, use:\n/say <your message>";

pub const HELP: &str = "🤖 Bot commands:

/start - show the main menu
/help - show this help
/status - check the server status
/players - list online players
/info - detailed server information
/say <message> - broadcast a message in game
/cmd <command> - run a console command (admins only)
/whitelist <add|remove> <player> - manage the whitelist (admins only)
/kick <player> [reason] - kick a player (admins only)
/ban <player> [reason] - ban a player (admins only)
/pardon <player> - lift a ban (admins only)

📝 Notes:
- some commands need admin rights
- RCON must be enabled on the server";

pub const MENU: [(&str, &str); 4] = [
    ("🔍 Server status", "status"),
    ("👥 Online players", "players"),
    ("📊 Server info", "info"),
    ("💬 Message everyone", "broadcast"),
];

fn push_disclosure(text: &mut String, note: Option<String>) {
    if let Some(note) = note {
        let _ = write!(text, "\n\n⚠️ {}", note);
    }
}

pub fn status(result: &StatusResult) -> String {
    let mut text = if result.online {
        format!(
            "🟢 {}\n\n👥 Players: {}/{}\n🎮 Version: {}\n⏱️ Latency: {:.2}ms\n\n📝 Description:\n{}",
            SERVER_ONLINE, result.players_online, result.players_max,
            result.version, result.latency_ms, result.motd
        )
    } else {
        offline(result)
    };
    push_disclosure(&mut text, result.disclosure());
    text
}

/// Shorter block for the menu button, without the MOTD.
pub fn status_compact(result: &StatusResult) -> String {
    let mut text = if result.online {
        format!(
            "🟢 {}\n\n👥 Players: {}/{}\n🎮 Version: {}\n⏱️ Latency: {:.2}ms",
            SERVER_ONLINE, result.players_online, result.players_max,
            result.version, result.latency_ms
        )
    } else {
        format!("🔴 {}", SERVER_OFFLINE)
    };
    push_disclosure(&mut text, result.disclosure());
    text
}

pub fn players(result: &StatusResult) -> String {
    let mut text = if !result.online {
        offline(result)
    } else if result.players_online == 0 {
        NO_PLAYERS.to_string()
    } else {
        let mut roster = format!("👥 Players online ({}):\n\n", result.players_online);
        if result.players_list.is_empty() {
            roster.push_str(PLAYER_LIST_UNAVAILABLE);
        } else {
            for (i, player) in result.players_list.iter().enumerate() {
                let _ = writeln!(roster, "{}. {}", i + 1, player);
            }
        }
        roster.trim_end().to_string()
    };
    push_disclosure(&mut text, result.disclosure());
    text
}

pub fn info(address: &ServerAddress, result: &StatusResult) -> String {
    let mut text = if result.online {
        format!(
            "📊 Server information\n\n🌐 Address: {}\n🎮 Version: {}\n👥 Players: {}/{}\n⏱️ Latency: {:.2}ms\n\n📝 Description:\n{}",
            address.query_endpoint(), result.version, result.players_online,
            result.players_max, result.latency_ms, result.motd
        )
    } else {
        format!("🔴 {} - information unavailable", SERVER_OFFLINE)
    };
    push_disclosure(&mut text, result.disclosure());
    text
}

fn offline(result: &StatusResult) -> String {
    match &result.error {
        Some(e) => format!("🔴 {}\n❌ {}", SERVER_OFFLINE, e),
        None => format!("🔴 {}", SERVER_OFFLINE),
    }
}

/// `success` on success, `failure: <error>` otherwise, plus the disclosure if simulated.
pub fn command_outcome(result: &CommandResult, success: String, failure: &str) -> String {
    let mut text = if result.succeeded {
        success
    } else {
        format!(
            "❌ {}: {}",
            failure,
            result.error.as_deref().unwrap_or("unknown error")
        )
    };
    push_disclosure(&mut text, result.disclosure());
    text
}
