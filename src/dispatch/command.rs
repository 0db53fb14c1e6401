// src/dispatch/command.rs
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Debug, Clone, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Minecraft server commands:")]
pub enum Command {
    #[command(description = "main menu")]
    Start,
    #[command(description = "list commands")]
    Help,
    #[command(description = "server status")]
    Status,
    #[command(description = "online players")]
    Players,
    #[command(description = "server details")]
    Info,
    #[command(description = "broadcast a chat message")]
    Say(String),
    #[command(description = "run a console command (admin)")]
    Cmd(String),
    #[command(description = "add or remove a whitelisted player (admin)")]
    Whitelist(String),
    #[command(description = "kick a player (admin)")]
    Kick(String),
    #[command(description = "ban a player (admin)")]
    Ban(String),
    #[command(description = "lift a ban (admin)")]
    Pardon(String),
}

impl Command {
    /// Whitespace-separated arguments; empty for commands that take none.
    pub fn args(&self) -> Vec<&str> {
        match self {
            Self::Say(rest)
            | Self::Cmd(rest)
            | Self::Whitelist(rest)
            | Self::Kick(rest)
            | Self::Ban(rest)
            | Self::Pardon(rest) => rest.split_whitespace().collect(),
            _ => Vec::new(),
        }
    }
}

/// Something the chat side asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Button(String),
}

impl Inbound {
    /// Accepts `/name args` and `/name@<bot_name> args`. Unknown commands and
    /// commands addressed to another bot yield `None`.
    pub fn parse_command(text: &str, bot_name: &str) -> Option<Self> {
        Command::parse(text, bot_name).ok().map(Self::Command)
    }
}
