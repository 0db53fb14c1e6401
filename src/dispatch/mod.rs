// src/dispatch/mod.rs
pub mod command;
pub mod format;
pub mod reply;

use std::fmt;
use log::{info, warn};
use crate::config::AdminSet;
use crate::models::server::ServerAddress;
use crate::resolver::{CommandResolver, StatusResolver};

pub use command::{Command, Inbound};
pub use reply::Reply;

const DEFAULT_KICK_REASON: &str = "Kicked from the server";
const DEFAULT_BAN_REASON: &str = "Banned by an operator";

/// Why a command was refused before reaching the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Unauthorized,
    Usage(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "{}", format::UNAUTHORIZED),
            Self::Usage(usage) => write!(f, "❌ {}", usage),
        }
    }
}

/// Turns chat commands into resolver calls and replies.
pub struct Dispatcher {
    address: ServerAddress,
    admins: AdminSet,
    status: StatusResolver,
    commands: CommandResolver,
}

impl Dispatcher {
    pub fn new(
        address: ServerAddress,
        admins: AdminSet,
        status: StatusResolver,
        commands: CommandResolver,
    ) -> Self {
        Self { address, admins, status, commands }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.allows(user_id)
    }

    /// `None` for button tokens the bot does not know.
    pub async fn dispatch(&self, user_id: i64, inbound: &Inbound) -> Option<Reply> {
        let outcome = match inbound {
            Inbound::Command(command) => self.command(user_id, command).await,
            Inbound::Button(token) => self.button(token).await?,
        };
        Some(outcome.unwrap_or_else(|rejection| {
            if rejection == Rejection::Unauthorized {
                warn!("User {} denied for {:?}", user_id, inbound);
            }
            Reply::text(rejection.to_string())
        }))
    }

    async fn command(&self, user_id: i64, command: &Command) -> Result<Reply, Rejection> {
        let args = command.args();
        match command {
            Command::Start => Ok(self.start()),
            Command::Help => Ok(Reply::text(format::HELP)),
            Command::Status => Ok(self.status().await),
            Command::Players => Ok(self.players().await),
            Command::Info => Ok(self.info().await),
            Command::Say(_) => self.say(&args).await,
            Command::Cmd(_) => self.raw(user_id, &args).await,
            Command::Whitelist(_) => self.whitelist(user_id, &args).await,
            Command::Kick(_) => self.kick(user_id, &args).await,
            Command::Ban(_) => self.ban(user_id, &args).await,
            Command::Pardon(_) => self.pardon(user_id, &args).await,
        }
    }

    async fn button(&self, token: &str) -> Option<Result<Reply, Rejection>> {
        let reply = match token {
            "status" => {
                let status = self.status.resolve_status(&self.address).await;
                Reply::text(format::status_compact(&status))
            }
            "players" => self.players().await,
            "info" => self.info().await,
            "broadcast" => Reply::text(format::BROADCAST_HINT),
            _ => return None,
        };
        Some(Ok(reply))
    }

    fn require_admin(&self, user_id: i64) -> Result<(), Rejection> {
        if self.is_admin(user_id) {
            Ok(())
        } else {
            Err(Rejection::Unauthorized)
        }
    }

    fn start(&self) -> Reply {
        Reply::text(format!("{}\n\nChoose an action:", format::WELCOME)).with_buttons(&format::MENU)
    }

    async fn status(&self) -> Reply {
        let status = self.status.resolve_status(&self.address).await;
        Reply::text(format::status(&status))
    }

    async fn players(&self) -> Reply {
        let status = self.status.resolve_status(&self.address).await;
        Reply::text(format::players(&status))
    }

    async fn info(&self) -> Reply {
        let status = self.status.resolve_status(&self.address).await;
        Reply::text(format::info(&self.address, &status))
    }

    async fn say(&self, args: &[&str]) -> Result<Reply, Rejection> {
        if args.is_empty() {
            return Err(Rejection::Usage(
                "Write the message after the command\nExample: /say Hello everyone!",
            ));
        }
        let message = args.join(" ");
        let result = self.commands.resolve_command(&self.address, &format!("say {}", message)).await;
        Ok(Reply::text(format::command_outcome(
            &result,
            format!("✅ Message sent: {}", message),
            "Failed to send the message",
        )))
    }

    async fn raw(&self, user_id: i64, args: &[&str]) -> Result<Reply, Rejection> {
        self.require_admin(user_id)?;
        if args.is_empty() {
            return Err(Rejection::Usage(
                "Write the command after /cmd\nExample: /cmd time set day",
            ));
        }
        let command = args.join(" ");
        info!("User {} runs console command `{}`", user_id, command);
        let result = self.commands.resolve_command(&self.address, &command).await;

        let mut success = format!("✅ Command executed: {}", command);
        if let Some(response) = result.response() {
            success.push_str(&format!("\n📤 Response: {}", response));
        }
        Ok(Reply::text(format::command_outcome(&result, success, "Failed to run the command")))
    }

    async fn whitelist(&self, user_id: i64, args: &[&str]) -> Result<Reply, Rejection> {
        self.require_admin(user_id)?;
        let (action, player) = match args {
            [action, player, ..] => (action.to_ascii_lowercase(), *player),
            _ => return Err(Rejection::Usage("Usage: /whitelist <add|remove> <player>")),
        };
        let success = match action.as_str() {
            "add" => format!("✅ Added {} to the whitelist", player),
            "remove" => format!("✅ Removed {} from the whitelist", player),
            _ => return Err(Rejection::Usage("The action must be add or remove")),
        };
        let result = self
            .commands
            .resolve_command(&self.address, &format!("whitelist {} {}", action, player))
            .await;
        Ok(Reply::text(format::command_outcome(&result, success, "Failed to update the whitelist")))
    }

    async fn kick(&self, user_id: i64, args: &[&str]) -> Result<Reply, Rejection> {
        self.require_admin(user_id)?;
        let (player, reason) = player_and_reason(args, DEFAULT_KICK_REASON)
            .ok_or(Rejection::Usage("Usage: /kick <player> [reason]"))?;
        let result = self
            .commands
            .resolve_command(&self.address, &format!("kick {} {}", player, reason))
            .await;
        Ok(Reply::text(format::command_outcome(
            &result,
            format!("✅ Kicked {} from the server", player),
            "Failed to kick the player",
        )))
    }

    async fn ban(&self, user_id: i64, args: &[&str]) -> Result<Reply, Rejection> {
        self.require_admin(user_id)?;
        let (player, reason) = player_and_reason(args, DEFAULT_BAN_REASON)
            .ok_or(Rejection::Usage("Usage: /ban <player> [reason]"))?;
        let result = self
            .commands
            .resolve_command(&self.address, &format!("ban {} {}", player, reason))
            .await;
        Ok(Reply::text(format::command_outcome(
            &result,
            format!("✅ Banned {}", player),
            "Failed to ban the player",
        )))
    }

    async fn pardon(&self, user_id: i64, args: &[&str]) -> Result<Reply, Rejection> {
        self.require_admin(user_id)?;
        let player = args.first().ok_or(Rejection::Usage("Usage: /pardon <player>"))?;
        let result = self
            .commands
            .resolve_command(&self.address, &format!("pardon {}", player))
            .await;
        Ok(Reply::text(format::command_outcome(
            &result,
            format!("✅ Lifted the ban on {}", player),
            "Failed to pardon the player",
        )))
    }
}

fn player_and_reason<'a>(args: &[&'a str], default: &str) -> Option<(&'a str, String)> {
    let (player, rest) = args.split_first()?;
    let reason = if rest.is_empty() { default.to_string() } else { rest.join(" ") };
    Some((*player, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use async_trait::async_trait;
    use crate::models::status::ProbeReport;
    use crate::resolver::{ConsoleSession, ConsoleTransport, ResolveError, StatusProbe};

    /// Console that is either unreachable or echoes commands, recording what it saw.
    #[derive(Default)]
    struct RecordingConsole {
        reachable: bool,
        probes: AtomicUsize,
        executed: Arc<Mutex<Vec<String>>>,
    }

    struct RecordingSession(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl ConsoleTransport for RecordingConsole {
        async fn probe(&self, _address: &ServerAddress) -> Result<(), ResolveError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.reachable {
                Ok(())
            } else {
                Err(ResolveError::Connectivity("connection refused".to_string()))
            }
        }

        async fn open(&self, _address: &ServerAddress) -> Result<Box<dyn ConsoleSession>, ResolveError> {
            Ok(Box::new(RecordingSession(self.executed.clone())))
        }
    }

    #[async_trait]
    impl ConsoleSession for RecordingSession {
        async fn execute(&mut self, command: &str) -> Result<String, ResolveError> {
            self.0.lock().unwrap().push(command.to_string());
            Ok(String::new())
        }

        async fn close(self: Box<Self>) {}
    }

    struct FixedStatus(Result<ProbeReport, ResolveError>);

    #[async_trait]
    impl StatusProbe for FixedStatus {
        async fn probe(&self, _address: &ServerAddress) -> Result<ProbeReport, ResolveError> {
            self.0.clone()
        }
    }

    fn empty_server() -> ProbeReport {
        ProbeReport {
            players_online: 0,
            players_max: 20,
            sample: Vec::new(),
            version: "1.20.4".to_string(),
            protocol: 765,
            description: "Empty".to_string(),
            latency_ms: 1.0,
        }
    }

    fn dispatcher(admins: &[i64], console: Arc<RecordingConsole>, probe: FixedStatus) -> Dispatcher {
        let address = ServerAddress {
            host: "mc.example.org".to_string(),
            query_port: 25565,
            console_port: 25575,
            console_secret: "secret".to_string(),
        };
        Dispatcher::new(
            address,
            AdminSet::new(admins.iter().copied()),
            StatusResolver::new(Arc::new(probe), Duration::from_millis(200)),
            CommandResolver::new(console, Duration::from_millis(200)),
        )
    }

    fn offline_dispatcher(admins: &[i64]) -> (Dispatcher, Arc<RecordingConsole>) {
        let console = Arc::new(RecordingConsole::default());
        let probe = FixedStatus(Err(ResolveError::Connectivity("connection refused".to_string())));
        (dispatcher(admins, console.clone(), probe), console)
    }

    async fn send(dispatcher: &Dispatcher, user: i64, text: &str) -> String {
        let inbound = Inbound::parse_command(text, "mcrelay_bot").unwrap();
        dispatcher.dispatch(user, &inbound).await.unwrap().text
    }

    #[test]
    fn admin_check_follows_admin_set() {
        let (open, _) = offline_dispatcher(&[]);
        assert!(open.is_admin(1));
        assert!(open.is_admin(222));

        let (closed, _) = offline_dispatcher(&[111]);
        assert!(closed.is_admin(111));
        assert!(!closed.is_admin(222));
    }

    #[tokio::test]
    async fn say_in_simulated_mode_reports_success() {
        let (dispatcher, _) = offline_dispatcher(&[]);
        let reply = send(&dispatcher, 1, "/say hello world").await;
        assert!(reply.starts_with("✅ Message sent: hello world"));
        assert!(reply.contains("simulated"));
    }

    #[tokio::test]
    async fn non_admin_cmd_is_refused_without_console_traffic() {
        let (dispatcher, console) = offline_dispatcher(&[111]);
        let reply = send(&dispatcher, 222, "/cmd time set day").await;
        assert_eq!(reply, format::UNAUTHORIZED);
        assert_eq!(console.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whitelist_rejects_unknown_action() {
        let (dispatcher, console) = offline_dispatcher(&[]);
        let reply = send(&dispatcher, 1, "/whitelist promote Steve").await;
        assert_eq!(reply, "❌ The action must be add or remove");
        assert_eq!(console.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_arguments_never_reach_the_console() {
        let (dispatcher, console) = offline_dispatcher(&[]);
        for text in ["/say", "/cmd", "/whitelist add", "/kick", "/ban", "/pardon"] {
            let reply = send(&dispatcher, 1, text).await;
            assert!(reply.starts_with("❌"), "{} -> {}", text, reply);
        }
        assert_eq!(console.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn players_on_empty_server() {
        let console = Arc::new(RecordingConsole::default());
        let dispatcher = dispatcher(&[], console, FixedStatus(Ok(empty_server())));
        assert_eq!(send(&dispatcher, 1, "/players").await, format::NO_PLAYERS);
    }

    #[tokio::test]
    async fn admin_commands_are_built_verbatim() {
        let console = Arc::new(RecordingConsole { reachable: true, ..Default::default() });
        let dispatcher = dispatcher(&[111], console.clone(), FixedStatus(Ok(empty_server())));

        send(&dispatcher, 111, "/whitelist ADD Steve").await;
        send(&dispatcher, 111, "/kick Alex").await;
        send(&dispatcher, 111, "/kick Alex spamming chat").await;
        send(&dispatcher, 111, "/ban Herobrine").await;
        send(&dispatcher, 111, "/pardon Herobrine").await;
        let reply = send(&dispatcher, 111, "/cmd time set day").await;
        assert_eq!(reply, "✅ Command executed: time set day");

        assert_eq!(
            *console.executed.lock().unwrap(),
            vec![
                "whitelist add Steve".to_string(),
                format!("kick Alex {}", DEFAULT_KICK_REASON),
                "kick Alex spamming chat".to_string(),
                format!("ban Herobrine {}", DEFAULT_BAN_REASON),
                "pardon Herobrine".to_string(),
                "time set day".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn info_echoes_configured_address() {
        let (dispatcher, _) = offline_dispatcher(&[]);
        let reply = send(&dispatcher, 1, "/info").await;
        assert!(reply.contains("mc.example.org:25565"));
        assert!(reply.contains("simulated"));
    }

    #[tokio::test]
    async fn buttons_map_to_the_same_resolvers() {
        let (dispatcher, _) = offline_dispatcher(&[]);
        let status = dispatcher.dispatch(1, &Inbound::Button("status".to_string())).await.unwrap();
        assert!(status.text.contains("Players: 3/20"));
        assert!(!status.text.contains("Description"));

        let hint = dispatcher.dispatch(1, &Inbound::Button("broadcast".to_string())).await.unwrap();
        assert_eq!(hint.text, format::BROADCAST_HINT);

        assert!(dispatcher.dispatch(1, &Inbound::Button("nope".to_string())).await.is_none());
    }

    #[tokio::test]
    async fn start_shows_menu() {
        let (dispatcher, _) = offline_dispatcher(&[]);
        let start = dispatcher.dispatch(1, &Inbound::Command(Command::Start)).await.unwrap();
        assert_eq!(start.keyboard.len(), 4);
        assert_eq!(start.keyboard[3][0].token, "broadcast");
    }
}
