// src/resolver/command.rs
use std::sync::Arc;
use std::time::Duration;
use log::{debug, error, info, warn};
use crate::models::command::CommandResult;
use crate::models::server::ServerAddress;
use crate::resolver::{simulate, ConsoleTransport, ResolveError};

/// Remote console execution with a simulated fallback. Never fails.
#[derive(Clone)]
pub struct CommandResolver {
    transport: Arc<dyn ConsoleTransport>,
    timeout: Duration,
}

impl CommandResolver {
    pub fn new(transport: Arc<dyn ConsoleTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub async fn resolve_command(&self, address: &ServerAddress, command: &str) -> CommandResult {
        if let Err(e) = self.bounded(self.transport.probe(address)).await {
            warn!("Console at {} unreachable, simulating `{}`: {}", address.console_endpoint(), command, e);
            return CommandResult::simulated(simulate::console_response(command), e.to_string());
        }

        let mut session = match self.bounded(self.transport.open(address)).await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to open console session to {}: {}", address.console_endpoint(), e);
                return CommandResult::real_failure(e.to_string());
            }
        };

        let outcome = self.bounded(session.execute(command)).await;
        // Close before inspecting the outcome so every path releases the session.
        if tokio::time::timeout(self.timeout, session.close()).await.is_err() {
            warn!("Closing console session to {} timed out", address.console_endpoint());
        }

        match outcome {
            Ok(response) => {
                info!("Console command `{}` executed on {}", command, address.console_endpoint());
                debug!("Console response: {:?}", response);
                CommandResult::real(response)
            }
            Err(e) => {
                error!("Console command `{}` failed on {}: {}", command, address.console_endpoint(), e);
                CommandResult::real_failure(e.to_string())
            }
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, ResolveError>
    where
        F: std::future::Future<Output = Result<T, ResolveError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Connectivity(format!(
                "console did not answer within {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::models::status::Source;
    use crate::resolver::ConsoleSession;

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Succeed,
        FailMidSession,
        HangMidSession,
        ProbeFails,
        OpenFails,
    }

    #[derive(Default)]
    struct Counters {
        probes: AtomicUsize,
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    struct FakeTransport {
        mode: Mode,
        counters: Arc<Counters>,
    }

    struct FakeSession {
        mode: Mode,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl ConsoleTransport for FakeTransport {
        async fn probe(&self, _address: &ServerAddress) -> Result<(), ResolveError> {
            self.counters.probes.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::ProbeFails => Err(ResolveError::Connectivity("connection refused".to_string())),
                _ => Ok(()),
            }
        }

        async fn open(&self, _address: &ServerAddress) -> Result<Box<dyn ConsoleSession>, ResolveError> {
            if self.mode == Mode::OpenFails {
                return Err(ResolveError::Protocol("authentication rejected".to_string()));
            }
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession { mode: self.mode, counters: self.counters.clone() }))
        }
    }

    #[async_trait]
    impl ConsoleSession for FakeSession {
        async fn execute(&mut self, command: &str) -> Result<String, ResolveError> {
            match self.mode {
                Mode::FailMidSession => Err(ResolveError::Connectivity("connection reset".to_string())),
                Mode::HangMidSession => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
                _ => Ok(format!("ran {}", command)),
            }
        }

        async fn close(self: Box<Self>) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn address() -> ServerAddress {
        ServerAddress {
            host: "127.0.0.1".to_string(),
            query_port: 25565,
            console_port: 25575,
            console_secret: "secret".to_string(),
        }
    }

    async fn run(mode: Mode, command: &str) -> (CommandResult, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let transport = FakeTransport { mode, counters: counters.clone() };
        let resolver = CommandResolver::new(Arc::new(transport), Duration::from_millis(200));
        (resolver.resolve_command(&address(), command).await, counters)
    }

    #[tokio::test]
    async fn sessions_are_always_closed() {
        for mode in [
            Mode::Succeed,
            Mode::FailMidSession,
            Mode::HangMidSession,
            Mode::ProbeFails,
            Mode::OpenFails,
        ] {
            let (_, counters) = run(mode, "list").await;
            assert_eq!(
                counters.opens.load(Ordering::SeqCst),
                counters.closes.load(Ordering::SeqCst)
            );
        }
    }

    #[tokio::test]
    async fn reachable_console_returns_real_response() {
        let (result, counters) = run(Mode::Succeed, "time set day").await;
        assert!(result.succeeded);
        assert_eq!(result.source, Source::Real);
        assert_eq!(result.response_text.as_deref(), Some("ran time set day"));
        assert!(result.error.is_none());
        assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mid_session_failure_is_reported_as_real_failure() {
        let (result, _) = run(Mode::FailMidSession, "list").await;
        assert!(!result.succeeded);
        assert_eq!(result.source, Source::Real);
        assert!(result.error.unwrap().contains("connection reset"));

        let (result, _) = run(Mode::OpenFails, "list").await;
        assert!(!result.succeeded);
        assert_eq!(result.source, Source::Real);
    }

    #[tokio::test]
    async fn unreachable_console_is_simulated_without_opening() {
        let (result, counters) = run(Mode::ProbeFails, "say hi").await;
        assert!(result.succeeded);
        assert_eq!(result.source, Source::Simulated);
        assert_eq!(result.response_text.as_deref(), Some("[Server] hi"));
        assert!(result.error.unwrap().contains("connection refused"));
        assert_eq!(counters.opens.load(Ordering::SeqCst), 0);
    }
}
