// src/resolver/mod.rs
pub mod command;
pub mod simulate;
pub mod status;

use std::fmt;
use std::io;
use async_trait::async_trait;
use crate::models::server::ServerAddress;
use crate::models::status::ProbeReport;

pub use command::CommandResolver;
pub use status::StatusResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Refused, unreachable or timed out.
    Connectivity(String),
    /// The peer answered, but not with something we accept.
    Protocol(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity(reason) => write!(f, "Server unreachable: {}", reason),
            Self::Protocol(reason) => write!(f, "Protocol error: {}", reason),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<io::Error> for ResolveError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => Self::Protocol(e.to_string()),
            _ => Self::Connectivity(e.to_string()),
        }
    }
}

/// Asks a server for its player count, version and MOTD.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self, address: &ServerAddress) -> Result<ProbeReport, ResolveError>;
}

/// Opens remote console sessions.
#[async_trait]
pub trait ConsoleTransport: Send + Sync {
    /// Cheap reachability check; must not execute anything on the server.
    async fn probe(&self, address: &ServerAddress) -> Result<(), ResolveError>;

    async fn open(&self, address: &ServerAddress) -> Result<Box<dyn ConsoleSession>, ResolveError>;
}

#[async_trait]
pub trait ConsoleSession: Send {
    async fn execute(&mut self, command: &str) -> Result<String, ResolveError>;

    async fn close(self: Box<Self>);
}
