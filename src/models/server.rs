// src/models/server.rs
use std::fmt;

/// Where the Minecraft server lives and how to reach its console.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub query_port: u16,
    pub console_port: u16,
    pub console_secret: String,
}

impl ServerAddress {
    pub fn query_endpoint(&self) -> String {
        format!("{}:{}", self.host, self.query_port)
    }

    pub fn console_endpoint(&self) -> String {
        format!("{}:{}", self.host, self.console_port)
    }
}

// Keep the RCON password out of logs.
impl fmt::Debug for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerAddress")
            .field("host", &self.host)
            .field("query_port", &self.query_port)
            .field("console_port", &self.console_port)
            .field("console_secret", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query_endpoint())
    }
}
