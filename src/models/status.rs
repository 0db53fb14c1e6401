// src/models/status.rs

/// Text shown next to anything that did not come from the live server.
pub const SIMULATED_NOTE: &str = "This is simulated data - no real server was reached";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Real,
    Simulated,
}

/// What a successful status probe reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub players_online: u32,
    pub players_max: u32,
    pub sample: Vec<String>,
    pub version: String,
    pub protocol: i32,
    pub description: String,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusResult {
    pub online: bool,
    pub players_online: u32,
    pub players_max: u32,
    pub players_list: Vec<String>,
    pub version: String,
    pub motd: String,
    pub latency_ms: f64,
    pub source: Source,
    pub error: Option<String>,
}

impl StatusResult {
    pub fn from_probe(report: ProbeReport) -> Self {
        Self {
            online: true,
            players_online: report.players_online,
            players_max: report.players_max,
            players_list: report.sample,
            version: report.version,
            motd: report.description,
            latency_ms: report.latency_ms,
            source: Source::Real,
            error: None,
        }
    }

    /// Disclosure line for simulated results, `None` for live data.
    pub fn disclosure(&self) -> Option<String> {
        disclosure(self.source, self.error.as_deref())
    }
}

pub(crate) fn disclosure(source: Source, error: Option<&str>) -> Option<String> {
    match (source, error) {
        (Source::Real, _) => None,
        (Source::Simulated, Some(reason)) => Some(format!("{} ({})", SIMULATED_NOTE, reason)),
        (Source::Simulated, None) => Some(SIMULATED_NOTE.to_string()),
    }
}
