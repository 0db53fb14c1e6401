// src/resolver/status.rs
use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};
use crate::models::server::ServerAddress;
use crate::models::status::StatusResult;
use crate::resolver::{simulate, ResolveError, StatusProbe};

/// Live status with a simulated fallback. Never fails.
#[derive(Clone)]
pub struct StatusResolver {
    probe: Arc<dyn StatusProbe>,
    timeout: Duration,
}

impl StatusResolver {
    pub fn new(probe: Arc<dyn StatusProbe>, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    pub async fn resolve_status(&self, address: &ServerAddress) -> StatusResult {
        let outcome = match tokio::time::timeout(self.timeout, self.probe.probe(address)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Connectivity(format!(
                "no status reply within {}s",
                self.timeout.as_secs_f32()
            ))),
        };

        match outcome {
            Ok(report) => {
                debug!(
                    "Status probe of {} ok: {}/{} players, {} (protocol {}), {:.2}ms",
                    address, report.players_online, report.players_max,
                    report.version, report.protocol, report.latency_ms
                );
                StatusResult::from_probe(report)
            }
            Err(e) => {
                warn!("Status probe of {} failed, using simulated status: {}", address, e);
                simulate::status(e.to_string())
            }
        }
    }
}
