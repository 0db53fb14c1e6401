// src/utils.rs
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use std::net::IpAddr;
use log::debug;
use std::fmt;

#[derive(Debug)]
pub enum RequestError {
    MissingPeerIP,
    InvalidForwardedHeader,
    UntrustedSource(String),
    InvalidSecretToken,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeerIP => write!(f, "Failed to extract client IP"),
            Self::InvalidForwardedHeader => write!(f, "Invalid X-Forwarded-For header"),
            Self::UntrustedSource(ip) => write!(f, "Request from non-Telegram IP: {}", ip),
            Self::InvalidSecretToken => write!(f, "Missing or wrong secret token"),
        }
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::UntrustedSource(_) | Self::InvalidSecretToken => {
                HttpResponse::Forbidden().body(self.to_string())
            }
            _ => HttpResponse::BadRequest().body(self.to_string()),
        }
    }
}

/// Connection peer, or the first `X-Forwarded-For` hop when running behind a trusted proxy.
pub fn extract_client_ip(req: &HttpRequest, trust_forwarded: bool) -> Result<IpAddr, RequestError> {
    if trust_forwarded {
        if let Some(forwarded_for) = req.headers().get("X-Forwarded-For") {
            let first = forwarded_for
                .to_str()
                .ok()
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .ok_or(RequestError::InvalidForwardedHeader)?;
            let ip = first.parse::<IpAddr>().map_err(|_| RequestError::InvalidForwardedHeader)?;
            debug!("Using forwarded client IP {}", ip);
            return Ok(ip);
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip())
        .ok_or(RequestError::MissingPeerIP)
}
