//! Connection targets
//!
//! A target is validated up front so malformed input is rejected before any
//! session is created.

use crate::error::{ApError, Result};
use std::fmt;

/// Port the multiworld server listens on when none is given
pub const DEFAULT_PORT: u16 = 38281;

/// Validated server URI plus slot credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    uri: String,
    slot: String,
    password: String,
}

impl ConnectionTarget {
    /// Build a target from user input
    ///
    /// `server` may be `host`, `host:port`, or a full `ws://` / `wss://` URI.
    pub fn new(server: &str, slot: &str, password: &str) -> Result<Self> {
        let slot = slot.trim();
        if slot.is_empty() {
            return Err(ApError::InvalidArgument("slot name is empty".into()));
        }

        Ok(Self {
            uri: build_uri(server)?,
            slot: slot.to_string(),
            password: password.to_string(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// Password stays out of logs.
impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("uri", &self.uri)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.slot, self.uri)
    }
}

/// Normalize a server address into a WebSocket URI
///
/// - `localhost` -> `ws://localhost:38281`
/// - `archipelago.gg:51234` -> `wss://archipelago.gg:51234`
/// - `ws://host:1234` is kept as is
pub fn build_uri(server: &str) -> Result<String> {
    let server = server.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err(ApError::InvalidArgument("server address is empty".into()));
    }
    if server.chars().any(char::is_whitespace) {
        return Err(ApError::InvalidArgument(format!(
            "server address contains whitespace: {:?}",
            server
        )));
    }

    let (scheme, authority) = match server.split_once("://") {
        Some((scheme @ ("ws" | "wss"), rest)) => (Some(scheme), rest),
        Some((scheme, _)) => {
            return Err(ApError::InvalidArgument(format!(
                "unsupported scheme: {}",
                scheme
            )));
        }
        None => (None, server),
    };

    let (host, port) = split_host_port(authority)?;
    let scheme = scheme.unwrap_or(if is_local(host) { "ws" } else { "wss" });

    Ok(format!("{}://{}:{}", scheme, host, port.unwrap_or(DEFAULT_PORT)))
}

fn split_host_port(authority: &str) -> Result<(&str, Option<u16>)> {
    // Bracketed IPv6: [::1]:38281
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (inner, after) = rest
            .split_once(']')
            .ok_or_else(|| ApError::InvalidArgument(format!("unclosed '[' in {}", authority)))?;
        let port = match after {
            "" => None,
            p => Some(p.strip_prefix(':').ok_or_else(|| {
                ApError::InvalidArgument(format!("unexpected text after host: {}", p))
            })?),
        };
        // Keep the brackets so the URI stays valid
        (&authority[..inner.len() + 2], port)
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() || host == "[]" {
        return Err(ApError::InvalidArgument("server host is empty".into()));
    }

    let port = match port {
        None => None,
        Some(p) => match p.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(ApError::InvalidArgument(format!("invalid port: {:?}", p)));
            }
            Ok(port) => Some(port),
        },
    };

    Ok((host, port))
}

fn is_local(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]")
}
