//! Relay configuration loaded from the environment.
//!
//! The only setting is `PORT` (read from the process environment or a
//! `.env` file via `dotenvy`). The relay always binds every interface.

use std::net::{Ipv4Addr, SocketAddr};

use crate::error::RelayError;

/// Port used when `PORT` is unset or empty.
pub const DEFAULT_PORT: u16 = 8888;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// TCP port to listen on.
    pub port: u16,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidConfig`] if `PORT` is set but is not a
    /// valid port number.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        let port = parse_port(std::env::var("PORT").ok().as_deref())?;
        Ok(Self { port })
    }

    /// Socket address to bind the listener to (`0.0.0.0:<port>`).
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Parses a raw `PORT` value, falling back to [`DEFAULT_PORT`] when the
/// variable is missing or blank.
fn parse_port(raw: Option<&str>) -> Result<u16, RelayError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(value) => value
            .parse()
            .map_err(|err| RelayError::InvalidConfig(format!("PORT={value:?}: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_uses_default() {
        assert!(matches!(parse_port(None), Ok(DEFAULT_PORT)));
    }

    #[test]
    fn empty_port_uses_default() {
        assert!(matches!(parse_port(Some("")), Ok(8888)));
        assert!(matches!(parse_port(Some("  ")), Ok(8888)));
    }

    #[test]
    fn explicit_port_is_used() {
        assert!(matches!(parse_port(Some("3000")), Ok(3000)));
        assert!(matches!(parse_port(Some(" 0 ")), Ok(0)));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(matches!(
            parse_port(Some("http")),
            Err(RelayError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse_port(Some("70000")),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn listens_on_all_interfaces() {
        let config = RelayConfig { port: 4242 };
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:4242");
        assert_eq!(RelayConfig::default().port, DEFAULT_PORT);
    }
}
