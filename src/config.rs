use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{GuestbookError, Result};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_HTTP_URL: &str = "http://localhost:4000/graphql";
pub const DEFAULT_WS_URL: &str = "ws://localhost:4000/graphql";
pub const DEFAULT_NAME: &str = "Guest";

/// Server settings. Unset variables fall back to defaults; malformed ones are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub seed_welcome: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            seed_welcome: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let host = match lookup("GUESTBOOK_HOST") {
            Some(raw) => raw.parse::<IpAddr>().map_err(|e| GuestbookError::Config {
                key: "GUESTBOOK_HOST",
                reason: format!("{raw:?}: {e}"),
            })?,
            None => defaults.host,
        };
        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| GuestbookError::Config {
                key: "PORT",
                reason: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };
        let seed_welcome = match lookup("GUESTBOOK_SEED") {
            Some(raw) => parse_flag("GUESTBOOK_SEED", &raw)?,
            None => defaults.seed_welcome,
        };

        Ok(Config {
            host,
            port,
            seed_welcome,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Terminal client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub http_url: String,
    pub ws_url: String,
    pub name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            http_url: DEFAULT_HTTP_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            name: DEFAULT_NAME.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ClientConfig::default();

        let name = match lookup("GUESTBOOK_NAME") {
            Some(raw) if raw.trim().is_empty() => {
                return Err(GuestbookError::Config {
                    key: "GUESTBOOK_NAME",
                    reason: "must not be blank".to_string(),
                })
            }
            Some(raw) => raw.trim().to_string(),
            None => defaults.name,
        };

        Ok(ClientConfig {
            http_url: lookup("GUESTBOOK_HTTP_URL").unwrap_or(defaults.http_url),
            ws_url: lookup("GUESTBOOK_WS_URL").unwrap_or(defaults.ws_url),
            name,
        })
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GuestbookError::Config {
            key,
            reason: format!("{raw:?} is not a boolean"),
        }),
    }
}
