//! Command line and environment configuration for the relay server

use clap::Parser;
use shared::{DEFAULT_ALLOWED_ORIGIN, DEFAULT_PORT};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Real-time position relay server", long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, env = "SYNC_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, env = "SYNC_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Browser origins allowed to open a connection ("*" allows any)
    #[arg(
        long = "allowed-origin",
        env = "SYNC_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_ALLOWED_ORIGIN
    )]
    pub allowed_origins: Vec<String>,

    /// Tiled JSON map providing the `playerSpawn` spawn point
    #[arg(long)]
    pub map: Option<PathBuf>,

    /// Messages buffered per connection before updates to it are dropped
    #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..))]
    pub outbound_queue: u32,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn origin_policy(&self) -> OriginPolicy {
        OriginPolicy::new(self.allowed_origins.clone())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            map: None,
            outbound_queue: 256,
        }
    }
}

/// Which `Origin` headers may open a WebSocket.
///
/// Handshakes without an `Origin` header come from non-browser clients and
/// are always accepted; cross-origin checks only mean something to browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    any: bool,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        let allowed: Vec<String> = allowed
            .into_iter()
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        let any = allowed.iter().any(|origin| origin == "*");
        Self { allowed, any }
    }

    pub fn allow_any() -> Self {
        Self::new(vec!["*".to_string()])
    }

    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(_) if self.any => true,
            Some(origin) => {
                let origin = origin.trim_end_matches('/');
                self.allowed
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(origin))
            }
        }
    }
}
