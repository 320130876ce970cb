//! Process settings.
//!
//! Every option is a command-line flag with an environment-variable fallback,
//! so the same binary runs from a shell or a container manifest.

use crate::store::pool::DEFAULT_POOL_SIZE;
use crate::store::Endpoint;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use std::time::Duration;

/// Which [`RecordStore`](crate::store::RecordStore) the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// A Redis-compatible server
    Redis,
    /// In-process map, lost on restart
    Memory,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "phonebook", version)]
#[command(about = "Phone number to address record service")]
pub struct Settings {
    /// Address to listen on
    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "APP_PORT", default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(
        long,
        env = "DEBUG",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,

    /// Storage backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = BackendKind::Redis)]
    pub backend: BackendKind,

    #[arg(long, env = "REDIS_HOST", default_value = "localhost")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Logical database index
    #[arg(long, env = "REDIS_DB", default_value_t = 0)]
    pub redis_db: u32,

    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    /// Maximum number of open backend connections
    #[arg(long, env = "REDIS_POOL_SIZE", default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: usize,

    #[arg(long, env = "REDIS_CONNECT_TIMEOUT_MS", default_value_t = 5000)]
    pub connect_timeout_ms: u64,
}

impl Settings {
    /// `host:port` for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> Endpoint {
        let endpoint = Endpoint::new(self.redis_host.clone(), self.redis_port)
            .with_db(self.redis_db)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms));
        match &self.redis_password {
            Some(password) => endpoint.with_password(password.clone()),
            None => endpoint,
        }
    }

    /// Default filter directive when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let settings = Settings::try_parse_from([
            "phonebook",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--debug",
            "--backend",
            "memory",
            "--redis-host",
            "cache.internal",
            "--redis-port",
            "6380",
            "--redis-db",
            "2",
            "--redis-password",
            "hunter2",
            "--pool-size",
            "4",
            "--connect-timeout-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(settings.bind_address(), "127.0.0.1:9000");
        assert_eq!(settings.backend, BackendKind::Memory);
        assert_eq!(settings.log_level(), "debug");
        assert_eq!(settings.pool_size, 4);

        let endpoint = settings.endpoint();
        assert_eq!(endpoint.address(), "cache.internal:6380");
        assert_eq!(endpoint.db, 2);
        assert_eq!(endpoint.password.as_deref(), Some("hunter2"));
        assert_eq!(endpoint.connect_timeout, Duration::from_millis(250));
        assert_eq!(endpoint.to_string(), "redis://cache.internal:6380/2");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Settings::try_parse_from(["phonebook", "--backend", "sqlite"]).is_err());
    }

    #[test]
    fn test_port_must_be_numeric() {
        assert!(Settings::try_parse_from(["phonebook", "--port", "http"]).is_err());
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Settings::command().debug_assert();
    }
}
