use std::fmt::Display;

use crate::error::Result;
pub use clap::Parser;
use marquee_app::decode::DEFAULT_MAX_BODY_BYTES;
use marquee_types::config::DbConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "Movie catalogue REST service")]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 4000,
        env = "MARQUEE_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "MARQUEE_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        value_enum,
        default_value_t = Environment::Development,
        env = "MARQUEE_ENV",
        help = "Deployment environment, reported by healthcheck"
    )]
    pub env: Environment,

    #[arg(
        long,
        default_value_t = DEFAULT_MAX_BODY_BYTES,
        env = "MARQUEE_MAX_BODY_BYTES",
        help = "Maximum size of request body in bytes"
    )]
    pub max_body_bytes: usize,

    #[command(flatten)]
    pub db: DbConfig,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }
}
