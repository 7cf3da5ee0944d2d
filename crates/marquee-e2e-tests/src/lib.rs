use std::time::Duration;

use anyhow::{Result, anyhow};
use marquee_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tracing::debug;

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(4030..5030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

/// Keeps temporary database directory alive for the duration of a test.
pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, extra_args: &[&str]) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let dsn = format!("sqlite://{}/marquee.db", tmp_data_dir.path().to_string_lossy());
    let port = random_port()?.to_string();
    let mut args = vec![
        "marquee-e2e-tests",
        "--db-dsn",
        dsn.as_str(),
        "--port",
        port.as_str(),
        "--env",
        "staging",
    ];
    args.extend_from_slice(extra_args);
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    test_config(test_name, &[])
}

pub fn base_url(config: &ServerConfig) -> Url {
    let url = format!("http://{}:{}/", config.listen_address, config.port);
    Url::parse(&url).expect("listen address forms valid URL")
}

/// Starts server in background task and waits until healthcheck answers.
pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let health_url = base_url(&args).join("v1/healthcheck")?;
    let state = marquee_server::build_state(&args).await?;
    tokio::spawn(async move {
        if let Err(e) = marquee_server::run_with_state(args, state).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!("Server not ready, status {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start in time"))
}

pub fn extend_url(base_url: &Url, path: impl AsRef<str>) -> Url {
    base_url.join(path.as_ref()).expect("valid relative URL")
}
