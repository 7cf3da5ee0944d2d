use std::time::Duration;

#[derive(Debug, Clone, clap::Args)]
pub struct DbConfig {
    #[arg(
        long = "db-dsn",
        env = "MARQUEE_DB_DSN",
        default_value = "sqlite://marquee.db",
        help = "Database URL e.g. sqlite://file.db, file is created if it does not exist"
    )]
    pub database_url: String,

    #[arg(
        long = "db-max-open-conns",
        env = "MARQUEE_DB_MAX_OPEN_CONNS",
        default_value_t = 25,
        help = "Maximum number of open connections in the pool"
    )]
    pub max_open_conns: u32,

    #[arg(
        long = "db-max-idle-time",
        env = "MARQUEE_DB_MAX_IDLE_TIME",
        default_value = "15m",
        help = "Maximum idle time of pooled connection in human friendly format (e.g. 15m, 1h)",
        value_parser = humantime::parse_duration
    )]
    pub max_idle_time: Duration,

    #[arg(
        long = "db-query-timeout",
        env = "MARQUEE_DB_QUERY_TIMEOUT",
        default_value = "3s",
        help = "Time limit for single database operation",
        value_parser = humantime::parse_duration
    )]
    pub query_timeout: Duration,
}

impl DbConfig {
    pub fn with_url(database_url: impl Into<String>) -> Self {
        DbConfig {
            database_url: database_url.into(),
            max_open_conns: 25,
            max_idle_time: Duration::from_secs(15 * 60),
            query_timeout: Duration::from_secs(3),
        }
    }
}
