use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Directory for daily rolling log files; `None` logs to stdout only.
    pub log_dir: Option<String>,
    pub redis_url: Option<String>,
    pub reclaimer_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env_flag(std::env::var("ENABLE_FILE_LOGS").ok().as_deref(), false)
            .then(|| std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()));

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let reclaimer_enabled = env_flag(std::env::var("ENABLE_RECLAIMER").ok().as_deref(), true);

        Self {
            host,
            port,
            log_level,
            log_dir,
            redis_url,
            reclaimer_enabled,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// `true`/`1` and `false`/`0` switch a flag; anything else keeps `default`.
fn env_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(str::trim) {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
