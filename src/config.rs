use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

const DEFAULT_BROADCAST_SECS: u64 = 3;

pub struct Config {
    pub discord_token: String,
    pub dashboard_addr: SocketAddr,
    pub cookies_path: PathBuf,
    pub broadcast_interval: Duration,
    pub ytdlp_path: String,
    pub enable_fallback: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Panics without `DISCORD_TOKEN`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .expect("DISCORD_TOKEN environment variable is required");

        let dashboard_addr = lookup("DASHBOARD_ADDR")
            .or_else(|| lookup("PORT").map(|port| format!("0.0.0.0:{}", port.trim())))
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!("ignoring invalid dashboard address {raw:?}: {e}");
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let broadcast_secs = lookup("BROADCAST_INTERVAL_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_BROADCAST_SECS);

        Self {
            discord_token,
            dashboard_addr,
            cookies_path: lookup("COOKIES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cookies.txt")),
            broadcast_interval: Duration::from_secs(broadcast_secs),
            ytdlp_path: lookup("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
            enable_fallback: lookup("ENABLE_FALLBACK")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
        }
    }
}
