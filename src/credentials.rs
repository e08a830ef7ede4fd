use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Minimum gap between two automatic credential refreshes.
pub const REMEDIATION_COOLDOWN: Duration = Duration::from_secs(60);

const COOKIE_DOMAIN: &str = ".youtube.com";
const COOKIE_EXPIRY: i64 = 1_782_142_488;
const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";

const DEFAULT_COOKIES: &str = "# Netscape HTTP Cookie File\n\
# This file is generated by the bot. Replace it with /cookies or POST /update-cookies.\n\
.youtube.com\tTRUE\t/\tTRUE\t1782142488\tPREF\tf6=40000000&hl=en\n\
.youtube.com\tTRUE\t/\tTRUE\t1782142488\tSOCS\tCAI\n";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no valid `name=value` cookie pairs found")]
    Empty,

    #[error("cookie file error: {0}")]
    Io(#[from] std::io::Error),
}

/// The Netscape cookie file handed to yt-dlp via `--cookies`.
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the default cookie file when none exists yet.
    pub async fn ensure_default(&self) -> Result<bool, CredentialError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }
        tokio::fs::write(&self.path, DEFAULT_COOKIES).await?;
        info!("wrote default cookie file to {}", self.path.display());
        Ok(true)
    }

    pub async fn load(&self) -> Result<String, CredentialError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    /// Puts the default file back when the current one is missing, unreadable
    /// or holds no cookie lines. Returns whether the file was rewritten.
    pub async fn repair(&self) -> Result<bool, CredentialError> {
        let usable = match self.load().await {
            Ok(blob) => has_entries(&blob),
            Err(CredentialError::Io(e))
                if matches!(e.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidData) =>
            {
                false
            }
            Err(e) => return Err(e),
        };
        if usable {
            return Ok(false);
        }

        tokio::fs::write(&self.path, DEFAULT_COOKIES).await?;
        warn!("restored default cookie file at {}", self.path.display());
        Ok(true)
    }

    /// Replaces the file with the pairs of a browser `Cookie:` header.
    /// Returns how many cookies were written.
    pub async fn replace(&self, cookie_header: &str) -> Result<usize, CredentialError> {
        let pairs = parse_cookie_header(cookie_header);
        if pairs.is_empty() {
            return Err(CredentialError::Empty);
        }

        let blob = render_netscape(&pairs, chrono::Utc::now());
        tokio::fs::write(&self.path, &blob).await?;

        info!("cookie file updated with {} entries", pairs.len());
        Ok(pairs.len())
    }
}

fn has_entries(blob: &str) -> bool {
    blob.lines().any(|l| !l.starts_with('#') && !l.trim().is_empty())
}

/// Splits `a=1; b=2` into pairs, skipping fragments without a name or `=`.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

pub fn render_netscape(pairs: &[(String, String)], now: chrono::DateTime<chrono::Utc>) -> String {
    let mut out = format!(
        "{NETSCAPE_HEADER}\n# Updated: {}\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for (name, value) in pairs {
        out.push_str(&format!(
            "{COOKIE_DOMAIN}\tTRUE\t/\tTRUE\t{COOKIE_EXPIRY}\t{name}\t{value}\n"
        ));
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationOutcome {
    Refreshed,
    Failed,
    /// Another attempt ran inside the cooldown window.
    Suppressed,
}

/// One-shot credential refresh, rate limited by a cooldown window.
///
/// A refresh only counts when it changed something: a broken or empty cookie
/// file is replaced by the default one. A file that already holds cookies
/// can only be fixed by the user, so the attempt fails and the caller moves on
/// to the fallback engine.
pub struct Remediation {
    store: Arc<CookieStore>,
    cooldown: Duration,
    last_attempt: Mutex<Option<Instant>>,
}

impl Remediation {
    pub fn new(store: Arc<CookieStore>, cooldown: Duration) -> Self {
        Self {
            store,
            cooldown,
            last_attempt: Mutex::new(None),
        }
    }

    pub async fn attempt(&self) -> RemediationOutcome {
        {
            let mut last = self.last_attempt.lock().await;
            if last.is_some_and(|at| at.elapsed() < self.cooldown) {
                return RemediationOutcome::Suppressed;
            }
            *last = Some(Instant::now());
        }

        match self.store.repair().await {
            Ok(true) => RemediationOutcome::Refreshed,
            Ok(false) => {
                info!(
                    "cookies in {} are unchanged, new ones are needed via /cookies",
                    self.store.path().display()
                );
                RemediationOutcome::Failed
            }
            Err(e) => {
                warn!("cookie repair failed: {e}");
                RemediationOutcome::Failed
            }
        }
    }

    /// Opens the window again, used after the user supplies fresh cookies.
    pub async fn reset(&self) {
        *self.last_attempt.lock().await = None;
    }
}
