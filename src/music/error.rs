use thiserror::Error;

/// Every failure a playback operation can report. `Display` is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("No results found for `{0}`")]
    NotFound(String),

    #[error("YouTube is asking to confirm you're not a bot. Update the cookies with `/cookies`.")]
    AuthRequired,

    #[error("The audio backend (yt-dlp) is not installed on this host")]
    BackendMissing,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Playback failed: {0}")]
    Unknown(String),

    #[error("Nothing is playing in this server")]
    NoSession,

    #[error("No radio is currently playing!")]
    NoRadio,

    #[error("{0}")]
    InvalidInput(String),
}

impl PlaybackError {
    /// Maps yt-dlp's stderr onto an error kind.
    pub fn classify(query: &str, stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("sign in to confirm") || lower.contains("not a bot") {
            Self::AuthRequired
        } else if lower.contains("no video results")
            || lower.contains("unsupported url")
            || lower.contains("video unavailable")
            || lower.contains("is not a valid url")
            || lower.contains("does not exist")
        {
            Self::NotFound(query.to_string())
        } else if lower.contains("timed out")
            || lower.contains("unable to download")
            || lower.contains("connection")
            || lower.contains("temporary failure")
            || lower.contains("http error 5")
        {
            Self::Network(first_line(stderr))
        } else {
            Self::Unknown(first_line(stderr))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AuthRequired => "auth_required",
            Self::BackendMissing => "backend_missing",
            Self::Network(_) => "network",
            Self::Unknown(_) => "unknown",
            Self::NoSession => "no_session",
            Self::NoRadio => "no_radio",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Whether the other engine could plausibly succeed where this one failed.
    pub fn allows_fallback(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::Network(_) | Self::Unknown(_))
    }
}

impl From<std::io::Error> for PlaybackError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::BackendMissing
        } else {
            Self::Unknown(e.to_string())
        }
    }
}

impl From<songbird::error::JoinError> for PlaybackError {
    fn from(e: songbird::error::JoinError) -> Self {
        Self::Network(format!("could not join the voice channel: {e}"))
    }
}

impl From<songbird::error::ControlError> for PlaybackError {
    fn from(e: songbird::error::ControlError) -> Self {
        Self::Unknown(e.to_string())
    }
}

fn first_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .trim_start_matches("ERROR:")
        .trim()
        .to_string()
}
