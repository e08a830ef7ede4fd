use std::sync::Arc;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use super::error::PlaybackError;
use super::Track;
use crate::credentials::CookieStore;

/// YouTube player clients the fallback engine asks yt-dlp to use. They take
/// a different route through YouTube's checks than the default web client.
pub const FALLBACK_PLAYER_CLIENT: &str = "tv,web_safari";

/// `sp` filter of YouTube's search page restricting results to playlists.
const PLAYLIST_SEARCH_FILTER: &str = "EgIQAw==";

#[derive(Deserialize)]
struct YtDlpOutput {
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
}

#[derive(Deserialize)]
struct FlatPlaylist {
    title: Option<String>,
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Deserialize)]
struct FlatEntry {
    id: Option<String>,
    url: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
struct SpotifyOEmbed {
    title: String,
}

/// What a user query points at once normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Url(String),
    Search(String),
    YoutubePlaylist(String),
    SpotifyTrack(String),
    SpotifyCollection(String),
}

/// A query resolved to something playable.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Track(Track),
    Playlist { name: String, tracks: Vec<Track> },
}

/// Invocation settings for the yt-dlp executable.
#[derive(Clone)]
pub struct YtDlp {
    program: String,
    cookies: Option<Arc<CookieStore>>,
    player_client: Option<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<String>, cookies: Option<Arc<CookieStore>>) -> Self {
        Self {
            program: program.into(),
            cookies,
            player_client: None,
        }
    }

    /// Same executable and cookies, resolving through other YouTube player clients.
    pub fn with_player_client(mut self, client: impl Into<String>) -> Self {
        self.player_client = Some(client.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `--cookies <path>` when a cookie file is present on disk.
    pub fn cookie_args(&self) -> Vec<String> {
        match &self.cookies {
            Some(store) if store.path().exists() => vec![
                "--cookies".to_string(),
                store.path().display().to_string(),
            ],
            _ => Vec::new(),
        }
    }

    /// Arguments shared by every invocation: cookies and the player client.
    pub fn session_args(&self) -> Vec<String> {
        let mut args = self.cookie_args();
        if let Some(client) = &self.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={client}"));
        }
        args
    }

    fn metadata_args(&self, target: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-j", "-f", "bestaudio", "--no-playlist", "--no-warnings"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.session_args());
        args.push(target.to_string());
        args
    }

    fn stream_args(&self, page_url: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-g", "-f", "bestaudio", "--no-playlist", "--no-warnings"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.session_args());
        args.push(page_url.to_string());
        args
    }

    fn playlist_args(&self, url: &str, limit: Option<usize>) -> Vec<String> {
        let mut args: Vec<String> = ["--flat-playlist", "-J", "--no-warnings"]
            .into_iter()
            .map(String::from)
            .collect();
        if let Some(limit) = limit {
            args.push("--playlist-end".to_string());
            args.push(limit.to_string());
        }
        args.extend(self.session_args());
        args.push(url.to_string());
        args
    }

    async fn run(&self, args: &[String], query: &str) -> Result<Vec<u8>, PlaybackError> {
        let output = Command::new(&self.program).args(args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlaybackError::classify(query, &stderr));
        }
        Ok(output.stdout)
    }

    /// Checks that the executable runs at all.
    pub async fn probe(&self) -> bool {
        match Command::new(&self.program).arg("--version").output().await {
            Ok(out) => out.status.success(),
            Err(e) => {
                debug!("{} probe failed: {e}", self.program);
                false
            }
        }
    }

    /// Resolves a query to one track or, for playlist and album links, every
    /// track of the collection.
    pub async fn resolve(
        &self,
        http_client: &reqwest::Client,
        query: &str,
    ) -> Result<Resolved, PlaybackError> {
        match normalize_query(query) {
            Query::YoutubePlaylist(url) => {
                let (name, tracks) = self.playlist(&url, query).await?;
                Ok(Resolved::Playlist { name, tracks })
            }
            Query::SpotifyCollection(url) => {
                let title = spotify_title(http_client, &url).await?;
                let playlist_url = self.search_playlist(&title, query).await?;
                let (_, tracks) = self.playlist(&playlist_url, query).await?;
                info!("matched Spotify collection `{title}` to {playlist_url}");
                Ok(Resolved::Playlist { name: title, tracks })
            }
            _ => self.get_song_info(http_client, query).await.map(Resolved::Track),
        }
    }

    pub async fn get_song_info(
        &self,
        http_client: &reqwest::Client,
        query: &str,
    ) -> Result<Track, PlaybackError> {
        let search_query = match normalize_query(query) {
            Query::Url(url) => url,
            Query::Search(text) => format!("ytsearch1:{text}"),
            Query::SpotifyTrack(url) => {
                let title = spotify_title(http_client, &url).await?;
                format!("ytsearch1:{title}")
            }
            Query::YoutubePlaylist(_) | Query::SpotifyCollection(_) => {
                return Err(PlaybackError::InvalidInput(
                    "That link is a playlist, not a single track".to_string(),
                ))
            }
        };

        let stdout = self.run(&self.metadata_args(&search_query), query).await?;
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(PlaybackError::NotFound(query.to_string()));
        }

        let info: YtDlpOutput = serde_json::from_slice(&stdout)
            .map_err(|e| PlaybackError::Unknown(format!("unreadable yt-dlp output: {e}")))?;

        let url = info
            .webpage_url
            .or(info.original_url)
            .unwrap_or_else(|| query.to_string());

        Ok(Track {
            title: info.title.unwrap_or_else(|| "Unknown".to_string()),
            source_url: url,
            thumbnail_url: info.thumbnail,
            duration_display: info.duration.map(format_duration),
            author: info
                .uploader
                .or(info.channel)
                .unwrap_or_else(|| "Unknown".to_string()),
            requester: String::new(),
        })
    }

    /// Lists a playlist's entries without resolving each video.
    async fn playlist(&self, url: &str, query: &str) -> Result<(String, Vec<Track>), PlaybackError> {
        let stdout = self.run(&self.playlist_args(url, None), query).await?;
        parse_flat_playlist(&stdout, query)
    }

    /// First YouTube playlist matching `title`.
    async fn search_playlist(&self, title: &str, query: &str) -> Result<String, PlaybackError> {
        let search = reqwest::Url::parse_with_params(
            "https://www.youtube.com/results",
            &[("search_query", title), ("sp", PLAYLIST_SEARCH_FILTER)],
        )
        .map_err(|e| PlaybackError::InvalidInput(e.to_string()))?;

        let stdout = self.run(&self.playlist_args(search.as_str(), Some(1)), query).await?;
        let (_, found) = parse_flat_playlist(&stdout, query)?;
        found
            .into_iter()
            .next()
            .map(|entry| entry.source_url)
            .ok_or_else(|| PlaybackError::NotFound(title.to_string()))
    }

    /// Resolves a page URL to a direct audio stream URL (`yt-dlp -g`).
    pub async fn stream_url(&self, page_url: &str) -> Result<String, PlaybackError> {
        let stdout = self.run(&self.stream_args(page_url), page_url).await?;

        String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("http"))
            .map(str::to_string)
            .ok_or_else(|| PlaybackError::NotFound(page_url.to_string()))
    }
}

/// Reads `yt-dlp --flat-playlist -J` output. Private and deleted videos are skipped.
fn parse_flat_playlist(raw: &[u8], query: &str) -> Result<(String, Vec<Track>), PlaybackError> {
    let playlist: FlatPlaylist = serde_json::from_slice(raw)
        .map_err(|e| PlaybackError::Unknown(format!("unreadable yt-dlp playlist: {e}")))?;

    let tracks: Vec<Track> = playlist
        .entries
        .into_iter()
        .flatten()
        .filter(|e| {
            !matches!(
                e.title.as_deref(),
                Some("[Private video]") | Some("[Deleted video]")
            )
        })
        .filter_map(|entry| {
            let source_url = entry
                .url
                .or_else(|| entry.id.map(|id| format!("https://www.youtube.com/watch?v={id}")))?;
            Some(Track {
                title: entry.title.unwrap_or_else(|| "Unknown".to_string()),
                source_url,
                thumbnail_url: entry.thumbnails.into_iter().last().map(|t| t.url),
                duration_display: entry.duration.map(format_duration),
                author: entry
                    .uploader
                    .or(entry.channel)
                    .unwrap_or_else(|| "Unknown".to_string()),
                requester: String::new(),
            })
        })
        .collect();

    if tracks.is_empty() {
        return Err(PlaybackError::NotFound(query.to_string()));
    }
    let name = playlist.title.unwrap_or_else(|| "Playlist".to_string());
    Ok((name, tracks))
}

pub fn normalize_query(query: &str) -> Query {
    let query = query.trim();
    let query = query.strip_prefix("spotify:").unwrap_or(query);

    if let Some(spotify) = spotify_url(query) {
        return spotify;
    }

    if query.starts_with("http://") || query.starts_with("https://") {
        if is_youtube_playlist(query) {
            Query::YoutubePlaylist(query.to_string())
        } else {
            Query::Url(query.to_string())
        }
    } else {
        Query::Search(query.to_string())
    }
}

/// Playlist pages only; a video link carrying a `list=` still plays the one video.
fn is_youtube_playlist(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com/playlist") && lower.contains("list=")
}

/// Reduces `open.spotify.com` links to `https://open.spotify.com/<kind>/<id>`,
/// dropping locale segments and tracking parameters.
fn spotify_url(query: &str) -> Option<Query> {
    let start = query.find("open.spotify.com/")? + "open.spotify.com/".len();
    let mut segments = query[start..].split('/').filter(|s| !s.is_empty());

    let mut kind = segments.next()?;
    if kind.starts_with("intl-") {
        kind = segments.next()?;
    }

    let id: String = segments
        .next()?
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    if id.is_empty() {
        return None;
    }

    let url = format!("https://open.spotify.com/{kind}/{id}");
    match kind {
        "track" => Some(Query::SpotifyTrack(url)),
        "album" | "playlist" => Some(Query::SpotifyCollection(url)),
        _ => None,
    }
}

async fn spotify_title(http_client: &reqwest::Client, url: &str) -> Result<String, PlaybackError> {
    let response = http_client
        .get("https://open.spotify.com/oembed")
        .query(&[("url", url)])
        .send()
        .await
        .map_err(|e| PlaybackError::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(PlaybackError::NotFound(url.to_string()));
    }

    let embed: SpotifyOEmbed = response
        .json()
        .await
        .map_err(|e| PlaybackError::Network(e.to_string()))?;
    Ok(embed.title)
}

pub fn format_duration(seconds: f64) -> String {
    let secs = seconds.max(0.0) as u64;
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let remaining = secs % 60;
    if hours > 0 {
        format!("{hours}:{mins:02}:{remaining:02}")
    } else {
        format!("{mins}:{remaining:02}")
    }
}
