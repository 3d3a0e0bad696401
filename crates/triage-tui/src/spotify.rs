//! Remote playback-control API client (Spotify Web API).
//!
//! Thin wrapper over reqwest: every operation is a single request against the
//! user's active device. Mutations are fire-and-forget from the caller's
//! point of view; the next poll tick observes their effect.
//!
//! Authorization uses the OAuth refresh-token grant. The access token is
//! cached and renewed with a small margin before expiry; the initial exchange
//! happens in [`SpotifyClient::connect`] so bad credentials fail at startup.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use triage_core::config::SpotifyConfig;
use triage_core::model::PlaybackSnapshot;

/// Renew the access token this long before its advertised expiry.
const TOKEN_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("missing credentials: {0}")]
    Credentials(String),
    #[error("token exchange failed: {0}")]
    Auth(String),
    #[error("api returned status {0}")]
    Api(StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Enrichment detail for a single track.
#[derive(Debug, Clone)]
pub struct TrackDetail {
    pub name: String,
    pub album_name: Option<String>,
}

/// The remote surface the tracker and dispatcher consume. A trait so tests
/// can substitute a recording fake.
#[async_trait]
pub trait PlaybackApi: Send + Sync {
    /// Current playback, or `None` when nothing (or a non-track item) plays.
    async fn get_playback(&self) -> Result<Option<PlaybackSnapshot>>;
    async fn skip_next(&self) -> Result<()>;
    async fn skip_previous(&self) -> Result<()>;
    async fn seek(&self, position_ms: u64) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn resume(&self) -> Result<()>;
    async fn save_track(&self, track_id: &str) -> Result<()>;
    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()>;
    async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()>;
    async fn get_track(&self, track_id: &str) -> Result<TrackDetail>;
    async fn get_playlist_name(&self, playlist_id: &str) -> Result<String>;
}

// ── Credentials / token state ─────────────────────────────────────────────────

struct Credentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl Credentials {
    fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| SpotifyError::Credentials(name.to_string()))
        };
        Ok(Self {
            client_id: var("SPOTIFY_CLIENT_ID")?,
            client_secret: var("SPOTIFY_CLIENT_SECRET")?,
            refresh_token: var("SPOTIFY_REFRESH_TOKEN")?,
        })
    }
}

struct Token {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct SpotifyClient {
    http: Client,
    api_base: String,
    accounts_base: String,
    credentials: Credentials,
    token: Mutex<Option<Token>>,
}

impl SpotifyClient {
    /// Build the client from environment credentials and perform the initial
    /// token exchange. Credential failure here is fatal by design.
    pub async fn connect(config: &SpotifyConfig) -> Result<Self> {
        let client = Self {
            http: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            accounts_base: config.accounts_base.trim_end_matches('/').to_string(),
            credentials: Credentials::from_env()?,
            token: Mutex::new(None),
        };
        client.bearer().await?;
        Ok(client)
    }

    async fn bearer(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        debug!("refreshing access token");
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_base))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SpotifyError::Auth(format!("status {}", response.status())));
        }
        let token: TokenResponse = response.json().await?;
        let access = token.access_token.clone();
        *slot = Some(Token {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access)
    }

    async fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let bearer = self.bearer().await?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(bearer))
    }

    fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(SpotifyError::Api(status))
        }
    }
}

#[async_trait]
impl PlaybackApi for SpotifyClient {
    async fn get_playback(&self) -> Result<Option<PlaybackSnapshot>> {
        let response = self.request(Method::GET, "/me/player").await?.send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let wire: PlaybackWire = Self::expect_ok(response)?.json().await?;
        Ok(wire.into_snapshot())
    }

    async fn skip_next(&self) -> Result<()> {
        let response = self
            .request(Method::POST, "/me/player/next")
            .await?
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn skip_previous(&self) -> Result<()> {
        let response = self
            .request(Method::POST, "/me/player/previous")
            .await?
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        let response = self
            .request(Method::PUT, "/me/player/seek")
            .await?
            .query(&[("position_ms", position_ms)])
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let response = self
            .request(Method::PUT, "/me/player/pause")
            .await?
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let response = self
            .request(Method::PUT, "/me/player/play")
            .await?
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn save_track(&self, track_id: &str) -> Result<()> {
        let response = self
            .request(Method::PUT, "/me/tracks")
            .await?
            .query(&[("ids", track_id)])
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let response = self
            .request(Method::POST, &format!("/playlists/{playlist_id}/tracks"))
            .await?
            .json(&serde_json::json!({
                "uris": [format!("spotify:track:{track_id}")],
            }))
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/playlists/{playlist_id}/tracks"))
            .await?
            .json(&serde_json::json!({
                "tracks": [{ "uri": format!("spotify:track:{track_id}") }],
            }))
            .send()
            .await?;
        Self::expect_ok(response)?;
        Ok(())
    }

    async fn get_track(&self, track_id: &str) -> Result<TrackDetail> {
        let response = self
            .request(Method::GET, &format!("/tracks/{track_id}"))
            .await?
            .send()
            .await?;
        let wire: TrackWire = Self::expect_ok(response)?.json().await?;
        Ok(TrackDetail {
            name: wire.name,
            album_name: wire.album.map(|a| a.name),
        })
    }

    async fn get_playlist_name(&self, playlist_id: &str) -> Result<String> {
        let response = self
            .request(Method::GET, &format!("/playlists/{playlist_id}"))
            .await?
            .query(&[("fields", "name")])
            .send()
            .await?;
        let wire: PlaylistWire = Self::expect_ok(response)?.json().await?;
        Ok(wire.name)
    }
}

// ── Wire structs ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlaybackWire {
    item: Option<TrackWire>,
    context: Option<ContextWire>,
    is_playing: bool,
    progress_ms: Option<u64>,
    currently_playing_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackWire {
    id: Option<String>,
    name: String,
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<ArtistWire>,
    album: Option<AlbumWire>,
}

#[derive(Debug, Deserialize)]
struct ArtistWire {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumWire {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContextWire {
    #[serde(rename = "type")]
    kind: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistWire {
    name: String,
}

impl PlaybackWire {
    fn into_snapshot(self) -> Option<PlaybackSnapshot> {
        // Podcasts/ads carry no usable track identity.
        if self.currently_playing_type.as_deref() != Some("track") {
            return None;
        }
        let item = self.item?;
        let track_id = item.id?;

        let playlist_id = self
            .context
            .as_ref()
            .filter(|c| c.kind == "playlist")
            .and_then(|c| c.uri.rsplit(':').next())
            .map(str::to_string);

        let artists: HashMap<String, String> = item
            .artists
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();

        Some(PlaybackSnapshot {
            track_id,
            track_name: item.name,
            artists,
            duration_ms: item.duration_ms,
            progress_ms: self.progress_ms.unwrap_or(0),
            is_playing: self.is_playing,
            playlist_id,
        })
    }
}
