//! Test doubles shared by the tracker and dispatcher tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use triage_core::model::{
    ClassificationRecord, Member, PlaybackSnapshot, PlayerState, PlaylistRole,
};

use crate::spotify::{PlaybackApi, Result, SpotifyError, TrackDetail};
use crate::store::ClassificationLookup;

/// Every remote mutation the fakes record, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SkipNext,
    SkipPrevious,
    Seek(u64),
    Pause,
    Resume,
    SaveTrack(String),
    AddToPlaylist(String, String),
    RemoveFromPlaylist(String, String),
}

#[derive(Default)]
pub struct RecordingApi {
    pub playback: Mutex<Option<PlaybackSnapshot>>,
    calls: Mutex<Vec<Call>>,
    pub fail_skip_previous: AtomicBool,
    pub fail_get_playback: AtomicBool,
}

impl RecordingApi {
    pub fn with_playback(playback: Option<PlaybackSnapshot>) -> Self {
        Self {
            playback: Mutex::new(playback),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaybackApi for RecordingApi {
    async fn get_playback(&self) -> Result<Option<PlaybackSnapshot>> {
        if self.fail_get_playback.load(Ordering::SeqCst) {
            return Err(SpotifyError::Api(StatusCode::BAD_GATEWAY));
        }
        Ok(self.playback.lock().unwrap().clone())
    }

    async fn skip_next(&self) -> Result<()> {
        self.record(Call::SkipNext);
        Ok(())
    }

    async fn skip_previous(&self) -> Result<()> {
        self.record(Call::SkipPrevious);
        if self.fail_skip_previous.load(Ordering::SeqCst) {
            Err(SpotifyError::Api(StatusCode::NOT_FOUND))
        } else {
            Ok(())
        }
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        self.record(Call::Seek(position_ms));
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record(Call::Pause);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.record(Call::Resume);
        Ok(())
    }

    async fn save_track(&self, track_id: &str) -> Result<()> {
        self.record(Call::SaveTrack(track_id.to_string()));
        Ok(())
    }

    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        self.record(Call::AddToPlaylist(
            playlist_id.to_string(),
            track_id.to_string(),
        ));
        Ok(())
    }

    async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        self.record(Call::RemoveFromPlaylist(
            playlist_id.to_string(),
            track_id.to_string(),
        ));
        Ok(())
    }

    async fn get_track(&self, _track_id: &str) -> Result<TrackDetail> {
        Ok(TrackDetail {
            name: "Song".to_string(),
            album_name: Some("Record".to_string()),
        })
    }

    async fn get_playlist_name(&self, _playlist_id: &str) -> Result<String> {
        Ok("Some playlist".to_string())
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub record: Option<ClassificationRecord>,
    pub lookups: AtomicUsize,
}

impl FakeStore {
    pub fn with_record(record: Option<ClassificationRecord>) -> Self {
        Self {
            record,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationLookup for FakeStore {
    async fn find_record(
        &self,
        _playlist_id: &str,
    ) -> anyhow::Result<Option<ClassificationRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.record.clone())
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

pub fn snapshot(track_id: &str, playlist_id: Option<&str>) -> PlaybackSnapshot {
    PlaybackSnapshot {
        track_id: track_id.to_string(),
        track_name: "Song".to_string(),
        artists: HashMap::from([("a1".to_string(), "Artist".to_string())]),
        duration_ms: 300_000,
        progress_ms: 50_000,
        is_playing: true,
        playlist_id: playlist_id.map(str::to_string),
    }
}

/// Group record: P1 primary "Week 07", P2 sibling "rock", P3 sibling "trash".
pub fn group_record() -> ClassificationRecord {
    let member = |name: &str, role, label: Option<&str>| Member {
        display_name: name.to_string(),
        role,
        sibling_label: label.map(str::to_string),
    };
    ClassificationRecord {
        members: HashMap::from([
            ("P1".to_string(), member("Week 07", PlaylistRole::Primary, None)),
            (
                "P2".to_string(),
                member("Rock picks", PlaylistRole::Sibling, Some("rock")),
            ),
            (
                "P3".to_string(),
                member("Archive", PlaylistRole::Sibling, Some("trash")),
            ),
        ]),
    }
}

/// Player state as published after a tick on the primary playlist P1.
pub fn primary_state() -> PlayerState {
    PlayerState {
        track_id: "T1".to_string(),
        track_name: "Song".to_string(),
        artists: HashMap::from([("a1".to_string(), "Artist".to_string())]),
        duration_ms: 300_000,
        album_name: Some("Record".to_string()),
        playlist_id: Some("P1".to_string()),
        playlist_name: Some("Week 07".to_string()),
        is_classified: true,
        is_primary_playlist: true,
        sibling_playlists: HashMap::from([
            ("rock".to_string(), "P2".to_string()),
            ("trash".to_string(), "P3".to_string()),
        ]),
        overflow_playlist_id: Some("P3".to_string()),
    }
}
