//! Shared data model: playback snapshots, the canonical player state, and
//! playlist classification records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Parsed `get_playback()` payload. `None` at the call site means the remote
/// reports no active playback (or a non-track item such as a podcast).
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub track_id: String,
    pub track_name: String,
    /// artist id → artist name
    pub artists: HashMap<String, String>,
    pub duration_ms: u64,
    pub progress_ms: u64,
    pub is_playing: bool,
    /// Present only when the playback context is a playlist.
    pub playlist_id: Option<String>,
}

/// Role of a playlist within its classification group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistRole {
    Primary,
    Sibling,
}

/// One member of a classification group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub display_name: String,
    pub role: PlaylistRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sibling_label: Option<String>,
}

/// Document-store record grouping one primary playlist with its siblings.
/// At most one member carries the overflow label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub members: HashMap<String, Member>,
}

/// The playlist-derived fields of [`PlayerState`], as produced by the
/// classifier. `Default` is the "unclassified" outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationFields {
    pub playlist_name: Option<String>,
    pub is_classified: bool,
    pub is_primary_playlist: bool,
    /// sibling label → playlist id. Populated only for the primary playlist
    /// of a classified group.
    pub sibling_playlists: HashMap<String, String>,
    pub overflow_playlist_id: Option<String>,
}

impl ClassificationFields {
    /// Derive the fields for `playlist_id` from a record. A record that does
    /// not mention the playlist yields the unclassified default.
    ///
    /// A non-primary playlist never exposes sibling keys, even though the
    /// record defines them: filing only makes sense from the primary.
    pub fn from_record(
        playlist_id: &str,
        record: &ClassificationRecord,
        overflow_label: &str,
    ) -> Self {
        let Some(member) = record.members.get(playlist_id) else {
            return Self::default();
        };

        let is_primary = member.role == PlaylistRole::Primary;
        let sibling_playlists = if is_primary {
            record
                .members
                .iter()
                .filter(|(id, m)| id.as_str() != playlist_id && m.role == PlaylistRole::Sibling)
                .map(|(id, m)| {
                    let label = m
                        .sibling_label
                        .clone()
                        .unwrap_or_else(|| m.display_name.clone());
                    (label, id.clone())
                })
                .collect()
        } else {
            HashMap::new()
        };

        let overflow_playlist_id = record
            .members
            .iter()
            .find(|(_, m)| m.sibling_label.as_deref() == Some(overflow_label))
            .map(|(id, _)| id.clone());

        Self {
            playlist_name: Some(member.display_name.clone()),
            is_classified: true,
            is_primary_playlist: is_primary,
            sibling_playlists,
            overflow_playlist_id,
        }
    }
}

/// Canonical view of "what is currently playing".
///
/// Replaced wholesale by the tracker on each reconciliation; absence of a
/// playing track is represented by the absence of a value, never by a
/// defaulted instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub track_id: String,
    pub track_name: String,
    pub artists: HashMap<String, String>,
    pub duration_ms: u64,
    pub album_name: Option<String>,
    pub playlist_id: Option<String>,
    pub playlist_name: Option<String>,
    pub is_classified: bool,
    pub is_primary_playlist: bool,
    pub sibling_playlists: HashMap<String, String>,
    pub overflow_playlist_id: Option<String>,
}

impl PlayerState {
    /// Copy the playlist-derived fields back out, for reuse while the same
    /// playlist stays current.
    pub fn classification_fields(&self) -> ClassificationFields {
        ClassificationFields {
            playlist_name: self.playlist_name.clone(),
            is_classified: self.is_classified,
            is_primary_playlist: self.is_primary_playlist,
            sibling_playlists: self.sibling_playlists.clone(),
            overflow_playlist_id: self.overflow_playlist_id.clone(),
        }
    }

    /// Artist names joined for display, in a stable order.
    pub fn artist_line(&self) -> String {
        let mut names: Vec<&str> = self.artists.values().map(String::as_str).collect();
        names.sort_unstable();
        names.join(", ")
    }
}
