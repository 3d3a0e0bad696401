//! Shared snapshot of the player state.
//!
//! The tracker is the only writer; the dispatcher and the terminal layer read
//! clones. The state is replaced wholesale under a single write lock, so a
//! reader always sees either the old or the new complete snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::PlayerState;

#[derive(Clone, Default)]
pub struct StateHandle {
    inner: Arc<RwLock<Option<PlayerState>>>,
    rev: Arc<AtomicU64>,
}

impl StateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Option<PlayerState> {
        self.inner.read().await.clone()
    }

    pub async fn publish(&self, state: PlayerState) {
        *self.inner.write().await = Some(state);
        self.rev.fetch_add(1, Ordering::SeqCst);
    }

    /// Clear to "no active playback". Returns whether a state was present.
    pub async fn clear(&self) -> bool {
        let was_present = self.inner.write().await.take().is_some();
        if was_present {
            self.rev.fetch_add(1, Ordering::SeqCst);
        }
        was_present
    }

    /// Count of publishes and effective clears. Lets tests assert that a
    /// repeated remote observation does not re-replace the state.
    pub fn rev(&self) -> u64 {
        self.rev.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn state(track_id: &str) -> PlayerState {
        PlayerState {
            track_id: track_id.to_string(),
            track_name: "Song".into(),
            artists: HashMap::new(),
            duration_ms: 1000,
            album_name: None,
            playlist_id: None,
            playlist_name: None,
            is_classified: false,
            is_primary_playlist: false,
            sibling_playlists: HashMap::new(),
            overflow_playlist_id: None,
        }
    }

    #[tokio::test]
    async fn publish_and_clear_bump_rev() {
        let handle = StateHandle::new();
        assert_eq!(handle.rev(), 0);
        assert!(handle.snapshot().await.is_none());

        handle.publish(state("T1")).await;
        assert_eq!(handle.rev(), 1);
        assert_eq!(handle.snapshot().await.unwrap().track_id, "T1");

        assert!(handle.clear().await);
        assert_eq!(handle.rev(), 2);

        // Clearing an already-empty state is a no-op.
        assert!(!handle.clear().await);
        assert_eq!(handle.rev(), 2);
    }
}
