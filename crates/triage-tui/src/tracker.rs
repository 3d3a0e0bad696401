//! Playback state tracker — the periodic reconciliation loop.
//!
//! Two states: Idle (no `PlayerState`) and Tracking (state held). A fixed
//! interval drives one reconciliation at a time; a transient remote failure
//! is logged, the tick is skipped and the prior state retained. The tracker
//! is the sole writer of the shared [`StateHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use triage_core::cache::LookupCache;
use triage_core::config::CacheConfig;
use triage_core::model::{ClassificationFields, PlaybackSnapshot, PlayerState};
use triage_core::state::StateHandle;

use crate::classify::Classifier;
use crate::spotify::{PlaybackApi, TrackDetail};
use crate::UiMessage;

pub struct Tracker {
    api: Arc<dyn PlaybackApi>,
    classifier: Classifier,
    state: StateHandle,
    tracks: LookupCache<String, TrackDetail>,
    playlist_names: LookupCache<String, String>,
    ui_tx: broadcast::Sender<UiMessage>,
}

impl Tracker {
    pub fn new(
        api: Arc<dyn PlaybackApi>,
        classifier: Classifier,
        state: StateHandle,
        cache: &CacheConfig,
        ui_tx: broadcast::Sender<UiMessage>,
    ) -> Self {
        Self {
            api,
            classifier,
            state,
            tracks: LookupCache::new(cache.track_capacity),
            playlist_names: LookupCache::new(cache.playlist_capacity),
            ui_tx,
        }
    }

    /// Run the polling loop until the process exits. Skipped intervals are
    /// dropped rather than bursted, so at most one tick is ever in flight.
    pub async fn run(self, tick_secs: u64) {
        let mut ticker = tokio::time::interval(Duration::from_secs(tick_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                warn!("tick skipped: {e:#}");
            }
        }
    }

    /// One reconciliation pass against the remote.
    pub async fn tick(&self) -> anyhow::Result<()> {
        let playback = self.api.get_playback().await?;

        let Some(snapshot) = playback else {
            if self.state.clear().await {
                info!("no active playback, player state cleared");
                let _ = self.ui_tx.send(UiMessage::StateUpdated);
            }
            return Ok(());
        };

        let previous = self.state.snapshot().await;
        if previous
            .as_ref()
            .is_some_and(|p| p.track_id == snapshot.track_id)
        {
            return Ok(());
        }

        let next = self.build_state(&snapshot, previous.as_ref()).await?;
        info!(
            track = %next.track_name,
            playlist = next.playlist_name.as_deref().unwrap_or("-"),
            "player state replaced"
        );
        self.state.publish(next).await;
        let _ = self.ui_tx.send(UiMessage::StateUpdated);
        Ok(())
    }

    async fn build_state(
        &self,
        snapshot: &PlaybackSnapshot,
        previous: Option<&PlayerState>,
    ) -> anyhow::Result<PlayerState> {
        let fields = match snapshot.playlist_id.as_deref() {
            Some(playlist_id) => {
                let mut fields = self.classifier.classify(playlist_id, previous).await?;
                if fields.playlist_name.is_none() {
                    fields.playlist_name = self.lookup_playlist_name(playlist_id).await;
                }
                fields
            }
            // Not a playlist context: every playlist-derived field stays empty.
            None => ClassificationFields::default(),
        };

        // Album is display-only enrichment; a failed lookup is not worth
        // skipping the whole tick for.
        let album_name = {
            let api = Arc::clone(&self.api);
            let track_id = snapshot.track_id.clone();
            match self
                .tracks
                .get_or_fetch(snapshot.track_id.clone(), move || async move {
                    api.get_track(&track_id).await.map_err(anyhow::Error::from)
                })
                .await
            {
                Ok(detail) => detail.album_name,
                Err(e) => {
                    debug!("track enrichment failed: {e:#}");
                    None
                }
            }
        };

        Ok(PlayerState {
            track_id: snapshot.track_id.clone(),
            track_name: snapshot.track_name.clone(),
            artists: snapshot.artists.clone(),
            duration_ms: snapshot.duration_ms,
            album_name,
            playlist_id: snapshot.playlist_id.clone(),
            playlist_name: fields.playlist_name,
            is_classified: fields.is_classified,
            is_primary_playlist: fields.is_primary_playlist,
            sibling_playlists: fields.sibling_playlists,
            overflow_playlist_id: fields.overflow_playlist_id,
        })
    }

    async fn lookup_playlist_name(&self, playlist_id: &str) -> Option<String> {
        let api = Arc::clone(&self.api);
        let lookup_id = playlist_id.to_string();
        match self
            .playlist_names
            .get_or_fetch(playlist_id.to_string(), move || async move {
                api.get_playlist_name(&lookup_id)
                    .await
                    .map_err(anyhow::Error::from)
            })
            .await
        {
            Ok(name) => Some(name),
            Err(e) => {
                debug!("playlist name lookup failed: {e:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use triage_core::config::CacheConfig;

    use crate::testutil::{group_record, snapshot, FakeStore, RecordingApi};

    fn tracker(
        api: Arc<RecordingApi>,
        store: Arc<FakeStore>,
    ) -> (Tracker, StateHandle, broadcast::Receiver<UiMessage>) {
        let state = StateHandle::new();
        let (ui_tx, ui_rx) = broadcast::channel(16);
        let classifier = Classifier::new(store, 10, "trash".to_string());
        let tracker = Tracker::new(
            api,
            classifier,
            state.clone(),
            &CacheConfig::default(),
            ui_tx,
        );
        (tracker, state, ui_rx)
    }

    #[tokio::test]
    async fn repeated_track_replaces_state_once() {
        let api = Arc::new(RecordingApi::with_playback(Some(snapshot(
            "T1",
            Some("P1"),
        ))));
        let store = Arc::new(FakeStore::with_record(Some(group_record())));
        let (tracker, state, _ui_rx) = tracker(api, Arc::clone(&store));

        for _ in 0..3 {
            tracker.tick().await.unwrap();
        }

        assert_eq!(state.rev(), 1);
        assert_eq!(store.lookup_count(), 1);
    }

    #[tokio::test]
    async fn classification_fields_flow_into_state() {
        let api = Arc::new(RecordingApi::with_playback(Some(snapshot(
            "T1",
            Some("P1"),
        ))));
        let store = Arc::new(FakeStore::with_record(Some(group_record())));
        let (tracker, state, _ui_rx) = tracker(api, store);

        tracker.tick().await.unwrap();

        let st = state.snapshot().await.unwrap();
        assert!(st.is_classified);
        assert!(st.is_primary_playlist);
        assert_eq!(st.playlist_name.as_deref(), Some("Week 07"));
        assert_eq!(st.sibling_playlists.get("rock").map(String::as_str), Some("P2"));
        assert_eq!(st.overflow_playlist_id.as_deref(), Some("P3"));
        assert_eq!(st.album_name.as_deref(), Some("Record"));
    }

    #[tokio::test]
    async fn unclassified_playlist_gets_name_lookup() {
        let api = Arc::new(RecordingApi::with_playback(Some(snapshot(
            "T1",
            Some("P9"),
        ))));
        let store = Arc::new(FakeStore::with_record(None));
        let (tracker, state, _ui_rx) = tracker(api, store);

        tracker.tick().await.unwrap();

        let st = state.snapshot().await.unwrap();
        assert!(!st.is_classified);
        assert!(!st.is_primary_playlist);
        assert!(st.sibling_playlists.is_empty());
        // Display name still resolved through the remote playlist lookup.
        assert_eq!(st.playlist_name.as_deref(), Some("Some playlist"));
    }

    #[tokio::test]
    async fn non_playlist_context_clears_playlist_fields() {
        let api = Arc::new(RecordingApi::with_playback(Some(snapshot("T1", None))));
        let store = Arc::new(FakeStore::with_record(Some(group_record())));
        let (tracker, state, _ui_rx) = tracker(api, Arc::clone(&store));

        tracker.tick().await.unwrap();

        let st = state.snapshot().await.unwrap();
        assert!(st.playlist_id.is_none());
        assert!(st.playlist_name.is_none());
        assert!(!st.is_classified);
        assert!(st.sibling_playlists.is_empty());
        assert!(st.overflow_playlist_id.is_none());
        assert_eq!(store.lookup_count(), 0);
    }

    #[tokio::test]
    async fn no_playback_clears_state() {
        let api = Arc::new(RecordingApi::with_playback(Some(snapshot(
            "T1",
            Some("P1"),
        ))));
        let store = Arc::new(FakeStore::with_record(Some(group_record())));
        let (tracker, state, _ui_rx) = tracker(Arc::clone(&api), store);

        tracker.tick().await.unwrap();
        assert!(state.snapshot().await.is_some());

        *api.playback.lock().unwrap() = None;
        tracker.tick().await.unwrap();
        assert!(state.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn transient_failure_retains_previous_state() {
        let api = Arc::new(RecordingApi::with_playback(Some(snapshot(
            "T1",
            Some("P1"),
        ))));
        let store = Arc::new(FakeStore::with_record(Some(group_record())));
        let (tracker, state, _ui_rx) = tracker(Arc::clone(&api), store);

        tracker.tick().await.unwrap();
        api.fail_get_playback.store(true, Ordering::SeqCst);

        assert!(tracker.tick().await.is_err());
        assert_eq!(
            state.snapshot().await.map(|s| s.track_id),
            Some("T1".to_string())
        );
    }

    #[tokio::test]
    async fn track_change_within_playlist_reuses_classification() {
        let api = Arc::new(RecordingApi::with_playback(Some(snapshot(
            "T1",
            Some("P1"),
        ))));
        let store = Arc::new(FakeStore::with_record(Some(group_record())));
        let (tracker, state, _ui_rx) = tracker(Arc::clone(&api), Arc::clone(&store));

        tracker.tick().await.unwrap();
        *api.playback.lock().unwrap() = Some(snapshot("T2", Some("P1")));
        tracker.tick().await.unwrap();

        let st = state.snapshot().await.unwrap();
        assert_eq!(st.track_id, "T2");
        assert!(st.is_primary_playlist);
        assert_eq!(state.rev(), 2);
        assert_eq!(store.lookup_count(), 1);
    }
}
