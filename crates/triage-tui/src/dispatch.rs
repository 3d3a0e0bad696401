//! Command dispatcher — maps keystroke commands to remote mutations.
//!
//! Runs on its own task so a stalled poll tick never blocks keystroke
//! handling. Mutations are fire-and-forget: the status line shows the
//! attempted action and the next tick's reconciliation observes the result.
//! Local state is never rewritten here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use triage_core::command::Command;
use triage_core::config::SeekConfig;
use triage_core::model::PlayerState;
use triage_core::seek;
use triage_core::state::StateHandle;

use crate::spotify::PlaybackApi;
use crate::UiMessage;

pub struct Dispatcher {
    api: Arc<dyn PlaybackApi>,
    state: StateHandle,
    seek: SeekConfig,
    ui_tx: broadcast::Sender<UiMessage>,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn PlaybackApi>,
        state: StateHandle,
        seek: SeekConfig,
        ui_tx: broadcast::Sender<UiMessage>,
    ) -> Self {
        Self {
            api,
            state,
            seek,
            ui_tx,
        }
    }

    /// Consume keystroke commands until the input channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.dispatch(command).await;
        }
    }

    /// Handle one command. Remote failures are confined to the log; the
    /// status line keeps the attempted action label either way.
    pub async fn dispatch(&self, command: Command) {
        if let Err(e) = self.handle(&command).await {
            warn!(?command, "command failed: {e:#}");
        }
    }

    async fn handle(&self, command: &Command) -> anyhow::Result<()> {
        let state = self.state.snapshot().await;
        match command {
            Command::Next => {
                self.status("next");
                self.skip_with_graduation(state.as_ref(), false).await?;
            }
            Command::Previous => {
                self.status("previous");
                if let Err(e) = self.api.skip_previous().await {
                    // The remote rejects this when no previous track exists;
                    // restarting the current one is the expected recovery.
                    debug!("skip_previous rejected ({e}), seeking to start");
                    self.api.seek(0).await?;
                }
            }
            Command::SeekForward => {
                let Some(playback) = self.api.get_playback().await? else {
                    return Ok(());
                };
                self.status(&format!("seek +{}s", self.seek.delta_ms / 1000));
                let target = seek::forward_target_ms(
                    playback.progress_ms,
                    self.seek.delta_ms,
                    playback.duration_ms,
                );
                self.api.seek(target).await?;
            }
            Command::SeekBackward => {
                let Some(playback) = self.api.get_playback().await? else {
                    return Ok(());
                };
                self.status(&format!("seek -{}s", self.seek.delta_ms / 1000));
                let target = seek::backward_target_ms(
                    playback.progress_ms,
                    self.seek.delta_ms,
                    playback.duration_ms,
                );
                self.api.seek(target).await?;
            }
            Command::SeekFraction(n) => {
                // Needs the held duration; without a state this is a no-op.
                let Some(st) = state.as_ref() else {
                    return Ok(());
                };
                self.status(&format!("seek {}/{}", n, self.seek.divisions));
                let target = seek::fraction_target_ms(*n, self.seek.divisions, st.duration_ms);
                self.api.seek(target).await?;
            }
            Command::PauseResume => {
                // Live flag, not the cached tick state: play/pause can flip
                // between ticks.
                let playing = self
                    .api
                    .get_playback()
                    .await?
                    .map(|p| p.is_playing)
                    .unwrap_or(false);
                if playing {
                    self.status("pause");
                    self.api.pause().await?;
                } else {
                    self.status("resume");
                    self.api.resume().await?;
                }
            }
            Command::Like => {
                let Some(st) = state.as_ref() else {
                    return Ok(());
                };
                self.status("liked");
                self.api.save_track(&st.track_id).await?;
            }
            Command::FileToSibling(initial) => {
                let Some(st) = state.as_ref() else {
                    return Ok(());
                };
                let Some((label, sibling_id)) =
                    sibling_for_initial(&st.sibling_playlists, *initial)
                else {
                    return Ok(());
                };
                self.status(&format!("filed to {label}"));
                self.api.add_to_playlist(&sibling_id, &st.track_id).await?;
                self.skip_with_graduation(state.as_ref(), true).await?;
            }
        }
        Ok(())
    }

    /// Skip to the next track, first graduating the current one out of the
    /// primary playlist: copy it to the overflow sibling (unless
    /// `already_filed` — the track just went into a sibling instead), then
    /// remove it from the current playlist. Non-primary playlists, and the
    /// overflow playlist itself, get a plain skip.
    async fn skip_with_graduation(
        &self,
        state: Option<&PlayerState>,
        already_filed: bool,
    ) -> anyhow::Result<()> {
        if let Some(st) = state {
            if st.is_primary_playlist {
                if let Some(playlist_id) = st.playlist_id.as_deref() {
                    let on_overflow = st.overflow_playlist_id.as_deref() == Some(playlist_id);
                    if !on_overflow {
                        match (already_filed, st.overflow_playlist_id.as_deref()) {
                            (false, Some(overflow)) => {
                                self.api.add_to_playlist(overflow, &st.track_id).await?;
                                self.api
                                    .remove_from_playlist(playlist_id, &st.track_id)
                                    .await?;
                            }
                            (true, _) => {
                                self.api
                                    .remove_from_playlist(playlist_id, &st.track_id)
                                    .await?;
                            }
                            // No overflow sibling defined: nowhere to
                            // graduate to, leave the track in place.
                            (false, None) => {}
                        }
                    }
                }
            }
        }
        self.api.skip_next().await?;
        Ok(())
    }

    fn status(&self, label: &str) {
        let _ = self.ui_tx.send(UiMessage::Status(label.to_string()));
    }
}

/// First sibling whose label starts with `initial`. Labels sharing an initial
/// resolve to a deterministic winner (sorted order); the rest are unreachable
/// by keystroke — a known limitation, kept as designed.
fn sibling_for_initial(
    siblings: &HashMap<String, String>,
    initial: char,
) -> Option<(String, String)> {
    let mut labels: Vec<&String> = siblings.keys().collect();
    labels.sort();
    labels
        .into_iter()
        .find(|label| {
            label
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase())
                == Some(initial)
        })
        .map(|label| (label.clone(), siblings[label].clone()))
}
