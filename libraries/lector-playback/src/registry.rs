//! Global "now playing" arbiter
//!
//! The registry owns the only [`GlobalPlaybackRecord`]. Starting playback of
//! one unit first stops whatever else was playing, so at most one content id
//! is ever marked playing. Pause and stop requests are commands to the
//! owning engine; the record only changes once the owner reports back.

use lector_core::{ContentType, GlobalPlaybackRecord, PersistentStore, UnitId};
use lector_storage::global_record;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Command for the engine that owns the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryCommand {
    Pause { content_id: UnitId },
    Stop { content_id: UnitId },
}

pub type RegistryCommands = mpsc::UnboundedReceiver<RegistryCommand>;

pub struct PlaybackRegistry {
    record: GlobalPlaybackRecord,
    store: Arc<dyn PersistentStore>,
    changes: broadcast::Sender<GlobalPlaybackRecord>,
    commands: mpsc::UnboundedSender<RegistryCommand>,
}

impl PlaybackRegistry {
    /// Registry with an empty record
    pub fn new(store: Arc<dyn PersistentStore>, capacity: usize) -> (Self, RegistryCommands) {
        Self::with_record(store, capacity, GlobalPlaybackRecord::default())
    }

    /// Registry seeded from the persisted record, never playing
    pub async fn restore(store: Arc<dyn PersistentStore>, capacity: usize) -> (Self, RegistryCommands) {
        let record = match global_record::restore(store.as_ref()).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to restore playback record, starting empty");
                GlobalPlaybackRecord::default()
            }
        };
        info!(content_id = ?record.content_id, title = %record.title, "Restored playback record");
        Self::with_record(store, capacity, record)
    }

    fn with_record(
        store: Arc<dyn PersistentStore>,
        capacity: usize,
        record: GlobalPlaybackRecord,
    ) -> (Self, RegistryCommands) {
        let (changes, _) = broadcast::channel(capacity.max(1));
        let (commands, rx) = mpsc::unbounded_channel();
        (
            Self {
                record,
                store,
                changes,
                commands,
            },
            rx,
        )
    }

    /// Receive every record change
    pub fn subscribe(&self) -> broadcast::Receiver<GlobalPlaybackRecord> {
        self.changes.subscribe()
    }

    pub fn snapshot(&self) -> GlobalPlaybackRecord {
        self.record.clone()
    }

    pub fn is_playing_content(&self, id: UnitId) -> bool {
        self.record.is_playing_content(id)
    }

    /// Make `content_id` the playing content
    ///
    /// Returns the id of the content that was playing before, if any.
    pub async fn start_playback(
        &mut self,
        content_id: UnitId,
        title: &str,
        content_type: ContentType,
    ) -> Option<UnitId> {
        if self.record.is_playing_content(content_id)
            && self.record.title == title
            && self.record.content_type == content_type
        {
            return None;
        }

        let displaced = self
            .record
            .content_id
            .filter(|owner| self.record.is_playing && *owner != content_id);
        if let Some(previous) = displaced {
            info!(%previous, next = %content_id, "Displacing playing content");
            self.record.is_playing = false;
            self.commit().await;
        }

        self.record = GlobalPlaybackRecord {
            content_id: Some(content_id),
            title: title.to_string(),
            content_type,
            is_playing: true,
        };
        self.commit().await;
        displaced
    }

    /// Ask the owner to pause; returns false if nothing owns the record
    pub fn request_pause(&self) -> bool {
        self.request(|content_id| RegistryCommand::Pause { content_id })
    }

    /// Ask the owner to stop; returns false if nothing owns the record
    pub fn request_stop(&self) -> bool {
        self.request(|content_id| RegistryCommand::Stop { content_id })
    }

    fn request(&self, command: impl FnOnce(UnitId) -> RegistryCommand) -> bool {
        let Some(content_id) = self.record.content_id else {
            return false;
        };
        let command = command(content_id);
        debug!(?command, "Registry command issued");
        self.commands.send(command).is_ok()
    }

    /// The owner paused `content_id`
    pub async fn apply_paused(&mut self, content_id: UnitId) {
        self.apply_not_playing(content_id, "paused").await;
    }

    /// The owner stopped `content_id`
    pub async fn apply_stopped(&mut self, content_id: UnitId) {
        self.apply_not_playing(content_id, "stopped").await;
    }

    async fn apply_not_playing(&mut self, content_id: UnitId, what: &str) {
        if !self.record.is_playing_content(content_id) {
            debug!(%content_id, what, "Ignoring report for content that is not playing");
            return;
        }
        self.record.is_playing = false;
        self.commit().await;
        debug!(%content_id, what, "Playback record updated");
    }

    /// Persist and broadcast the current record
    ///
    /// Persistence failures are logged only.
    async fn commit(&self) {
        if let Err(e) = global_record::save(self.store.as_ref(), &self.record).await {
            warn!(error = %e, "Failed to persist playback record");
        }
        // No subscribers is fine
        let _ = self.changes.send(self.record.clone());
    }
}
