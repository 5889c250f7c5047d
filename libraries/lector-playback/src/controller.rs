//! Playlist navigation and engine transitions
//!
//! Every transition runs the same sequence:
//! 1. stop the engine for the outgoing unit
//! 2. reset position and resume flags
//! 3. persist the last played unit id
//! 4. load the new unit into the engine
//! 5. start, once the engine reports `Ready` or the settle window elapses
//!
//! Step 5 is deferred: the transition carries a generation and only the
//! newest generation may start.

use crate::playlist::{Direction, Playlist};
use lector_core::{
    ContentStore, LectorError, PlayMode, PlayableUnit, PlaybackState, Result, SpeechEngine, UnitId,
};
use lector_storage::ResumeStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// An accepted transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub generation: u64,
    pub from: Option<UnitId>,
    pub to: UnitId,
    pub index: usize,
    pub start_at: usize,
    /// Engine is loaded and waiting for step 5; false for empty units
    pub awaiting_start: bool,
}

/// Result of a navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Accepted(Transition),
    /// Rejected by the cooldown guard; nothing changed
    Throttled,
    /// Nothing to navigate
    Empty,
}

/// Result of a natural completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Playback moved on according to the play mode
    Continued(Transition),
    /// End of a sequential playlist
    Ended,
    /// The event was for a unit that is no longer loaded
    Ignored,
}

/// Result of a play request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The loaded unit was started
    Resumed(UnitId),
    /// The current unit had to be (re)loaded first
    Loading(Transition),
    Empty,
}

/// Units to use for a source, substituting a placeholder for nothing
pub fn units_or_placeholder(
    units: Vec<PlayableUnit>,
    source_id: Option<lector_core::DocumentId>,
) -> Vec<PlayableUnit> {
    if units.is_empty() {
        vec![PlayableUnit::placeholder(source_id)]
    } else {
        units
    }
}

/// Owns the active playlist and drives the speech engine through it
pub struct PlaylistController {
    playlist: Playlist,
    engine: Arc<dyn SpeechEngine>,
    content: Arc<dyn ContentStore>,
    resume: ResumeStore,
    cooldown: Duration,
    last_transition: Option<Instant>,
    generation: u64,
    pending_start: Option<u64>,
    /// Unit shown or read right now
    active: Option<PlayableUnit>,
    /// Unit currently loaded in the engine
    loaded: Option<UnitId>,
    state: Option<PlaybackState>,
    resuming: bool,
}

impl PlaylistController {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        content: Arc<dyn ContentStore>,
        resume: ResumeStore,
        cooldown: Duration,
        mode: PlayMode,
    ) -> Self {
        Self {
            playlist: Playlist::empty(mode),
            engine,
            content,
            resume,
            cooldown,
            last_transition: None,
            generation: 0,
            pending_start: None,
            active: None,
            loaded: None,
            state: None,
            resuming: false,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Unit shown or read right now
    pub fn active_unit(&self) -> Option<&PlayableUnit> {
        self.active.as_ref()
    }

    pub fn loaded_unit(&self) -> Option<UnitId> {
        self.loaded
    }

    pub fn state(&self) -> Option<&PlaybackState> {
        self.state.as_ref()
    }

    /// True between opening at a saved position and the engine starting
    pub fn is_resuming(&self) -> bool {
        self.resuming
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mode(&self) -> PlayMode {
        self.playlist.mode()
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.playlist.set_mode(mode);
    }

    /// Replace the playlist
    ///
    /// The cursor moves to `displayed` if it is in the list, else to 0.
    /// Fails with `SourceMismatch` if a unit belongs to another source.
    pub fn set_playlist(
        &mut self,
        units: Vec<PlayableUnit>,
        source_id: Option<lector_core::DocumentId>,
        mode: PlayMode,
        displayed: Option<UnitId>,
    ) -> Result<()> {
        let mut playlist = Playlist::new(units, source_id, mode)?;
        if let Some(index) = displayed.and_then(|id| playlist.index_of(id)) {
            playlist.select(index);
        }

        debug!(
            units = playlist.len(),
            source = ?source_id,
            index = playlist.current_index(),
            "Playlist replaced"
        );
        self.playlist = playlist;
        Ok(())
    }

    /// Make `unit` the active unit without loading it
    pub fn show(&mut self, unit: PlayableUnit) {
        if self.loaded != Some(unit.id()) {
            self.active = Some(unit);
        }
    }

    /// Rebuild the playlist from the true source of `unit`
    pub async fn rebuild_for(&mut self, unit: &PlayableUnit) -> Result<()> {
        let units = match unit.source_id() {
            Some(document) => self.content.units_of(document).await?,
            None => vec![unit.clone()],
        };
        let units = units_or_placeholder(units, unit.source_id());

        info!(
            unit_id = %unit.id(),
            source = ?unit.source_id(),
            units = units.len(),
            "Rebuilding playlist from source"
        );
        self.set_playlist(units, unit.source_id(), self.playlist.mode(), Some(unit.id()))
    }

    async fn heal_source(&mut self) -> Result<()> {
        let Some(active) = self.active.clone() else {
            return Ok(());
        };

        let mismatch = active.source_id() != self.playlist.source_id();
        if mismatch || self.playlist.index_of(active.id()).is_none() {
            if mismatch {
                debug!(
                    error = %LectorError::SourceMismatch {
                        expected: self.playlist.source_id(),
                        found: active.source_id(),
                    },
                    "Healing playlist"
                );
            }
            self.rebuild_for(&active).await?;
        }
        Ok(())
    }

    fn is_throttled(&self, now: Instant) -> bool {
        self.last_transition
            .is_some_and(|last| now.saturating_duration_since(last) < self.cooldown)
    }

    /// Manual next/previous
    pub async fn advance(&mut self, direction: Direction, now: Instant) -> Result<AdvanceOutcome> {
        if self.is_throttled(now) {
            debug!(error = %LectorError::DuplicateTransition, ?direction, "Navigation throttled");
            return Ok(AdvanceOutcome::Throttled);
        }

        self.heal_source().await?;
        if self.playlist.is_empty() {
            return Ok(AdvanceOutcome::Empty);
        }

        let Some(index) = self.playlist.step(direction) else {
            return Ok(AdvanceOutcome::Empty);
        };

        self.last_transition = Some(now);
        let transition = self.transition_to(index, 0).await?;
        Ok(AdvanceOutcome::Accepted(transition))
    }

    /// Jump to a specific unit (chapter list)
    pub async fn jump_to(&mut self, unit_id: UnitId, now: Instant) -> Result<AdvanceOutcome> {
        if self.is_throttled(now) {
            debug!(error = %LectorError::DuplicateTransition, %unit_id, "Jump throttled");
            return Ok(AdvanceOutcome::Throttled);
        }

        self.heal_source().await?;
        let index = match self.playlist.index_of(unit_id) {
            Some(index) => index,
            None => {
                let unit = self
                    .content
                    .unit(unit_id)
                    .await?
                    .ok_or(LectorError::ContentMissing(unit_id))?;
                self.rebuild_for(&unit).await?;
                self.playlist
                    .index_of(unit_id)
                    .ok_or(LectorError::ContentMissing(unit_id))?
            }
        };

        self.last_transition = Some(now);
        let transition = self.transition_to(index, 0).await?;
        Ok(AdvanceOutcome::Accepted(transition))
    }

    /// Open the unit at `index` at a char position, bypassing the guard
    pub async fn open(&mut self, index: usize, start_at: usize) -> Result<Transition> {
        self.transition_to(index, start_at).await
    }

    async fn transition_to(&mut self, index: usize, start_at: usize) -> Result<Transition> {
        let unit = self
            .playlist
            .get(index)
            .cloned()
            .ok_or_else(|| LectorError::invalid_input(format!("no unit at index {index}")))?;

        self.generation += 1;
        let generation = self.generation;
        self.pending_start = None;
        let from = self.active.as_ref().map(PlayableUnit::id);

        if let Err(e) = self.save_progress().await {
            warn!(error = %e, "Failed to save progress of outgoing unit");
        }

        // (1) stop the outgoing unit
        if let Err(e) = self.engine.stop().await {
            warn!(error = %e, "Engine failed to stop outgoing unit");
        }
        self.loaded = None;

        // (2) reset position and resume flags
        self.playlist.select(index);
        let mut state = PlaybackState::new(unit.id(), unit.char_len());
        state.set_position(start_at);
        let start_at = state.position_chars();
        self.resuming = start_at > 0;
        self.state = Some(state);
        self.active = Some(unit.clone());

        // (3) persist last played unit
        if let Err(e) = self.resume.set_last_played(unit.id()).await {
            warn!(error = %e, unit_id = %unit.id(), "Failed to persist last played unit");
        }

        let mut transition = Transition {
            generation,
            from,
            to: unit.id(),
            index,
            start_at,
            awaiting_start: false,
        };

        if unit.is_empty() {
            info!(error = %LectorError::EmptyContent(unit.id()), "Nothing to speak");
            return Ok(transition);
        }

        // (4) load
        self.engine.load(&unit, start_at).await?;
        self.loaded = Some(unit.id());

        // (5) deferred start
        self.pending_start = Some(generation);
        transition.awaiting_start = true;

        debug!(
            generation,
            unit_id = %unit.id(),
            index,
            start_at,
            "Transition loaded"
        );
        Ok(transition)
    }

    /// Step 5 of a transition; no-op unless `generation` is still pending
    pub async fn complete_start(&mut self, generation: u64) -> Result<Option<UnitId>> {
        if self.pending_start != Some(generation) {
            debug!(
                generation,
                current = self.generation,
                "Ignoring stale start continuation"
            );
            return Ok(None);
        }

        self.pending_start = None;
        self.engine.start().await?;
        if let Some(state) = self.state.as_mut() {
            state.is_playing = true;
        }
        Ok(self.loaded)
    }

    /// Engine readiness: start immediately instead of waiting for the
    /// settle window
    pub async fn on_ready(&mut self, unit_id: UnitId) -> Result<Option<UnitId>> {
        match self.pending_start {
            Some(generation) if self.loaded == Some(unit_id) => {
                self.complete_start(generation).await
            }
            _ => Ok(None),
        }
    }

    /// Cursor moved; returns false if the event is for another unit
    pub fn on_boundary(&mut self, unit_id: UnitId, position: usize) -> bool {
        match self.state.as_mut() {
            Some(state) if state.unit_id() == unit_id && self.loaded == Some(unit_id) => {
                state.set_position(position);
                true
            }
            _ => false,
        }
    }

    /// Engine reported a play-state change for `unit_id`
    pub fn on_engine_playing(&mut self, unit_id: UnitId, playing: bool) -> bool {
        if self.loaded != Some(unit_id) {
            return false;
        }
        if let Some(state) = self.state.as_mut() {
            state.is_playing = playing;
        }
        if playing {
            self.resuming = false;
        }
        true
    }

    /// Natural completion of the loaded unit
    ///
    /// Bypasses the cooldown guard but still starts a new generation.
    pub async fn on_unit_finished(&mut self, unit_id: UnitId) -> Result<FinishOutcome> {
        if self.loaded != Some(unit_id) {
            debug!(%unit_id, "Ignoring completion of unit that is not loaded");
            return Ok(FinishOutcome::Ignored);
        }

        self.pending_start = None;
        self.loaded = None;
        if let Some(state) = self.state.as_mut() {
            state.mark_completed();
        }
        self.record_completion(unit_id).await;

        match self.playlist.after_finish() {
            Some(index) => {
                let transition = self.transition_to(index, 0).await?;
                Ok(FinishOutcome::Continued(transition))
            }
            None => {
                info!(%unit_id, "Reached end of playlist");
                Ok(FinishOutcome::Ended)
            }
        }
    }

    async fn record_completion(&self, unit_id: UnitId) {
        if let Err(e) = self.resume.clear(unit_id).await {
            warn!(error = %e, %unit_id, "Failed to clear resume record");
        }

        let Some(document) = self.playlist.source_id() else {
            return;
        };
        let index = self.playlist.current_index();
        let end = self.playlist.get(index).map_or(0, PlayableUnit::char_len);
        let progress = ResumeStore::overall_progress(self.playlist.units(), index, end);
        if let Err(e) = self.resume.save_document_progress(document, progress).await {
            warn!(error = %e, %document, "Failed to save document progress");
        }
    }

    /// Start (or restart) reading the current unit
    pub async fn play(&mut self) -> Result<PlayOutcome> {
        if let Some(unit_id) = self.loaded {
            if self.pending_start.is_none() {
                self.engine.start().await?;
                if let Some(state) = self.state.as_mut() {
                    state.is_playing = true;
                }
            }
            return Ok(PlayOutcome::Resumed(unit_id));
        }

        self.heal_source().await?;
        if self.playlist.is_empty() {
            return Ok(PlayOutcome::Empty);
        }

        // Pick up where a stopped unit left off
        let index = self.playlist.current_index();
        let current_id = self.playlist.get(index).map(PlayableUnit::id);
        let start_at = self
            .state
            .as_ref()
            .filter(|s| !s.is_completed() && current_id == Some(s.unit_id()))
            .map_or(0, PlaybackState::position_chars);
        let transition = self.transition_to(index, start_at).await?;
        Ok(PlayOutcome::Loading(transition))
    }

    /// Pause the loaded unit, cancelling a pending start
    pub async fn pause(&mut self) -> Result<Option<UnitId>> {
        let Some(unit_id) = self.loaded else {
            return Ok(None);
        };

        self.pending_start = None;
        self.engine.pause().await?;
        if let Some(state) = self.state.as_mut() {
            state.is_playing = false;
        }
        Ok(Some(unit_id))
    }

    /// Stop and unload, keeping the position for a later `play`
    pub async fn stop(&mut self) -> Result<Option<UnitId>> {
        let unit_id = self.loaded.take();
        self.pending_start = None;
        self.engine.stop().await?;
        if let Some(state) = self.state.as_mut() {
            state.is_playing = false;
        }
        Ok(unit_id)
    }

    /// Persist the position inside the active unit
    ///
    /// Nothing is written at position 0 or after completion.
    pub async fn save_progress(&self) -> Result<()> {
        let (Some(unit), Some(state)) = (&self.active, &self.state) else {
            return Ok(());
        };
        if state.unit_id() != unit.id() || state.is_completed() || state.position_chars() == 0 {
            return Ok(());
        }

        let index = self.playlist.index_of(unit.id()).unwrap_or(0);
        self.resume
            .save(
                unit,
                index,
                state.position_chars(),
                state.progress_fraction(),
            )
            .await?;

        if let Some(document) = unit.source_id() {
            if self.playlist.source_id() == Some(document) {
                let progress =
                    ResumeStore::overall_progress(self.playlist.units(), index, state.position_chars());
                self.resume.save_document_progress(document, progress).await?;
            }
        }
        Ok(())
    }
}
