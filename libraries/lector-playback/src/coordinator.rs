//! Playback coordinator actor
//!
//! One task owns the controller, the registry, the reconciler and every
//! view's state. Everything else talks to it through a cloneable
//! [`CoordinatorHandle`]. Slow work (content lookups, resume resolution)
//! runs on spawned tasks that post their results back to the mailbox, and
//! timers post generation-tagged continuations the same way.

use crate::coalesce::{RequestCoalescer, Ticket};
use crate::config::PlaybackConfig;
use crate::controller::{
    units_or_placeholder, AdvanceOutcome, FinishOutcome, PlayOutcome, PlaylistController,
    Transition,
};
use crate::display::{estimate_ms, DisplayState};
use crate::events::{AppEvent, CoordinatorEvent, EventBus, UserError, ViewId};
use crate::language::{detect_language, LanguageGuard};
use crate::playlist::Direction;
use crate::position::{DisplayTarget, PositionTracker};
use crate::reconciler::{SyncReconciler, ViewState};
use crate::registry::{PlaybackRegistry, RegistryCommand, RegistryCommands};
use lector_core::{
    ContentStore, ContentType, DocumentId, EngineEvent, EngineEventStream, GlobalPlaybackRecord,
    LectorError, PersistentStore, PlayMode, PlayableUnit, Result, SpeechEngine, UnitId,
};
use lector_storage::{ResumeStore, ResumeTarget};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const COMMAND_CAPACITY: usize = 64;

/// External systems the coordinator drives
pub struct Collaborators {
    pub engine: Arc<dyn SpeechEngine>,
    pub engine_events: EngineEventStream,
    pub content: Arc<dyn ContentStore>,
    pub store: Arc<dyn PersistentStore>,
}

/// Result of an open request
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    /// The unit is loaded (or was already playing) and shown
    Opened(DisplayState),
    /// An open for the same unit is still running; this one was dropped
    InFlight,
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Open {
        unit_id: UnitId,
        force: bool,
        reply: Option<Reply<Result<OpenOutcome>>>,
    },
    OpenDocument {
        document: DocumentId,
        from_start: bool,
        force: bool,
        reply: Reply<Result<OpenOutcome>>,
    },
    Play(Reply<Result<()>>),
    Pause(Reply<Result<()>>),
    Stop(Reply<Result<()>>),
    Navigate(Direction, Reply<Result<AdvanceOutcome>>),
    JumpTo(UnitId, Reply<Result<AdvanceOutcome>>),
    SetMode(PlayMode, Reply<()>),
    SaveProgress(Reply<Result<()>>),
    Reconcile(Reply<()>),
    ForceRefresh(Reply<DisplayState>),
    Display(Reply<DisplayState>),
    GlobalRecord(Reply<GlobalPlaybackRecord>),
    App(AppEvent),
    Shutdown(Reply<()>),
}

enum OpenRequest {
    Unit(UnitId),
    Document { document: DocumentId, from_start: bool },
}

/// Everything needed to open a unit, resolved off the actor
struct Prepared {
    unit: PlayableUnit,
    units: Vec<PlayableUnit>,
    start_at: usize,
}

enum Internal {
    SettleElapsed {
        generation: u64,
    },
    Prepared {
        ticket: Option<Ticket>,
        force: bool,
        result: Result<Prepared>,
        reply: Option<Reply<Result<OpenOutcome>>>,
    },
}

/// Cloneable handle to a running coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    events: EventBus<CoordinatorEvent>,
}

impl CoordinatorHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LectorError::CoordinatorClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| LectorError::CoordinatorClosed)
    }

    /// Feed a UI or lifecycle event
    pub async fn dispatch(&self, event: AppEvent) -> Result<()> {
        self.send(Command::App(event)).await
    }

    /// Open a unit at its resume point and start reading
    ///
    /// # Errors
    /// `ContentMissing` if the unit does not exist, `LanguageMismatch` if the
    /// voice cannot read it (retry with [`Self::open_anyway`])
    pub async fn open(&self, unit_id: UnitId) -> Result<OpenOutcome> {
        self.request(|reply| Command::Open {
            unit_id,
            force: false,
            reply: Some(reply),
        })
        .await?
    }

    /// Open a unit skipping the language check
    pub async fn open_anyway(&self, unit_id: UnitId) -> Result<OpenOutcome> {
        self.request(|reply| Command::Open {
            unit_id,
            force: true,
            reply: Some(reply),
        })
        .await?
    }

    /// Open a document at its last chapter, or at its first with `from_start`
    pub async fn open_document(&self, document: DocumentId, from_start: bool) -> Result<OpenOutcome> {
        self.request(|reply| Command::OpenDocument {
            document,
            from_start,
            force: false,
            reply,
        })
        .await?
    }

    /// [`Self::open_document`] skipping the language check
    pub async fn open_document_anyway(
        &self,
        document: DocumentId,
        from_start: bool,
    ) -> Result<OpenOutcome> {
        self.request(|reply| Command::OpenDocument {
            document,
            from_start,
            force: true,
            reply,
        })
        .await?
    }

    pub async fn play(&self) -> Result<()> {
        self.request(Command::Play).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(Command::Pause).await?
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await?
    }

    pub async fn next(&self) -> Result<AdvanceOutcome> {
        self.request(|reply| Command::Navigate(Direction::Next, reply))
            .await?
    }

    pub async fn previous(&self) -> Result<AdvanceOutcome> {
        self.request(|reply| Command::Navigate(Direction::Previous, reply))
            .await?
    }

    pub async fn jump_to(&self, unit_id: UnitId) -> Result<AdvanceOutcome> {
        self.request(|reply| Command::JumpTo(unit_id, reply)).await?
    }

    pub async fn set_mode(&self, mode: PlayMode) -> Result<()> {
        self.request(|reply| Command::SetMode(mode, reply)).await
    }

    pub async fn save_progress(&self) -> Result<()> {
        self.request(Command::SaveProgress).await?
    }

    /// Run one reconciliation pass over every open view now
    pub async fn reconcile(&self) -> Result<()> {
        self.request(Command::Reconcile).await
    }

    /// Republish the display state immediately
    pub async fn force_refresh(&self) -> Result<DisplayState> {
        self.request(Command::ForceRefresh).await
    }

    pub async fn display(&self) -> Result<DisplayState> {
        self.request(Command::Display).await
    }

    pub async fn global_record(&self) -> Result<GlobalPlaybackRecord> {
        self.request(Command::GlobalRecord).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Save progress, stop the engine and end the actor
    pub async fn shutdown(&self) -> Result<()> {
        self.request(Command::Shutdown).await
    }
}

/// The actor; build with [`PlaybackCoordinator::new`], run with
/// [`PlaybackCoordinator::spawn`]
pub struct PlaybackCoordinator {
    config: PlaybackConfig,
    engine: Arc<dyn SpeechEngine>,
    content: Arc<dyn ContentStore>,
    resume: ResumeStore,
    controller: PlaylistController,
    registry: PlaybackRegistry,
    registry_commands: RegistryCommands,
    reconciler: SyncReconciler,
    tracker: PositionTracker,
    language: LanguageGuard,
    coalescer: RequestCoalescer,
    views: HashMap<ViewId, ViewState>,
    target: DisplayTarget,
    events: EventBus<CoordinatorEvent>,
    engine_events: EngineEventStream,
    app_events: Option<broadcast::Receiver<AppEvent>>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl PlaybackCoordinator {
    /// Build a coordinator, restoring the persisted global record
    ///
    /// # Errors
    /// Returns an error if `config` is invalid
    pub async fn new(config: PlaybackConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let Collaborators {
            engine,
            engine_events,
            content,
            store,
        } = collaborators;

        let resume = ResumeStore::new(Arc::clone(&store));
        let (registry, registry_commands) =
            PlaybackRegistry::restore(store, config.event_capacity).await;
        let controller = PlaylistController::new(
            Arc::clone(&engine),
            Arc::clone(&content),
            resume.clone(),
            config.transition_cooldown(),
            config.default_mode,
        );
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        Ok(Self {
            tracker: PositionTracker::new(config.tracker.clone()),
            language: LanguageGuard::new(&config.language_pairs),
            events: EventBus::new(config.event_capacity),
            config,
            engine,
            content,
            resume,
            controller,
            registry,
            registry_commands,
            reconciler: SyncReconciler::new(),
            coalescer: RequestCoalescer::new(),
            views: HashMap::new(),
            target: DisplayTarget::default(),
            engine_events,
            app_events: None,
            internal_tx,
            internal_rx,
        })
    }

    /// Also consume events published on an application bus
    #[must_use]
    pub fn with_app_events(mut self, events: broadcast::Receiver<AppEvent>) -> Self {
        self.app_events = Some(events);
        self
    }

    /// Start the actor task
    pub fn spawn(self) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = CoordinatorHandle {
            commands: tx,
            events: self.events.clone(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let period = self.config.reconcile_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut registry_changes = self.registry.subscribe();
        let mut engine_open = true;

        info!("Playback coordinator started");

        let mut shutdown_reply = None;
        loop {
            tokio::select! {
                biased;

                Some(internal) = self.internal_rx.recv() => {
                    self.handle_internal(internal).await;
                }
                event = self.engine_events.recv(), if engine_open => {
                    match event {
                        Some(event) => self.handle_engine_event(event).await,
                        None => {
                            warn!("Speech engine event stream closed");
                            engine_open = false;
                        }
                    }
                }
                Ok(record) = registry_changes.recv() => {
                    self.events.emit(CoordinatorEvent::Registry(record));
                }
                event = next_app_event(&mut self.app_events) => {
                    match event {
                        Some(event) => self.handle_app_event(event).await,
                        None => self.app_events = None,
                    }
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if let Some(reply) = self.handle_command(command).await {
                        shutdown_reply = Some(reply);
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.reconcile_views().await;
                }
            }
        }

        self.shutdown().await;
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
        info!("Playback coordinator stopped");
    }

    /// Returns the reply of a shutdown request, which ends the actor
    async fn handle_command(&mut self, command: Command) -> Option<Reply<()>> {
        match command {
            Command::Open {
                unit_id,
                force,
                reply,
            } => self.begin_open(unit_id, force, reply),
            Command::OpenDocument {
                document,
                from_start,
                force,
                reply,
            } => {
                self.spawn_prepare(
                    OpenRequest::Document {
                        document,
                        from_start,
                    },
                    None,
                    force,
                    Some(reply),
                );
            }
            Command::Play(reply) => {
                let result = self.play().await;
                self.respond(reply, result);
            }
            Command::Pause(reply) => {
                let result = self.pause().await;
                self.respond(reply, result);
            }
            Command::Stop(reply) => {
                let result = self.stop().await;
                self.respond(reply, result);
            }
            Command::Navigate(direction, reply) => {
                let result = self.navigate(direction).await;
                self.respond(reply, result);
            }
            Command::JumpTo(unit_id, reply) => {
                let result = self.jump_to(unit_id).await;
                self.respond(reply, result);
            }
            Command::SetMode(mode, reply) => {
                info!(?mode, "Play mode changed");
                self.controller.set_mode(mode);
                let _ = reply.send(());
            }
            Command::SaveProgress(reply) => {
                let result = self.controller.save_progress().await;
                self.respond(reply, result);
            }
            Command::Reconcile(reply) => {
                self.reconcile_views().await;
                let _ = reply.send(());
            }
            Command::ForceRefresh(reply) => {
                let _ = reply.send(self.publish_display());
            }
            Command::Display(reply) => {
                let _ = reply.send(self.display_state());
            }
            Command::GlobalRecord(reply) => {
                let _ = reply.send(self.registry.snapshot());
            }
            Command::App(event) => self.handle_app_event(event).await,
            Command::Shutdown(reply) => return Some(reply),
        }
        None
    }

    /// Send a reply, reporting user-facing errors on the event bus too
    fn respond<T>(&self, reply: Reply<Result<T>>, result: Result<T>) {
        if let Err(e) = &result {
            self.report(e);
        }
        let _ = reply.send(result);
    }

    fn report(&self, err: &LectorError) {
        match UserError::from_error(err) {
            Some(user_error) => {
                info!(error = %err, "Reporting error to user");
                self.events.emit(CoordinatorEvent::Error(user_error));
            }
            None => warn!(error = %err, "Playback operation failed"),
        }
    }

    // ===== Opening =====

    fn begin_open(&mut self, unit_id: UnitId, force: bool, reply: Option<Reply<Result<OpenOutcome>>>) {
        if self.controller.loaded_unit() == Some(unit_id) {
            debug!(%unit_id, "Unit already loaded, showing it");
            let display = self.publish_display();
            if let Some(reply) = reply {
                let _ = reply.send(Ok(OpenOutcome::Opened(display)));
            }
            return;
        }

        let Some(ticket) = self.coalescer.try_begin(unit_id) else {
            if let Some(reply) = reply {
                let _ = reply.send(Ok(OpenOutcome::InFlight));
            }
            return;
        };
        self.spawn_prepare(OpenRequest::Unit(unit_id), Some(ticket), force, reply);
    }

    fn spawn_prepare(
        &self,
        request: OpenRequest,
        ticket: Option<Ticket>,
        force: bool,
        reply: Option<Reply<Result<OpenOutcome>>>,
    ) {
        let content = Arc::clone(&self.content);
        let resume = self.resume.clone();
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let result = prepare(content.as_ref(), &resume, request).await;
            let _ = tx.send(Internal::Prepared {
                ticket,
                force,
                result,
                reply,
            });
        });
    }

    async fn finish_open(&mut self, force: bool, result: Result<Prepared>) -> Result<OpenOutcome> {
        let Prepared {
            unit,
            units,
            start_at,
        } = result?;

        if !force {
            self.check_language(&unit)?;
        }

        self.controller
            .set_playlist(units, unit.source_id(), self.controller.mode(), Some(unit.id()))?;
        let index = self
            .controller
            .playlist()
            .index_of(unit.id())
            .ok_or(LectorError::ContentMissing(unit.id()))?;

        info!(unit_id = %unit.id(), title = %unit.title(), start_at, "Opening unit");
        let transition = self.controller.open(index, start_at).await?;
        self.on_transition(transition).await;
        Ok(OpenOutcome::Opened(self.display_state()))
    }

    fn check_language(&self, unit: &PlayableUnit) -> Result<()> {
        let Some(voice) = self.engine.voice_language() else {
            return Ok(());
        };
        let Some(content) = detect_language(unit.text()) else {
            return Ok(());
        };
        self.language.check(&voice, content)
    }

    // ===== Transport =====

    async fn play(&mut self) -> Result<()> {
        match self.controller.play().await? {
            PlayOutcome::Resumed(unit_id) => {
                if self.controller.state().is_some_and(|s| s.is_playing) {
                    self.on_started(unit_id).await;
                }
            }
            PlayOutcome::Loading(transition) => self.on_transition(transition).await,
            PlayOutcome::Empty => debug!("Nothing to play"),
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.save_progress().await;

        let loaded = self.controller.loaded_unit();
        if loaded.is_some()
            && loaded == self.registry.snapshot().content_id
            && self.registry.request_pause()
        {
            self.drain_registry_commands().await;
        } else if let Some(unit_id) = self.controller.pause().await? {
            self.registry.apply_paused(unit_id).await;
        }

        self.publish_display();
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.save_progress().await;
        if let Some(unit_id) = self.controller.stop().await? {
            self.registry.apply_stopped(unit_id).await;
        }
        self.publish_display();
        Ok(())
    }

    async fn navigate(&mut self, direction: Direction) -> Result<AdvanceOutcome> {
        let outcome = self.controller.advance(direction, Instant::now()).await?;
        if let AdvanceOutcome::Accepted(transition) = &outcome {
            self.on_transition(transition.clone()).await;
        }
        Ok(outcome)
    }

    async fn jump_to(&mut self, unit_id: UnitId) -> Result<AdvanceOutcome> {
        let outcome = self.controller.jump_to(unit_id, Instant::now()).await?;
        if let AdvanceOutcome::Accepted(transition) = &outcome {
            self.on_transition(transition.clone()).await;
        }
        Ok(outcome)
    }

    async fn save_progress(&self) {
        if let Err(e) = self.controller.save_progress().await {
            warn!(error = %e, "Failed to save progress");
        }
    }

    // ===== Transitions =====

    async fn on_transition(&mut self, transition: Transition) {
        if let Some(from) = transition.from {
            self.registry.apply_stopped(from).await;
        }
        self.target = DisplayTarget::default();

        if transition.awaiting_start {
            let generation = transition.generation;
            let window = self.config.settle_window();
            let tx = self.internal_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(window).await;
                let _ = tx.send(Internal::SettleElapsed { generation });
            });
        }

        self.events.emit(CoordinatorEvent::Transitioned(transition));
        self.publish_display();
    }

    async fn complete_start(&mut self, generation: u64) {
        match self.controller.complete_start(generation).await {
            Ok(Some(unit_id)) => self.on_started(unit_id).await,
            Ok(None) => {}
            Err(e) => self.report(&e),
        }
    }

    async fn on_started(&mut self, unit_id: UnitId) {
        let Some(unit) = self.controller.active_unit().filter(|u| u.id() == unit_id) else {
            return;
        };
        let title = unit.title().to_string();
        let content_type = content_type_of(unit);

        if let Some(previous) = self
            .registry
            .start_playback(unit_id, &title, content_type)
            .await
        {
            debug!(%previous, "Took over playback");
        }
        self.drain_registry_commands().await;
        self.publish_display();
    }

    /// Apply pause/stop commands the registry issued to this engine
    async fn drain_registry_commands(&mut self) {
        while let Ok(command) = self.registry_commands.try_recv() {
            let loaded = self.controller.loaded_unit();
            match command {
                RegistryCommand::Pause { content_id } => {
                    if loaded == Some(content_id) {
                        if let Err(e) = self.controller.pause().await {
                            warn!(error = %e, %content_id, "Engine failed to pause");
                            continue;
                        }
                    }
                    self.registry.apply_paused(content_id).await;
                }
                RegistryCommand::Stop { content_id } => {
                    if loaded == Some(content_id) {
                        self.save_progress().await;
                        if let Err(e) = self.controller.stop().await {
                            warn!(error = %e, %content_id, "Engine failed to stop");
                            continue;
                        }
                    }
                    self.registry.apply_stopped(content_id).await;
                }
            }
        }
    }

    // ===== Mailbox =====

    async fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::SettleElapsed { generation } => self.complete_start(generation).await,
            Internal::Prepared {
                ticket,
                force,
                result,
                reply,
            } => {
                if let Some(ticket) = ticket {
                    self.coalescer.finish(ticket);
                }
                let outcome = self.finish_open(force, result).await;
                match reply {
                    Some(reply) => self.respond(reply, outcome),
                    None => {
                        if let Err(e) = outcome {
                            self.report(&e);
                        }
                    }
                }
            }
        }
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Ready { unit_id } => match self.controller.on_ready(unit_id).await {
                Ok(Some(unit_id)) => self.on_started(unit_id).await,
                Ok(None) => {}
                Err(e) => self.report(&e),
            },
            EngineEvent::Started { unit_id } => {
                if self.controller.on_engine_playing(unit_id, true) {
                    self.on_started(unit_id).await;
                    self.reconcile_views().await;
                }
            }
            EngineEvent::Paused { unit_id } => {
                if self.controller.on_engine_playing(unit_id, false) {
                    self.save_progress().await;
                    self.registry.apply_paused(unit_id).await;
                    self.reconcile_views().await;
                    self.publish_display();
                }
            }
            EngineEvent::Stopped { unit_id } => {
                if self.controller.on_engine_playing(unit_id, false) {
                    self.registry.apply_stopped(unit_id).await;
                    self.reconcile_views().await;
                    self.publish_display();
                }
            }
            EngineEvent::Boundary { unit_id, range } => {
                if !self.controller.on_boundary(unit_id, range.start) {
                    return;
                }
                if let Some(unit) = self.controller.active_unit() {
                    self.target =
                        self.tracker
                            .display_target(range, unit.text(), self.target.scroll_to);
                }
                self.publish_display();
            }
            EngineEvent::Finished { unit_id } => self.on_finished(unit_id).await,
            EngineEvent::Failed { unit_id, message } => {
                error!(%unit_id, %message, "Speech engine failed");
                if self.controller.on_engine_playing(unit_id, false) {
                    self.save_progress().await;
                    self.registry.apply_stopped(unit_id).await;
                    self.publish_display();
                }
            }
        }
    }

    async fn on_finished(&mut self, unit_id: UnitId) {
        match self.controller.on_unit_finished(unit_id).await {
            Ok(FinishOutcome::Continued(transition)) => {
                self.events.emit(CoordinatorEvent::Finished { unit_id });
                self.on_transition(transition).await;
            }
            Ok(FinishOutcome::Ended) => {
                self.events.emit(CoordinatorEvent::Finished { unit_id });
                self.registry.apply_stopped(unit_id).await;
                self.events.emit(CoordinatorEvent::PlaylistEnded);
                self.reconcile_views().await;
                self.publish_display();
            }
            Ok(FinishOutcome::Ignored) => {}
            Err(e) => self.report(&e),
        }
    }

    async fn handle_app_event(&mut self, event: AppEvent) {
        debug!(?event, "App event");
        match event {
            AppEvent::EnterPlaybackView { view, unit_id } => {
                let local_playing = self.registry.is_playing_content(unit_id);
                let (title, content_type) = match self.controller.active_unit() {
                    Some(unit) if unit.id() == unit_id => {
                        (unit.title().to_string(), content_type_of(unit))
                    }
                    _ => (String::new(), ContentType::None),
                };
                self.views.insert(
                    view,
                    ViewState {
                        unit_id,
                        title,
                        content_type,
                        local_playing,
                    },
                );
                self.begin_open(unit_id, false, None);
            }
            AppEvent::ExitPlaybackView { view } => {
                self.save_progress().await;
                if self.views.remove(&view).is_none() {
                    debug!(%view, "Exit for unknown view");
                }
            }
            AppEvent::PlayNext => self.navigate_reported(Direction::Next).await,
            AppEvent::PlayPrevious => self.navigate_reported(Direction::Previous).await,
            AppEvent::SaveProgress | AppEvent::AppBackground => self.save_progress().await,
            AppEvent::OpenById { unit_id } => self.begin_open(unit_id, false, None),
            AppEvent::AppForeground => {
                self.reconcile_views().await;
                self.publish_display();
            }
        }
    }

    async fn navigate_reported(&mut self, direction: Direction) {
        if let Err(e) = self.navigate(direction).await {
            self.report(&e);
        }
    }

    // ===== Reconciliation =====

    async fn reconcile_views(&mut self) {
        if self.views.is_empty() {
            return;
        }

        let speaking = self.engine.is_speaking();
        let loaded = self.controller.loaded_unit();
        let active = self.controller.active_unit().cloned();

        for view in self.views.values_mut() {
            // Views opened before their unit loaded learn its title here
            if let Some(unit) = active.as_ref().filter(|u| u.id() == view.unit_id) {
                if view.title.is_empty() {
                    view.title = unit.title().to_string();
                    view.content_type = content_type_of(unit);
                }
            }
            let engine_playing = speaking && loaded == Some(view.unit_id);
            self.reconciler
                .reconcile(view, engine_playing, &mut self.registry)
                .await;
        }
        self.drain_registry_commands().await;
    }

    // ===== Display =====

    fn display_state(&self) -> DisplayState {
        let playlist = self.controller.playlist();
        let mut display = DisplayState {
            is_resuming: self.controller.is_resuming(),
            playlist: playlist.ids(),
            current_index: (!playlist.is_empty()).then(|| playlist.current_index()),
            ..DisplayState::default()
        };

        let Some(unit) = self.controller.active_unit() else {
            return display;
        };
        let cps = self.config.chars_per_second;
        display.unit_id = Some(unit.id());
        display.title = unit.title().to_string();
        display.total_time_ms = estimate_ms(unit.char_len(), cps);

        if let Some(state) = self.controller.state().filter(|s| s.unit_id() == unit.id()) {
            display.position_chars = state.position_chars();
            display.progress_fraction = state.progress_fraction();
            display.current_time_ms = estimate_ms(state.position_chars(), cps);
            display.is_playing = state.is_playing;
        }

        if display.is_resuming && self.target.scroll_to.is_none() {
            let scroll_to = self
                .tracker
                .paragraph_for_resume_position(display.position_chars, unit.text());
            display.with_target(DisplayTarget {
                highlighted: Vec::new(),
                scroll_to,
            })
        } else {
            display.with_target(self.target.clone())
        }
    }

    fn publish_display(&self) -> DisplayState {
        let display = self.display_state();
        self.events.emit(CoordinatorEvent::Display(display.clone()));
        display
    }

    async fn shutdown(&mut self) {
        self.save_progress().await;
        match self.controller.stop().await {
            Ok(Some(unit_id)) => self.registry.apply_stopped(unit_id).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Engine failed to stop during shutdown"),
        }
    }
}

fn content_type_of(unit: &PlayableUnit) -> ContentType {
    if unit.source_id().is_some() {
        ContentType::Document
    } else {
        ContentType::Article
    }
}

/// Next event from an optional app bus; pends forever without one
async fn next_app_event(events: &mut Option<broadcast::Receiver<AppEvent>>) -> Option<AppEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "App event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Resolve what an open request loads and where it starts
async fn prepare(
    content: &dyn ContentStore,
    resume: &ResumeStore,
    request: OpenRequest,
) -> Result<Prepared> {
    match request {
        OpenRequest::Unit(unit_id) => {
            let unit = content
                .unit(unit_id)
                .await?
                .ok_or(LectorError::ContentMissing(unit_id))?;

            let (units, progress) = match unit.source_id() {
                Some(document) => (
                    content.units_of(document).await?,
                    or_fresh_start(resume.document_progress(document).await, "document progress"),
                ),
                None => (vec![unit.clone()], None),
            };
            let units = units_or_placeholder(units, unit.source_id());

            // Overall progress only counts when it lands in this unit
            let start_at = or_fresh_start(
                resume.resume_point(&unit, progress, &units).await,
                "resume point",
            )
            .filter(|target| target.unit_id == unit_id)
            .map_or(0, |target| target.position_chars);

            Ok(Prepared {
                unit,
                units,
                start_at,
            })
        }
        OpenRequest::Document {
            document,
            from_start,
        } => {
            let units = units_or_placeholder(content.units_of(document).await?, Some(document));
            let target = if from_start {
                None
            } else {
                or_fresh_start(
                    resume.resume_document(document, &units).await,
                    "document resume point",
                )
            };

            let (unit, start_at) = match target.and_then(|t| resolve_target(&units, &t)) {
                Some(found) => found,
                None => (units[0].clone(), 0),
            };
            Ok(Prepared {
                unit,
                units,
                start_at,
            })
        }
    }
}

/// Resume lookups never block an open; a failed read starts from the top
fn or_fresh_start<T>(result: Result<Option<T>>, what: &str) -> Option<T> {
    result.unwrap_or_else(|e| {
        warn!(error = %e, what, "Failed to read resume state, starting fresh");
        None
    })
}

fn resolve_target(units: &[PlayableUnit], target: &ResumeTarget) -> Option<(PlayableUnit, usize)> {
    units
        .iter()
        .find(|unit| unit.id() == target.unit_id)
        .map(|unit| (unit.clone(), target.position_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lector_storage::MemoryContentStore;

    struct UnreadableStore;

    #[async_trait]
    impl PersistentStore for UnreadableStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(LectorError::persistence("disk gone"))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(LectorError::persistence("disk gone"))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(LectorError::persistence("disk gone"))
        }
    }

    #[test]
    fn test_content_type_follows_source() {
        let document = DocumentId::generate();
        assert_eq!(
            content_type_of(&PlayableUnit::with_source(document, "C1", "text")),
            ContentType::Document
        );
        assert_eq!(
            content_type_of(&PlayableUnit::new("Article", "text")),
            ContentType::Article
        );
    }

    #[tokio::test]
    async fn test_prepare_missing_unit() {
        let content = MemoryContentStore::new();
        let resume = ResumeStore::new(Arc::new(lector_storage::MemoryStore::new()));
        let missing = UnitId::generate();

        let result = prepare(&content, &resume, OpenRequest::Unit(missing)).await;

        assert!(matches!(result, Err(LectorError::ContentMissing(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_prepare_empty_document_yields_placeholder() {
        let content = MemoryContentStore::new();
        let resume = ResumeStore::new(Arc::new(lector_storage::MemoryStore::new()));
        let document = DocumentId::generate();

        let prepared = prepare(
            &content,
            &resume,
            OpenRequest::Document {
                document,
                from_start: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(prepared.units.len(), 1);
        assert!(prepared.unit.is_empty());
        assert_eq!(prepared.unit.source_id(), Some(document));
        assert_eq!(prepared.start_at, 0);
    }

    #[tokio::test]
    async fn test_prepare_starts_fresh_when_resume_state_unreadable() {
        let document = DocumentId::generate();
        let units = vec![
            PlayableUnit::with_source(document, "C1", "first"),
            PlayableUnit::with_source(document, "C2", "second"),
        ];
        let content = MemoryContentStore::new();
        content.insert_document(document, units.clone()).await;
        let resume = ResumeStore::new(Arc::new(UnreadableStore));

        let prepared = prepare(
            &content,
            &resume,
            OpenRequest::Document {
                document,
                from_start: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(prepared.unit.id(), units[0].id());
        assert_eq!(prepared.start_at, 0);

        let prepared = prepare(&content, &resume, OpenRequest::Unit(units[1].id()))
            .await
            .unwrap();
        assert_eq!(prepared.unit.id(), units[1].id());
        assert_eq!(prepared.units.len(), 2);
        assert_eq!(prepared.start_at, 0);
    }
}
