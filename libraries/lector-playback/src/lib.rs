//! Lector Playback
//!
//! Keeps the speech engine, every playback view and the global "now
//! playing" record in agreement while a reader navigates a playlist.
//!
//! # Architecture
//!
//! - **PositionTracker**: pure char offset to paragraph mapping
//! - **PlaylistController**: navigation, play modes, debounced transitions
//! - **PlaybackRegistry**: the single arbiter of what is playing
//! - **SyncReconciler**: engine / view / global state correction
//! - **PlaybackCoordinator**: the actor that owns all of the above and
//!   serializes every mutation
//!
//! # Example
//!
//! ```rust,no_run
//! use lector_core::{EngineEventSink, UnitId};
//! use lector_playback::{Collaborators, PlaybackConfig, PlaybackCoordinator};
//! use lector_storage::{MemoryContentStore, MemoryStore};
//! use std::sync::Arc;
//!
//! # async fn example(engine: Arc<dyn lector_core::SpeechEngine>, events: lector_core::EngineEventStream) -> lector_core::Result<()> {
//! let coordinator = PlaybackCoordinator::new(
//!     PlaybackConfig::default(),
//!     Collaborators {
//!         engine,
//!         engine_events: events,
//!         content: Arc::new(MemoryContentStore::new()),
//!         store: Arc::new(MemoryStore::new()),
//!     },
//! )
//! .await?;
//!
//! let (handle, _task) = coordinator.spawn();
//! let mut events = handle.subscribe();
//! handle.open(UnitId::generate()).await?;
//! # let _ = events.try_recv();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod coalesce;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod display;
pub mod events;
pub mod language;
pub mod playlist;
pub mod position;
pub mod reconciler;
pub mod registry;

pub use coalesce::{RequestCoalescer, Ticket};
pub use config::{PlaybackConfig, TrackerConfig};
pub use controller::{AdvanceOutcome, FinishOutcome, PlayOutcome, PlaylistController, Transition};
pub use coordinator::{Collaborators, CoordinatorHandle, OpenOutcome, PlaybackCoordinator};
pub use display::DisplayState;
pub use events::{AppEvent, CoordinatorEvent, EventBus, UserError, ViewId};
pub use language::LanguageGuard;
pub use playlist::{Direction, Playlist};
pub use position::{DisplayTarget, PositionTracker};
pub use reconciler::{Decision, Propagation, Rule, SyncReconciler, ViewState};
pub use registry::{PlaybackRegistry, RegistryCommand};

pub use lector_core::{LectorError, Result};
