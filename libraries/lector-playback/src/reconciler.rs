//! Three-way reconciliation of engine, view and global play state
//!
//! Rules, first match wins, for a view showing `unit`:
//! 1. another unit owns the global record and is playing: the view yields
//!    (local = false) and the registry is left alone
//! 2. engine and view disagree: the view follows the engine and, if the
//!    view's unit owns the record, the change is propagated
//! 3. view and record disagree and the view's unit owns the record: the
//!    view's state is propagated
//! 4. nothing to do
//!
//! A second pass without new events changes nothing.

use crate::registry::PlaybackRegistry;
use lector_core::{ContentType, GlobalPlaybackRecord, UnitId};
use tracing::debug;

/// Per-view state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub unit_id: UnitId,
    pub title: String,
    pub content_type: ContentType,
    pub local_playing: bool,
}

/// Registry write requested by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// `start_playback` for the view's unit
    Start,
    /// `request_stop` to the owner
    Stop,
}

/// Rule that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    YieldToOwner,
    FollowEngine,
    PushLocal,
    InSync,
}

/// Outcome of one pass for one view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub rule: Rule,
    pub local_playing: bool,
    pub propagate: Option<Propagation>,
}

impl Decision {
    /// Whether applying this decision changes anything
    pub fn changes(&self, view: &ViewState) -> bool {
        self.local_playing != view.local_playing || self.propagate.is_some()
    }
}

/// Decide one pass; pure
pub fn decide(
    unit_id: UnitId,
    engine_playing: bool,
    local_playing: bool,
    global: &GlobalPlaybackRecord,
) -> Decision {
    let owns = global.content_id == Some(unit_id);

    if global.is_owned_by_other(unit_id) {
        return Decision {
            rule: Rule::YieldToOwner,
            local_playing: false,
            propagate: None,
        };
    }

    if engine_playing != local_playing {
        let direction = if engine_playing {
            Propagation::Start
        } else {
            Propagation::Stop
        };
        let propagate = (owns && global.is_playing != engine_playing).then_some(direction);
        return Decision {
            rule: Rule::FollowEngine,
            local_playing: engine_playing,
            propagate,
        };
    }

    if owns && local_playing != global.is_playing {
        return Decision {
            rule: Rule::PushLocal,
            local_playing,
            propagate: Some(if local_playing {
                Propagation::Start
            } else {
                Propagation::Stop
            }),
        };
    }

    Decision {
        rule: Rule::InSync,
        local_playing,
        propagate: None,
    }
}

/// Applies reconciliation decisions to a view and the registry
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReconciler;

impl SyncReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Run one pass for `view`
    ///
    /// `Stop` propagations are issued as registry commands; the owner applies
    /// them when it processes the command.
    pub async fn reconcile(
        &self,
        view: &mut ViewState,
        engine_playing: bool,
        registry: &mut PlaybackRegistry,
    ) -> Decision {
        let global = registry.snapshot();
        let decision = decide(view.unit_id, engine_playing, view.local_playing, &global);

        if decision.changes(view) {
            debug!(
                unit_id = %view.unit_id,
                rule = ?decision.rule,
                engine_playing,
                local_playing = view.local_playing,
                global_playing = global.is_playing,
                "Reconciling view"
            );
        }

        view.local_playing = decision.local_playing;
        match decision.propagate {
            Some(Propagation::Start) => {
                registry
                    .start_playback(view.unit_id, &view.title, view.content_type)
                    .await;
            }
            Some(Propagation::Stop) => {
                registry.request_stop();
            }
            None => {}
        }

        decision
    }
}
