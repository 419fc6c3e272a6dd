//! The review-cycle state machine.
//!
//! Review state is tracked at the *cycle* level, not the version level: one
//! review pass for a phase legitimately spans several version bumps while
//! the author addresses notes. A cycle is created by submission, mutated by
//! note events, and closed (final) by an authorized actor. Closed cycles
//! are immutable; resuming review means opening a new cycle.
//!
//! Transitions:
//!
//! ```text
//! (no open cycle) --submit--> needs_review --elevated comment--> in_review
//! in_review --note addressed--> in_progress
//! in_review / in_progress --all notes approved--> approved
//! approved --elevated comment / note reopened--> in_review
//! in_progress --elevated comment--> in_review
//! approved --mark_as_final--> final (terminal)
//! ```
//!
//! A transition attempt that fails its guard is a no-op with a reason, not
//! an error, so the UI can say "2 notes still need approval" instead of
//! failing.

use log::debug;
use uuid::Uuid;

use crate::store::RecordStore;
use crate::types::{
    CycleType, LifecycleError, LifecycleResult, NoteStatus, ReviewCycle, ReviewState, UserRole,
};

/// Result of one review event.
///
/// `changed` is false for guard misses; `message` is always populated and
/// safe to surface verbatim.
#[derive(Debug, Clone)]
pub struct Transition {
    pub changed: bool,
    /// The state entered, when a transition happened.
    pub state: Option<ReviewState>,
    pub message: String,
}

impl Transition {
    fn to(state: ReviewState, message: impl Into<String>) -> Self {
        Self {
            changed: true,
            state: Some(state),
            message: message.into(),
        }
    }

    fn no_change(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            state: None,
            message: message.into(),
        }
    }
}

/// A note insertion plus whatever transition it triggered.
#[derive(Debug)]
pub struct NoteAdded {
    pub note_id: u64,
    pub transition: Transition,
}

/// Result of a note status event: whether the note itself changed, and
/// whatever cycle transition it triggered.
#[derive(Debug)]
pub struct NoteEvent {
    /// The note's status actually moved.
    pub applied: bool,
    pub transition: Transition,
}

impl NoteEvent {
    fn applied(transition: Transition) -> Self {
        Self {
            applied: true,
            transition,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            applied: false,
            transition: Transition::no_change(message),
        }
    }
}

/// Drives all review-state transitions. The record store is the only
/// component allowed to hold cycle rows, and this engine is the only
/// component allowed to compute their state.
#[derive(Debug, Default)]
pub struct ReviewEngine;

impl ReviewEngine {
    pub fn new() -> Self {
        Self
    }

    /// Submit a version for review, creating a new cycle for the phase.
    ///
    /// Exactly one open cycle may exist per family; a second submission is
    /// a no-op that names the cycle already in flight.
    pub fn submit_for_review(
        &self,
        records: &mut dyn RecordStore,
        version_uuid: Uuid,
        cycle_type: CycleType,
        submitted_by: &str,
    ) -> LifecycleResult<Transition> {
        let version = records
            .get_version(version_uuid)
            .ok_or(LifecycleError::NotFound(version_uuid))?;

        if let Some(open) = records.get_open_cycle(version.asset_id) {
            return Ok(Transition::no_change(format!(
                "{} already has an active {} cycle (started at {})",
                version.name,
                open.cycle_type.label(),
                open.start_version
            )));
        }

        let cycle_id = records.create_cycle(
            version.asset_id,
            cycle_type,
            &version.version_label,
            submitted_by,
        );
        records.link_version_to_cycle(version_uuid, cycle_id);
        debug!(
            "cycle {} ({}) opened for {} at {}",
            cycle_id, cycle_type, version.name, version.version_label
        );

        Ok(Transition::to(
            ReviewState::NeedsReview,
            format!("Started {} review cycle", cycle_type.label()),
        ))
    }

    /// Auto-join a freshly created version to the family's open cycle.
    ///
    /// Versions created before the cycle opened, or that already belong to
    /// a cycle, are left alone. The comparison uses creation time, not
    /// version labels: the cycle spans the whole family, and each variant
    /// numbers its own chain from v001.
    pub fn on_version_created(
        &self,
        records: &mut dyn RecordStore,
        version_uuid: Uuid,
    ) -> LifecycleResult<Transition> {
        let version = records
            .get_version(version_uuid)
            .ok_or(LifecycleError::NotFound(version_uuid))?;

        let open = match records.get_open_cycle(version.asset_id) {
            Some(cycle) => cycle,
            None => return Ok(Transition::no_change("No active cycle to join")),
        };
        if records.cycle_for_version(version_uuid).is_some() {
            return Ok(Transition::no_change(format!(
                "Version {} already belongs to a cycle",
                version.version_label
            )));
        }
        if version.created_at < open.created_at {
            return Ok(Transition::no_change(format!(
                "Version {} predates the {} cycle",
                version.version_label,
                open.cycle_type.label()
            )));
        }

        records.link_version_to_cycle(version_uuid, open.id);
        Ok(Transition::no_change(format!(
            "Version {} joined the {} cycle",
            version.version_label,
            open.cycle_type.label()
        )))
    }

    /// Add a reviewer/author note to a version and apply the comment
    /// transition. Non-elevated authors never change state.
    pub fn add_note(
        &self,
        records: &mut dyn RecordStore,
        version_uuid: Uuid,
        text: &str,
        author: &str,
        author_role: UserRole,
    ) -> LifecycleResult<NoteAdded> {
        let cycle = self.open_cycle_of(records, version_uuid)?;

        let note_id = records.add_note(cycle.id, version_uuid, text, author, author_role);
        let transition = self.on_comment_added(records, &cycle, author_role)?;
        Ok(NoteAdded {
            note_id,
            transition,
        })
    }

    /// The comment event of the transition table, applied to a cycle.
    fn on_comment_added(
        &self,
        records: &mut dyn RecordStore,
        cycle: &ReviewCycle,
        author_role: UserRole,
    ) -> LifecycleResult<Transition> {
        if !author_role.is_elevated() {
            return Ok(Transition::no_change("Note added"));
        }

        let (next, message) = match cycle.review_state {
            ReviewState::NeedsReview => (ReviewState::InReview, "Review started: lead added notes"),
            ReviewState::Approved => (
                ReviewState::InReview,
                "Review reopened: lead added more notes",
            ),
            ReviewState::InProgress => (
                ReviewState::InReview,
                "More feedback added, back to review",
            ),
            _ => return Ok(Transition::no_change("Note added")),
        };
        self.set_state(records, cycle, next)?;
        Ok(Transition::to(next, message))
    }

    /// Author marks a note fixed. First addressed note moves the cycle to
    /// `in_progress`.
    pub fn address_note(
        &self,
        records: &mut dyn RecordStore,
        note_id: u64,
    ) -> LifecycleResult<NoteEvent> {
        let note = records
            .get_note(note_id)
            .ok_or(LifecycleError::NoteNotFound(note_id))?;
        if note.status != NoteStatus::Open {
            return Ok(NoteEvent::rejected(format!(
                "Note is {}; only open notes can be addressed",
                note.status
            )));
        }
        let cycle = records
            .get_cycle(note.cycle_id)
            .ok_or(LifecycleError::CycleNotFound(note.cycle_id))?;
        if !cycle.is_open() {
            return Ok(NoteEvent::rejected("Cycle is final; notes are frozen"));
        }

        records.set_note_status(note_id, NoteStatus::Addressed);

        if cycle.review_state == ReviewState::InReview {
            self.set_state(records, &cycle, ReviewState::InProgress)?;
            return Ok(NoteEvent::applied(Transition::to(
                ReviewState::InProgress,
                "Artist started addressing feedback",
            )));
        }
        Ok(NoteEvent::applied(Transition::no_change(
            "Note marked addressed",
        )))
    }

    /// Reviewer confirms a fix. The cycle only approves once *every* note
    /// across the whole cycle is approved.
    pub fn approve_note(
        &self,
        records: &mut dyn RecordStore,
        note_id: u64,
    ) -> LifecycleResult<NoteEvent> {
        let note = records
            .get_note(note_id)
            .ok_or(LifecycleError::NoteNotFound(note_id))?;
        if note.status == NoteStatus::Approved {
            return Ok(NoteEvent::rejected("Note is already approved"));
        }
        let cycle = records
            .get_cycle(note.cycle_id)
            .ok_or(LifecycleError::CycleNotFound(note.cycle_id))?;
        if !cycle.is_open() {
            return Ok(NoteEvent::rejected("Cycle is final; notes are frozen"));
        }

        records.set_note_status(note_id, NoteStatus::Approved);

        if !matches!(
            cycle.review_state,
            ReviewState::InReview | ReviewState::InProgress
        ) {
            return Ok(NoteEvent::applied(Transition::no_change("Note approved")));
        }

        let counts = records.note_counts_for_cycle(cycle.id);
        if counts.remaining() == 0 {
            self.set_state(records, &cycle, ReviewState::Approved)?;
            return Ok(NoteEvent::applied(Transition::to(
                ReviewState::Approved,
                "All notes approved, cycle approved",
            )));
        }
        Ok(NoteEvent::applied(Transition::no_change(format!(
            "{} note(s) still need approval",
            counts.remaining()
        ))))
    }

    /// Reopen a note. Pushing an approved cycle back to review takes an
    /// elevated actor; authors may reopen their own addressed notes.
    pub fn reopen_note(
        &self,
        records: &mut dyn RecordStore,
        note_id: u64,
        actor_role: UserRole,
    ) -> LifecycleResult<NoteEvent> {
        let note = records
            .get_note(note_id)
            .ok_or(LifecycleError::NoteNotFound(note_id))?;
        if note.status == NoteStatus::Open {
            return Ok(NoteEvent::rejected("Note is already open"));
        }
        let cycle = records
            .get_cycle(note.cycle_id)
            .ok_or(LifecycleError::CycleNotFound(note.cycle_id))?;
        if !cycle.is_open() {
            return Ok(NoteEvent::rejected("Cycle is final; notes are frozen"));
        }

        if cycle.review_state == ReviewState::Approved {
            if !actor_role.is_elevated() {
                return Ok(NoteEvent::rejected(
                    "Only a lead can reopen notes on an approved cycle",
                ));
            }
            records.set_note_status(note_id, NoteStatus::Open);
            self.set_state(records, &cycle, ReviewState::InReview)?;
            return Ok(NoteEvent::applied(Transition::to(
                ReviewState::InReview,
                "Note reopened, back to review",
            )));
        }

        records.set_note_status(note_id, NoteStatus::Open);
        Ok(NoteEvent::applied(Transition::no_change("Note reopened")))
    }

    /// Close the cycle. One-way: a final cycle can never be reopened, and
    /// the only path forward is a brand-new cycle.
    pub fn mark_as_final(
        &self,
        records: &mut dyn RecordStore,
        version_uuid: Uuid,
        actor: &str,
        actor_role: UserRole,
    ) -> LifecycleResult<Transition> {
        let version = records
            .get_version(version_uuid)
            .ok_or(LifecycleError::NotFound(version_uuid))?;
        let cycle = records
            .cycle_for_version(version_uuid)
            .or_else(|| records.get_open_cycle(version.asset_id))
            .ok_or_else(|| LifecycleError::InvalidTransition {
                reason: format!("{} is not in a review cycle", version.name),
            })?;

        if !actor_role.is_elevated() {
            return Err(LifecycleError::AuthorizationDenied {
                actor: actor.to_string(),
                role: actor_role.name().to_string(),
                action: "finalize a review cycle".to_string(),
            });
        }
        if cycle.review_state == ReviewState::Final {
            return Err(LifecycleError::InvalidTransition {
                reason: "cycle is already final; start a new cycle instead".to_string(),
            });
        }
        if cycle.review_state != ReviewState::Approved {
            return Err(LifecycleError::InvalidTransition {
                reason: format!(
                    "can only finalize from approved (current: {})",
                    cycle.review_state
                ),
            });
        }

        if !records.close_cycle(cycle.id, &version.version_label, actor) {
            return Err(LifecycleError::Store(format!(
                "failed to close cycle {}",
                cycle.id
            )));
        }
        debug!(
            "cycle {} closed at {} by {}",
            cycle.id, version.version_label, actor
        );
        Ok(Transition::to(
            ReviewState::Final,
            format!("{} review cycle finalized", cycle.cycle_type.label()),
        ))
    }

    /// Current review state of a version: its cycle's state, or the legacy
    /// per-version state for rows that predate cycles.
    pub fn current_state(
        &self,
        records: &dyn RecordStore,
        version_uuid: Uuid,
    ) -> Option<ReviewState> {
        if let Some(cycle) = records.cycle_for_version(version_uuid) {
            return Some(cycle.review_state);
        }
        records
            .get_version(version_uuid)
            .and_then(|v| v.legacy_review_state)
    }

    /// The open cycle for a family, if any.
    pub fn active_cycle(&self, records: &dyn RecordStore, asset_id: Uuid) -> Option<ReviewCycle> {
        records.get_open_cycle(asset_id)
    }

    /// Whether a new cycle may be started (no open cycle in flight).
    pub fn can_start_cycle(&self, records: &dyn RecordStore, asset_id: Uuid) -> bool {
        records.get_open_cycle(asset_id).is_none()
    }

    /// Resolve the open cycle a version's notes belong to.
    fn open_cycle_of(
        &self,
        records: &dyn RecordStore,
        version_uuid: Uuid,
    ) -> LifecycleResult<ReviewCycle> {
        let version = records
            .get_version(version_uuid)
            .ok_or(LifecycleError::NotFound(version_uuid))?;
        let cycle = records
            .cycle_for_version(version_uuid)
            .ok_or_else(|| {
                LifecycleError::InvalidOperation(format!(
                    "{} {} is not part of a review cycle",
                    version.name, version.version_label
                ))
            })?;
        if !cycle.is_open() {
            return Err(LifecycleError::InvalidOperation(
                "cycle is final; start a new review cycle".to_string(),
            ));
        }
        Ok(cycle)
    }

    fn set_state(
        &self,
        records: &mut dyn RecordStore,
        cycle: &ReviewCycle,
        state: ReviewState,
    ) -> LifecycleResult<()> {
        if !records.set_cycle_state(cycle.id, state) {
            return Err(LifecycleError::Store(format!(
                "failed to update cycle {}",
                cycle.id
            )));
        }
        debug!(
            "cycle {}: {} -> {}",
            cycle.id, cycle.review_state, state
        );
        Ok(())
    }
}
