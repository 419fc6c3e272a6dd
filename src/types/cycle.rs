//! Review cycles, notes, and the workflow enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The production phase a review cycle covers.
///
/// A closed preset list, not free text, so reporting stays consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleType {
    Modeling,
    Texturing,
    Rigging,
    Lighting,
    Animation,
    Fx,
    Lookdev,
    /// Default catch-all phase.
    General,
}

impl CycleType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Modeling => "modeling",
            Self::Texturing => "texturing",
            Self::Rigging => "rigging",
            Self::Lighting => "lighting",
            Self::Animation => "animation",
            Self::Fx => "fx",
            Self::Lookdev => "lookdev",
            Self::General => "general",
        }
    }

    /// Display label for UI surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Modeling => "Modeling",
            Self::Texturing => "Texturing",
            Self::Rigging => "Rigging",
            Self::Lighting => "Lighting",
            Self::Animation => "Animation",
            Self::Fx => "FX",
            Self::Lookdev => "Look Dev",
            Self::General => "General",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "modeling" => Some(Self::Modeling),
            "texturing" => Some(Self::Texturing),
            "rigging" => Some(Self::Rigging),
            "lighting" => Some(Self::Lighting),
            "animation" => Some(Self::Animation),
            "fx" => Some(Self::Fx),
            "lookdev" => Some(Self::Lookdev),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for CycleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Workflow stage of a review cycle.
///
/// The "not in review" state is the absence of an open cycle, so it has no
/// variant here; queries return `Option<ReviewState>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Submitted, awaiting the first reviewer pass.
    NeedsReview,
    /// A reviewer has left feedback.
    InReview,
    /// The author is addressing feedback.
    InProgress,
    /// Every note in the cycle is approved.
    Approved,
    /// Cycle closed. Terminal: a new cycle must be started to resume.
    Final,
}

impl ReviewState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NeedsReview => "needs_review",
            Self::InReview => "in_review",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Final => "final",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "needs_review" => Some(Self::NeedsReview),
            "in_review" => Some(Self::InReview),
            "in_progress" => Some(Self::InProgress),
            "approved" => Some(Self::Approved),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Status of a single review note, a three-state ratchet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    /// Reviewer added the note, awaiting the author.
    Open,
    /// Author marked it fixed, awaiting reviewer confirmation.
    Addressed,
    /// Reviewer confirmed the fix.
    Approved,
}

impl NoteStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Addressed => "addressed",
            Self::Approved => "approved",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "addressed" => Some(Self::Addressed),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

impl std::fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Actor roles in the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Artist,
    Lead,
    Supervisor,
    Admin,
    Director,
}

impl UserRole {
    /// Elevated roles drive review-state transitions and may finalize.
    pub fn is_elevated(&self) -> bool {
        matches!(
            self,
            Self::Lead | Self::Supervisor | Self::Admin | Self::Director
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Lead => "lead",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
            Self::Director => "director",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "artist" => Some(Self::Artist),
            "lead" => Some(Self::Lead),
            "supervisor" => Some(Self::Supervisor),
            "admin" => Some(Self::Admin),
            "director" => Some(Self::Director),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One approval pass for a production phase, spanning a contiguous range of
/// versions of one asset family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCycle {
    pub id: u64,
    pub asset_id: Uuid,
    pub cycle_type: CycleType,
    /// Version label the cycle was opened at.
    pub start_version: String,
    /// Version label the cycle closed at. `None` while the cycle is open.
    pub end_version: Option<String>,
    pub review_state: ReviewState,
    pub submitted_by: String,
    pub finalized_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl ReviewCycle {
    /// Open cycles have no end version yet.
    pub fn is_open(&self) -> bool {
        self.end_version.is_none()
    }
}

/// One reviewer comment attached to a specific version within a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewNote {
    pub id: u64,
    pub cycle_id: u64,
    pub version_uuid: Uuid,
    pub text: String,
    pub author: String,
    pub author_role: UserRole,
    pub status: NoteStatus,
    pub created_at: DateTime<Utc>,
}

/// Note tallies for a whole cycle, keyed by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoteCounts {
    pub open: usize,
    pub addressed: usize,
    pub approved: usize,
}

impl NoteCounts {
    /// Notes still blocking cycle approval.
    pub fn remaining(&self) -> usize {
        self.open + self.addressed
    }
}
