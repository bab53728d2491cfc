//! The vote-casting and tallying core.
//!
//! Everything here talks to storage only through [`Store`](crate::model::store::Store),
//! so it behaves identically over the in-memory and MongoDB backends.

use thiserror::Error;

use crate::error::ErrorKind;
use crate::model::{
    common::{CandidateId, PositionId},
    store::StoreError,
};

mod eligibility;
mod submission;
mod tally;

pub use eligibility::get_ballot;
pub use submission::submit_vote;
pub use tally::{compute_results, percentage, results_visible, tally};

/// Reasons a voting operation can refuse to proceed.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("You have already voted in this election")]
    AlreadyVoted,
    #[error("Election not found")]
    ElectionNotFound,
    #[error("This election is not currently active")]
    ElectionNotActive,
    #[error("Voter not found")]
    VoterNotFound,
    #[error("You are not eligible to vote in this election")]
    NotEligible,
    #[error("At least one selection is required")]
    EmptySubmission,
    #[error("You can only vote once per position (position {0} selected twice)")]
    DuplicatePositionSelection(PositionId),
    #[error("Candidate {candidate_id} is not standing for position {position_id}")]
    InvalidSelection {
        position_id: PositionId,
        candidate_id: CandidateId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyVoted | Self::DuplicatePositionSelection(_) => ErrorKind::Conflict,
            Self::ElectionNotFound | Self::VoterNotFound => ErrorKind::NotFound,
            Self::ElectionNotActive | Self::EmptySubmission | Self::InvalidSelection { .. } => {
                ErrorKind::InvalidInput
            }
            Self::NotEligible => ErrorKind::Forbidden,
            Self::Store(err) => err.kind(),
        }
    }
}
