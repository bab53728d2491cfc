use mongodb::error::Error as DbError;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::model::common::{CandidateId, ElectionId, PositionId, UserId};

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint would have been violated.
    #[error("Duplicate {0}")]
    Duplicate(String),
    /// The user already has a recorded submission for this election.
    #[error("User {user_id} has already voted in election {election_id}")]
    AlreadyVoted {
        user_id: UserId,
        election_id: ElectionId,
    },
    /// A vote batch that cannot be a single voter's submission for one election.
    #[error("Malformed submission: {0}")]
    MalformedSubmission(String),
    /// The election stopped accepting votes before the submission was written.
    #[error("Election {0} is not accepting votes")]
    ElectionClosed(ElectionId),
    /// A chosen candidate stopped standing before the submission was written.
    #[error("Candidate {candidate_id} is not standing for position {position_id}")]
    CandidateNotStanding {
        position_id: PositionId,
        candidate_id: CandidateId,
    },
    /// An auto-increment counter was missing from the database.
    #[error("Failed to find counter with ID {0}")]
    MissingCounter(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Duplicate(_) | Self::AlreadyVoted { .. } => ErrorKind::Conflict,
            Self::MalformedSubmission(_)
            | Self::ElectionClosed(_)
            | Self::CandidateNotStanding { .. } => ErrorKind::InvalidInput,
            Self::MissingCounter(_) | Self::Db(_) => ErrorKind::Internal,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
