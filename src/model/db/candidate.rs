use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::common::{
    candidate::CandidateStatus, CandidateId, ElectionId, PositionId, UserId,
};

/// Core candidate application data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub user_id: UserId,
    pub position_id: PositionId,
    #[serde(default)]
    pub manifesto: Option<String>,
    pub status: CandidateStatus,
    pub election_id: ElectionId,
}

impl CandidateCore {
    /// Can this candidate receive votes for the given position of the given election?
    pub fn stands_for(&self, position_id: PositionId, election_id: ElectionId) -> bool {
        self.status == CandidateStatus::Approved
            && self.position_id == position_id
            && self.election_id == election_id
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
