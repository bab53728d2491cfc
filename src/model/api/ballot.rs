use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId, PositionId};

/// Everything a voter may choose between in one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotView {
    pub election_id: ElectionId,
    pub election_title: String,
    pub positions: Vec<BallotPosition>,
}

/// One contested position. `candidates` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotPosition {
    pub position_id: PositionId,
    pub title: String,
    pub description: Option<String>,
    pub candidates: Vec<BallotCandidate>,
}

/// An approved candidate, with display data from their user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotCandidate {
    pub candidate_id: CandidateId,
    pub name: String,
    pub student_id: Option<String>,
    pub department: Option<String>,
    pub manifesto: Option<String>,
}

/// One choice within a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
}

/// A voter's complete submission for an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSubmission {
    pub election_id: ElectionId,
    pub votes: Vec<Selection>,
}

/// Confirmation of a successful submission. Deliberately does not echo the selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub election_id: ElectionId,
    pub votes_recorded: usize,
    pub submitted_at: DateTime<Utc>,
}
