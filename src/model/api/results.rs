use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId, PositionId};

/// Tallied results for a whole election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub election_title: String,
    pub total_eligible_voters: usize,
    /// Distinct voters who submitted anything.
    pub total_votes_cast: usize,
    /// Whole percent, rounded half up.
    pub voter_turnout: u32,
    pub position_results: Vec<PositionResults>,
}

/// Tallied results for one position, ranked by votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResults {
    pub position_id: PositionId,
    pub position_title: String,
    pub total_votes: usize,
    /// Only present if at least one vote was cast for this position.
    pub winner: Option<CandidateId>,
    pub results: Vec<CandidateResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub candidate_student_id: Option<String>,
    pub votes: usize,
    pub percentage: u32,
}
