use serde::{Deserialize, Serialize};

use crate::model::{
    api::{election::ElectionSummary, position::PositionDesc, user::PublicUser},
    common::{
        candidate::CandidateStatus, CandidateId, ElectionId, PositionId, UserId,
    },
    db::Candidate,
};

/// Minimum manifesto length, in characters.
pub const MIN_MANIFESTO_LENGTH: usize = 20;

/// A candidate application as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDesc {
    pub id: CandidateId,
    pub user_id: UserId,
    pub position_id: PositionId,
    pub manifesto: Option<String>,
    pub status: CandidateStatus,
    pub election_id: ElectionId,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            user_id: candidate.candidate.user_id,
            position_id: candidate.candidate.position_id,
            manifesto: candidate.candidate.manifesto,
            status: candidate.candidate.status,
            election_id: candidate.candidate.election_id,
        }
    }
}

/// A candidate joined with their user record and position.
/// Either may be missing if the referenced record no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDetails {
    #[serde(flatten)]
    pub candidate: CandidateDesc,
    pub user: Option<PublicUser>,
    pub position: Option<PositionDesc>,
}

/// One of a candidate's applications, along with the election it is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(flatten)]
    pub details: CandidateDetails,
    pub election: Option<ElectionSummary>,
}

/// An application to stand for a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateApplication {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_id: String,
    pub position_id: PositionId,
    pub manifesto: String,
    pub election_id: ElectionId,
    #[serde(default)]
    pub department: Option<String>,
}

impl CandidateApplication {
    /// Check the application is well-formed, returning a reason if not.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("First and last name are required");
        }
        if !self.email.contains('@') {
            return Err("A valid email address is required");
        }
        if self.student_id.trim().is_empty() {
            return Err("Student ID is required");
        }
        if self.manifesto.trim().chars().count() < MIN_MANIFESTO_LENGTH {
            return Err("Manifesto must be at least 20 characters");
        }
        Ok(())
    }

    /// The applicant's full display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// A request to change an application's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: CandidateStatus,
}
