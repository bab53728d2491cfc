use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ElectionId, EligibleVoterId},
    db::{EligibleVoter, NewEligibleVoter},
};

/// A roster entry, along with whether that student has voted in the election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleVoterDesc {
    pub id: EligibleVoterId,
    pub student_id: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub election_id: ElectionId,
    pub has_voted: bool,
}

impl EligibleVoterDesc {
    pub fn new(voter: EligibleVoter, has_voted: bool) -> Self {
        Self {
            id: voter.id,
            student_id: voter.voter.student_id,
            name: voter.voter.name,
            department: voter.voter.department,
            election_id: voter.voter.election_id,
            has_voted,
        }
    }
}

/// A request to add a single student to an election's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleVoterSpec {
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    pub election_id: ElectionId,
}

impl EligibleVoterSpec {
    /// Check the spec is well-formed, returning a reason if not.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.student_id.trim().is_empty() || self.name.trim().is_empty() {
            return Err("Student ID and name are required");
        }
        Ok(())
    }
}

impl From<EligibleVoterSpec> for NewEligibleVoter {
    fn from(spec: EligibleVoterSpec) -> Self {
        Self {
            student_id: spec.student_id.trim().to_string(),
            name: Some(spec.name.trim().to_string()),
            department: spec.department,
            election_id: spec.election_id,
        }
    }
}

/// A CSV roster upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpload {
    pub csv_data: String,
    pub election_id: ElectionId,
}

/// The outcome of a roster upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub message: String,
    pub count: usize,
}

impl ImportSummary {
    pub fn new(count: usize) -> Self {
        Self {
            message: format!("{count} voters imported successfully"),
            count,
        }
    }
}
