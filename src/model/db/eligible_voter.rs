use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::common::{ElectionId, EligibleVoterId};

/// A roster entry, as stored in the database.
/// Presence on an election's roster is what makes a student eligible to vote in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleVoterCore {
    pub student_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub election_id: ElectionId,
}

/// A roster entry without an ID.
pub type NewEligibleVoter = EligibleVoterCore;

/// A roster entry from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleVoter {
    #[serde(rename = "_id")]
    pub id: EligibleVoterId,
    #[serde(flatten)]
    pub voter: EligibleVoterCore,
}

impl Deref for EligibleVoter {
    type Target = EligibleVoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}
