use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDetails, position::PositionDesc},
    common::{election::ElectionStatus, ElectionId},
    db::{Election, ElectionPatch, NewElection},
};

/// Top-level election metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ElectionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            title: election.election.title,
            description: election.election.description,
            start_date: election.election.start_date,
            end_date: election.election.end_date,
            status: election.election.status,
            created_at: election.election.created_at,
        }
    }
}

/// A position and everyone standing for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDetails {
    #[serde(flatten)]
    pub position: PositionDesc,
    pub candidates: Vec<CandidateDetails>,
}

/// Full election information for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDetails {
    #[serde(flatten)]
    pub election: ElectionSummary,
    pub positions: Vec<PositionDetails>,
}

/// A request to create an election. New elections always start as drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl ElectionSpec {
    /// Check the spec is well-formed, returning a reason if not.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("Election title is required");
        }
        check_dates(self.start_date, self.end_date)
    }
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), &'static str> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err("Election cannot end before it starts"),
        _ => Ok(()),
    }
}

impl From<ElectionSpec> for NewElection {
    fn from(spec: ElectionSpec) -> Self {
        Self {
            title: spec.title.trim().to_string(),
            description: spec.description,
            start_date: spec.start_date,
            end_date: spec.end_date,
            status: ElectionStatus::Draft,
            created_at: Utc::now(),
        }
    }
}

/// A partial update to an election.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<ElectionStatus>,
}

impl ElectionUpdate {
    /// Check this update may be applied to the given election.
    pub fn validate_against(&self, election: &Election) -> Result<(), &'static str> {
        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                return Err("Election title cannot be empty");
            }
        }
        if let Some(status) = self.status {
            if !election.status.can_become(status) {
                return Err("Election status can only move forward one step at a time");
            }
        }
        check_dates(
            self.start_date.or(election.start_date),
            self.end_date.or(election.end_date),
        )
    }
}

impl From<ElectionUpdate> for ElectionPatch {
    fn from(update: ElectionUpdate) -> Self {
        Self {
            title: update.title.map(|t| t.trim().to_string()),
            description: update.description,
            start_date: update.start_date,
            end_date: update.end_date,
            status: update.status,
        }
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::db::ElectionCore;

    #[test]
    fn spec_validation() {
        assert_eq!(ElectionSpec::example().validate(), Ok(()));

        let mut untitled = ElectionSpec::example();
        untitled.title = "   ".to_string();
        assert!(untitled.validate().is_err());

        let now = Utc::now();
        let mut backwards = ElectionSpec::example();
        backwards.start_date = Some(now);
        backwards.end_date = Some(now - Duration::days(1));
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn updates_cannot_regress_status() {
        let election = Election {
            id: 1,
            election: ElectionCore::active_example(),
        };
        let reopen = ElectionUpdate {
            status: Some(ElectionStatus::Draft),
            ..Default::default()
        };
        assert!(reopen.validate_against(&election).is_err());

        let close = ElectionUpdate {
            status: Some(ElectionStatus::Completed),
            ..Default::default()
        };
        assert_eq!(close.validate_against(&election), Ok(()));
    }
}
