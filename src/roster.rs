//! Voter roster import from CSV.
//!
//! The first row must be a header. Recognised columns are `studentId`,
//! `name` and (optionally) `department`, in any order; anything else is
//! ignored. Rows missing a student ID or name are skipped.

use std::io::Read;

use serde::Deserialize;
use thiserror::Error;

use crate::model::{common::ElectionId, db::NewEligibleVoter};

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("No valid voter records found in CSV")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterRow {
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    department: Option<String>,
}

impl RosterRow {
    fn into_voter(self, election_id: ElectionId) -> Option<NewEligibleVoter> {
        let student_id = self.student_id.filter(|s| !s.is_empty())?;
        let name = self.name.filter(|s| !s.is_empty())?;
        Some(NewEligibleVoter {
            student_id,
            name: Some(name),
            department: self.department.filter(|s| !s.is_empty()),
            election_id,
        })
    }
}

/// Parse a roster for the given election.
///
/// Fails only if the header cannot be read or no row is valid.
pub fn parse_roster<R: Read>(
    reader: R,
    election_id: ElectionId,
) -> Result<Vec<NewEligibleVoter>, RosterError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.headers()?;

    let mut voters = Vec::new();
    for (line, result) in rdr.deserialize::<RosterRow>().enumerate() {
        match result.map(|row| row.into_voter(election_id)) {
            Ok(Some(voter)) => voters.push(voter),
            Ok(None) => debug!("Skipping roster row {}: missing student ID or name", line + 1),
            Err(e) => debug!("Skipping roster row {}: {e}", line + 1),
        }
    }

    if voters.is_empty() {
        return Err(RosterError::Empty);
    }
    Ok(voters)
}
