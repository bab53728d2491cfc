use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{ElectionId, UserId};

/// Marker recording that a user has submitted their votes for an election.
///
/// At most one may exist per `(user_id, election_id)`; storage backends
/// enforce this so that writing the marker doubles as the insert-if-absent
/// guard for a vote submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub user_id: UserId,
    pub election_id: ElectionId,
    pub submitted_at: DateTime<Utc>,
}

impl Participation {
    /// A marker for a submission happening now.
    pub fn now(user_id: UserId, election_id: ElectionId) -> Self {
        Self {
            user_id,
            election_id,
            submitted_at: Utc::now(),
        }
    }
}
