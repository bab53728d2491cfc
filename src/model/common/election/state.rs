use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the Election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Under construction, positions and rosters are being prepared.
    Draft,
    /// Open for voting.
    Active,
    /// Voting has ended; results are public.
    Completed,
}

impl ElectionStatus {
    /// Can an election in this state move to `next`?
    ///
    /// The lifecycle is monotonic: `Draft -> Active -> Completed`, one step at
    /// a time, and staying put is always allowed.
    pub fn can_become(self, next: ElectionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Draft)
                | (Self::Draft, Self::Active)
                | (Self::Active, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Completed, Self::Completed)
        )
    }
}

impl Default for ElectionStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
        };
        write!(f, "{name}")
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
