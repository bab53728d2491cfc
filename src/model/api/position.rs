use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ElectionId, PositionId},
    db::{NewPosition, Position},
};

/// A position as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDesc {
    pub id: PositionId,
    pub title: String,
    pub description: Option<String>,
    pub election_id: ElectionId,
}

impl From<Position> for PositionDesc {
    fn from(position: Position) -> Self {
        Self {
            id: position.id,
            title: position.position.title,
            description: position.position.description,
            election_id: position.position.election_id,
        }
    }
}

/// A request to create a new position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSpec {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub election_id: ElectionId,
}

impl From<PositionSpec> for NewPosition {
    fn from(spec: PositionSpec) -> Self {
        Self {
            title: spec.title.trim().to_string(),
            description: spec.description,
            election_id: spec.election_id,
        }
    }
}
