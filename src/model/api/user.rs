use serde::{Deserialize, Serialize};

use crate::model::{
    common::{user::Role, UserId},
    db::User,
};

/// A user as exposed over the API: everything except the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub student_id: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.user.username,
            role: user.user.role,
            student_id: user.user.student_id,
            name: user.user.name,
            department: user.user.department,
        }
    }
}

/// The current session, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<PublicUser>,
}
