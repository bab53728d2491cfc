use std::ops::{Deref, DerefMut};

use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::common::{user::Role, UserId};

/// Core user data, as stored in the database.
///
/// There is deliberately no "has voted" flag here: whether a user has voted
/// is a per-election fact, answered by the vote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    /// Argon2 hash. Student accounts created on first login have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserCore {
    /// Check whether the given password is correct.
    /// Accounts without a password never match.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        match self.password_hash {
            Some(ref hash) => argon2::verify_encoded(hash, password.as_ref()).unwrap_or(false),
            None => false,
        }
    }

    /// Is this user one of the given roles?
    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Hash a plaintext password for storage.
pub fn hash_password(password: &str) -> String {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
        .expect("the default argon2 config is valid")
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}


#[cfg(test)]
pub use examples::EXAMPLE_ADMIN_PASSWORD;
