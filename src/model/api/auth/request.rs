use serde::{Deserialize, Serialize};

use crate::model::common::user::Role;

/// Minimum password length for self-registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Username and password login. Only administrators log in this way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Student ID login for voters and candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginRequest {
    pub student_id: String,
    pub role: Role,
}

/// Self-registration for students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
}

impl RegisterRequest {
    /// Check the request is well-formed, returning a reason if not.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.role == Role::Admin {
            return Err("Administrators cannot self-register");
        }
        if self.username.trim().is_empty() {
            return Err("Username is required");
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err("Password must be at least 6 characters");
        }
        if self.student_id.trim().is_empty() {
            return Err("Student ID is required");
        }
        if self.name.trim().is_empty() {
            return Err("Name is required");
        }
        Ok(())
    }
}

#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::db::user::EXAMPLE_ADMIN_PASSWORD;

    impl LoginRequest {
        pub fn example_admin() -> Self {
            Self {
                username: "returning-officer".to_string(),
                password: EXAMPLE_ADMIN_PASSWORD.to_string(),
                role: Role::Admin,
            }
        }
    }

    impl StudentLoginRequest {
        pub fn voter(student_id: &str) -> Self {
            Self {
                student_id: student_id.to_string(),
                role: Role::Voter,
            }
        }

        pub fn candidate(student_id: &str) -> Self {
            Self {
                student_id: student_id.to_string(),
                role: Role::Candidate,
            }
        }
    }

    impl RegisterRequest {
        pub fn example(student_id: &str, role: Role) -> Self {
            Self {
                username: format!("user-{student_id}"),
                password: "hunter22".to_string(),
                role,
                student_id: student_id.to_string(),
                name: format!("Student {student_id}"),
                department: None,
            }
        }
    }
}
