use crate::model::common::user::Role;

/// A type-level description of who may use a route.
pub trait RoleGuard {
    /// Does a session with the given role satisfy this guard?
    fn permits(role: Role) -> bool;
}

/// Administrators only.
pub enum Admin {}

/// Students who have applied to stand in an election.
pub enum Candidate {}

/// Students voting in an election.
pub enum Voter {}

/// Anyone who is logged in.
pub enum AnyUser {}

impl RoleGuard for Admin {
    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
}

impl RoleGuard for Candidate {
    fn permits(role: Role) -> bool {
        role == Role::Candidate
    }
}

impl RoleGuard for Voter {
    fn permits(role: Role) -> bool {
        role == Role::Voter
    }
}

impl RoleGuard for AnyUser {
    fn permits(_role: Role) -> bool {
        true
    }
}
