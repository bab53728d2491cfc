mod request;
mod role;
mod token;

pub use request::{LoginRequest, RegisterRequest, StudentLoginRequest, MIN_PASSWORD_LENGTH};
pub use role::{Admin, AnyUser, Candidate, RoleGuard, Voter};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
