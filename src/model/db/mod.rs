//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs are stored in the `_id` field.
//! - Field names are snake_case.

pub mod candidate;
pub mod election;
pub mod eligible_voter;
pub mod participation;
pub mod position;
pub mod user;
pub mod vote;

pub use candidate::{Candidate, CandidateCore, NewCandidate};
pub use election::{Election, ElectionCore, ElectionPatch, NewElection};
pub use eligible_voter::{EligibleVoter, EligibleVoterCore, NewEligibleVoter};
pub use participation::Participation;
pub use position::{NewPosition, Position, PositionCore};
pub use user::{hash_password, NewUser, User, UserCore};
pub use vote::{NewVote, Vote, VoteCore};
