//! Types shared by the storage, core and API layers.

pub mod candidate;
pub mod election;
pub mod user;

/// Our user IDs are integers.
pub type UserId = u32;
/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our position IDs are integers.
pub type PositionId = u32;
/// Our candidate IDs are integers.
pub type CandidateId = u32;
/// Our vote IDs are integers.
pub type VoteId = u32;
/// Our roster entry IDs are integers.
pub type EligibleVoterId = u32;
