//! The persistence interface consumed by the rest of the crate.
//!
//! Every entity gets its own async trait; [`Store`] is the union of them all
//! and is what gets placed into managed state as a [`DynStore`].

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::model::{
    api::{
        candidate::{CandidateDesc, CandidateDetails},
        election::{ElectionDetails, PositionDetails},
        position::PositionDesc,
        user::PublicUser,
    },
    common::{
        candidate::CandidateStatus, user::Role, CandidateId, ElectionId, PositionId, UserId,
    },
    db::{
        hash_password, Candidate, Election, ElectionPatch, EligibleVoter, NewCandidate,
        NewElection, NewEligibleVoter, NewPosition, NewUser, NewVote, Position, User, Vote,
    },
};

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

#[rocket::async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn user_by_student_id(&self, student_id: &str) -> StoreResult<Option<User>>;

    /// Insert a new user.
    /// Fails with [`StoreError::Duplicate`] if the username or student ID is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Change a user's role, returning the updated user if they exist.
    async fn set_role(&self, id: UserId, role: Role) -> StoreResult<Option<User>>;
}

#[rocket::async_trait]
pub trait ElectionStore: Send + Sync {
    /// All elections, in ID order.
    async fn elections(&self) -> StoreResult<Vec<Election>>;

    async fn election_by_id(&self, id: ElectionId) -> StoreResult<Option<Election>>;

    async fn create_election(&self, election: NewElection) -> StoreResult<Election>;

    /// Apply a partial update, returning the updated election if it exists.
    async fn update_election(
        &self,
        id: ElectionId,
        patch: ElectionPatch,
    ) -> StoreResult<Option<Election>>;
}

#[rocket::async_trait]
pub trait PositionStore: Send + Sync {
    /// All positions of an election, in ID order.
    async fn positions_by_election(&self, election_id: ElectionId) -> StoreResult<Vec<Position>>;

    async fn position_by_id(&self, id: PositionId) -> StoreResult<Option<Position>>;

    async fn create_position(&self, position: NewPosition) -> StoreResult<Position>;
}

#[rocket::async_trait]
pub trait CandidateStore: Send + Sync {
    async fn candidates_by_election(&self, election_id: ElectionId)
        -> StoreResult<Vec<Candidate>>;

    async fn candidate_by_id(&self, id: CandidateId) -> StoreResult<Option<Candidate>>;

    async fn candidates_by_position(&self, position_id: PositionId)
        -> StoreResult<Vec<Candidate>>;

    async fn candidates_by_user(&self, user_id: UserId) -> StoreResult<Vec<Candidate>>;

    /// Insert a new application.
    /// Fails with [`StoreError::Duplicate`] if the user already applied for that position.
    async fn create_candidate(&self, candidate: NewCandidate) -> StoreResult<Candidate>;

    async fn update_candidate_status(
        &self,
        id: CandidateId,
        status: CandidateStatus,
    ) -> StoreResult<Option<Candidate>>;
}

#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    /// Record a complete submission for `(user_id, election_id)`.
    ///
    /// This is the only way votes are created. The participation marker and
    /// every vote row are written atomically: either all become visible, or
    /// none do. Fails with [`StoreError::AlreadyVoted`] if a marker or any
    /// vote already exists for the pair, with [`StoreError::MalformedSubmission`]
    /// if the batch is not one vote per position by that user in that election,
    /// and with [`StoreError::ElectionClosed`] or [`StoreError::CandidateNotStanding`]
    /// if the election or a candidate changed since the caller checked them.
    async fn record_votes(
        &self,
        user_id: UserId,
        election_id: ElectionId,
        votes: Vec<NewVote>,
    ) -> StoreResult<Vec<Vote>>;

    async fn votes_by_election(&self, election_id: ElectionId) -> StoreResult<Vec<Vote>>;

    /// Has the user submitted anything for this election?
    async fn has_voted(&self, user_id: UserId, election_id: ElectionId) -> StoreResult<bool>;
}

#[rocket::async_trait]
pub trait EligibleVoterStore: Send + Sync {
    async fn eligible_voters_by_election(
        &self,
        election_id: ElectionId,
    ) -> StoreResult<Vec<EligibleVoter>>;

    /// Any roster entry for this student, in any election.
    async fn eligible_voter_by_student_id(
        &self,
        student_id: &str,
    ) -> StoreResult<Option<EligibleVoter>>;

    async fn eligible_voter_for_election(
        &self,
        election_id: ElectionId,
        student_id: &str,
    ) -> StoreResult<Option<EligibleVoter>>;

    /// Fails with [`StoreError::Duplicate`] if the student is already on that election's roster.
    async fn create_eligible_voter(&self, voter: NewEligibleVoter) -> StoreResult<EligibleVoter>;

    /// Insert many roster entries, silently skipping duplicates.
    /// Returns only the entries actually created.
    async fn bulk_create_eligible_voters(
        &self,
        voters: Vec<NewEligibleVoter>,
    ) -> StoreResult<Vec<EligibleVoter>>;
}

/// A complete storage backend.
#[rocket::async_trait]
pub trait Store:
    UserStore + ElectionStore + PositionStore + CandidateStore + VoteStore + EligibleVoterStore
{
    /// An election together with its positions and every candidate standing for them.
    async fn election_with_details(&self, id: ElectionId) -> StoreResult<Option<ElectionDetails>> {
        let election = match self.election_by_id(id).await? {
            Some(election) => election,
            None => return Ok(None),
        };

        let candidates = self.candidates_by_election(id).await?;
        let mut positions = Vec::new();
        for position in self.positions_by_election(id).await? {
            let mut details = Vec::new();
            for candidate in candidates.iter().filter(|c| c.position_id == position.id) {
                details.push(self.candidate_with_details(candidate.clone()).await?);
            }
            positions.push(PositionDetails {
                position: position.into(),
                candidates: details,
            });
        }

        Ok(Some(ElectionDetails {
            election: election.into(),
            positions,
        }))
    }

    /// A candidate joined with their user record and the position they are standing for.
    async fn candidate_with_details(&self, candidate: Candidate) -> StoreResult<CandidateDetails> {
        let user = self.user_by_id(candidate.user_id).await?.map(PublicUser::from);
        let position = self
            .position_by_id(candidate.position_id)
            .await?
            .map(PositionDesc::from);
        Ok(CandidateDetails {
            candidate: CandidateDesc::from(candidate),
            user,
            position,
        })
    }
}

impl<T> Store for T where
    T: UserStore + ElectionStore + PositionStore + CandidateStore + VoteStore + EligibleVoterStore
{
}

/// The store as held in managed state.
pub type DynStore = Arc<dyn Store>;

/// Check a batch is one voter's submission for one election, with at most
/// one vote per position.
pub(crate) fn check_submission(
    user_id: UserId,
    election_id: ElectionId,
    votes: &[NewVote],
) -> StoreResult<()> {
    let mut positions = BTreeSet::new();
    for vote in votes {
        if vote.user_id != user_id || vote.election_id != election_id {
            return Err(StoreError::MalformedSubmission(format!(
                "vote by user {} in election {} submitted as user {user_id} in election {election_id}",
                vote.user_id, vote.election_id
            )));
        }
        if !positions.insert(vote.position_id) {
            return Err(StoreError::MalformedSubmission(format!(
                "position {} selected twice",
                vote.position_id
            )));
        }
    }
    Ok(())
}

/// Check, as part of the write, that the election still takes votes and every
/// chosen candidate still stands. `candidates` holds whatever was found for the
/// chosen candidate IDs.
pub(crate) fn check_still_open(
    election_id: ElectionId,
    election: Option<&Election>,
    votes: &[NewVote],
    candidates: &[Candidate],
) -> StoreResult<()> {
    if !election.map_or(false, Election::is_active) {
        return Err(StoreError::ElectionClosed(election_id));
    }
    for vote in votes {
        let standing = candidates
            .iter()
            .any(|c| c.id == vote.candidate_id && c.stands_for(vote.position_id, election_id));
        if !standing {
            return Err(StoreError::CandidateNotStanding {
                position_id: vote.position_id,
                candidate_id: vote.candidate_id,
            });
        }
    }
    Ok(())
}

/// Ensure an administrator with the given username exists, creating one with
/// the given password if not. An existing account is left untouched.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> StoreResult<User> {
    if let Some(user) = store.user_by_username(username).await? {
        if user.role != Role::Admin {
            warn!("Bootstrap admin username {username} belongs to a non-admin account");
        }
        return Ok(user);
    }
    info!("Creating bootstrap admin {username}");
    store
        .create_user(NewUser {
            username: username.to_string(),
            password_hash: Some(hash_password(password)),
            role: Role::Admin,
            student_id: None,
            department: None,
            name: None,
        })
        .await
}
