use std::collections::BTreeMap;

use rocket::tokio::sync::RwLock;

use crate::model::{
    common::{
        candidate::CandidateStatus, user::Role, CandidateId, ElectionId, PositionId, UserId,
    },
    db::{
        Candidate, CandidateCore, Election, ElectionCore, ElectionPatch, EligibleVoter,
        EligibleVoterCore, NewCandidate, NewElection, NewEligibleVoter, NewPosition, NewUser,
        NewVote, Participation, Position, PositionCore, User, UserCore, Vote, VoteCore,
    },
};

use super::{
    check_still_open, check_submission, CandidateStore, ElectionStore, EligibleVoterStore,
    PositionStore, StoreError, StoreResult, UserStore, VoteStore,
};

/// Rows of one entity type, keyed by an auto-incrementing ID starting at 1.
#[derive(Debug)]
struct Table<T> {
    next_id: u32,
    rows: BTreeMap<u32, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert(&mut self, row: T) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row);
        id
    }

    fn get(&self, id: u32) -> Option<(u32, T)> {
        self.rows.get(&id).map(|row| (id, row.clone()))
    }

    fn find<'a>(
        &'a self,
        mut pred: impl FnMut(&T) -> bool + 'a,
    ) -> impl Iterator<Item = (u32, T)> + 'a {
        self.rows
            .iter()
            .filter(move |(_, row)| pred(row))
            .map(|(id, row)| (*id, row.clone()))
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<UserCore>,
    elections: Table<ElectionCore>,
    positions: Table<PositionCore>,
    candidates: Table<CandidateCore>,
    votes: Table<VoteCore>,
    eligible_voters: Table<EligibleVoterCore>,
    participations: BTreeMap<(UserId, ElectionId), Participation>,
}

impl Tables {
    fn roster_contains(&self, voter: &EligibleVoterCore) -> bool {
        self.eligible_voters
            .rows
            .values()
            .any(|v| v.election_id == voter.election_id && v.student_id == voter.student_id)
    }
}

fn user((id, user): (u32, UserCore)) -> User {
    User { id, user }
}

fn election((id, election): (u32, ElectionCore)) -> Election {
    Election { id, election }
}

fn position((id, position): (u32, PositionCore)) -> Position {
    Position { id, position }
}

fn candidate((id, candidate): (u32, CandidateCore)) -> Candidate {
    Candidate { id, candidate }
}

fn vote((id, vote): (u32, VoteCore)) -> Vote {
    Vote { id, vote }
}

fn eligible_voter((id, voter): (u32, EligibleVoterCore)) -> EligibleVoter {
    EligibleVoter { id, voter }
}

/// A volatile store holding everything in ordered maps behind a single lock.
///
/// Every write takes the lock exclusively, so a vote submission's
/// check-and-insert is a single critical section.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl UserStore for MemoryStore {
    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).map(user))
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        let found = tables.users.find(|u| u.username == username).next();
        Ok(found.map(user))
    }

    async fn user_by_student_id(&self, student_id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        let found = tables
            .users
            .find(|u| u.student_id.as_deref() == Some(student_id))
            .next();
        Ok(found.map(user))
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .find(|u| u.username == new_user.username)
            .next()
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "username {}",
                new_user.username
            )));
        }
        if let Some(ref student_id) = new_user.student_id {
            if tables
                .users
                .find(|u| u.student_id.as_ref() == Some(student_id))
                .next()
                .is_some()
            {
                return Err(StoreError::Duplicate(format!("student ID {student_id}")));
            }
        }
        let id = tables.users.insert(new_user.clone());
        Ok(User { id, user: new_user })
    }

    async fn set_role(&self, id: UserId, role: Role) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.rows.get_mut(&id).map(|u| {
            u.role = role;
            User {
                id,
                user: u.clone(),
            }
        }))
    }
}

#[rocket::async_trait]
impl ElectionStore for MemoryStore {
    async fn elections(&self) -> StoreResult<Vec<Election>> {
        let tables = self.tables.read().await;
        Ok(tables.elections.find(|_| true).map(election).collect())
    }

    async fn election_by_id(&self, id: ElectionId) -> StoreResult<Option<Election>> {
        Ok(self.tables.read().await.elections.get(id).map(election))
    }

    async fn create_election(&self, new_election: NewElection) -> StoreResult<Election> {
        let mut tables = self.tables.write().await;
        let id = tables.elections.insert(new_election.clone());
        Ok(Election {
            id,
            election: new_election,
        })
    }

    async fn update_election(
        &self,
        id: ElectionId,
        patch: ElectionPatch,
    ) -> StoreResult<Option<Election>> {
        let mut tables = self.tables.write().await;
        Ok(tables.elections.rows.get_mut(&id).map(|e| {
            patch.apply(e);
            Election {
                id,
                election: e.clone(),
            }
        }))
    }
}

#[rocket::async_trait]
impl PositionStore for MemoryStore {
    async fn positions_by_election(&self, election_id: ElectionId) -> StoreResult<Vec<Position>> {
        let tables = self.tables.read().await;
        Ok(tables
            .positions
            .find(|p| p.election_id == election_id)
            .map(position)
            .collect())
    }

    async fn position_by_id(&self, id: PositionId) -> StoreResult<Option<Position>> {
        Ok(self.tables.read().await.positions.get(id).map(position))
    }

    async fn create_position(&self, new_position: NewPosition) -> StoreResult<Position> {
        let mut tables = self.tables.write().await;
        let id = tables.positions.insert(new_position.clone());
        Ok(Position {
            id,
            position: new_position,
        })
    }
}

#[rocket::async_trait]
impl CandidateStore for MemoryStore {
    async fn candidates_by_election(
        &self,
        election_id: ElectionId,
    ) -> StoreResult<Vec<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables
            .candidates
            .find(|c| c.election_id == election_id)
            .map(candidate)
            .collect())
    }

    async fn candidate_by_id(&self, id: CandidateId) -> StoreResult<Option<Candidate>> {
        Ok(self.tables.read().await.candidates.get(id).map(candidate))
    }

    async fn candidates_by_position(
        &self,
        position_id: PositionId,
    ) -> StoreResult<Vec<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables
            .candidates
            .find(|c| c.position_id == position_id)
            .map(candidate)
            .collect())
    }

    async fn candidates_by_user(&self, user_id: UserId) -> StoreResult<Vec<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables
            .candidates
            .find(|c| c.user_id == user_id)
            .map(candidate)
            .collect())
    }

    async fn create_candidate(&self, new_candidate: NewCandidate) -> StoreResult<Candidate> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .candidates
            .find(|c| {
                c.user_id == new_candidate.user_id
                    && c.election_id == new_candidate.election_id
                    && c.position_id == new_candidate.position_id
            })
            .next()
            .is_some();
        if exists {
            return Err(StoreError::Duplicate(format!(
                "application by user {} for position {}",
                new_candidate.user_id, new_candidate.position_id
            )));
        }
        let id = tables.candidates.insert(new_candidate.clone());
        Ok(Candidate {
            id,
            candidate: new_candidate,
        })
    }

    async fn update_candidate_status(
        &self,
        id: CandidateId,
        status: CandidateStatus,
    ) -> StoreResult<Option<Candidate>> {
        let mut tables = self.tables.write().await;
        Ok(tables.candidates.rows.get_mut(&id).map(|c| {
            c.status = status;
            Candidate {
                id,
                candidate: c.clone(),
            }
        }))
    }
}

#[rocket::async_trait]
impl VoteStore for MemoryStore {
    async fn record_votes(
        &self,
        user_id: UserId,
        election_id: ElectionId,
        votes: Vec<NewVote>,
    ) -> StoreResult<Vec<Vote>> {
        check_submission(user_id, election_id, &votes)?;
        let mut tables = self.tables.write().await;

        let voted = tables.participations.contains_key(&(user_id, election_id))
            || tables
                .votes
                .find(|v| v.user_id == user_id && v.election_id == election_id)
                .next()
                .is_some();
        if voted {
            return Err(StoreError::AlreadyVoted {
                user_id,
                election_id,
            });
        }

        let current = tables.elections.get(election_id).map(election);
        let chosen: Vec<_> = votes
            .iter()
            .filter_map(|v| tables.candidates.get(v.candidate_id).map(candidate))
            .collect();
        check_still_open(election_id, current.as_ref(), &votes, &chosen)?;

        tables.participations.insert(
            (user_id, election_id),
            Participation::now(user_id, election_id),
        );
        Ok(votes
            .into_iter()
            .map(|v| {
                let id = tables.votes.insert(v.clone());
                Vote { id, vote: v }
            })
            .collect())
    }

    async fn votes_by_election(&self, election_id: ElectionId) -> StoreResult<Vec<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .find(|v| v.election_id == election_id)
            .map(vote)
            .collect())
    }

    async fn has_voted(&self, user_id: UserId, election_id: ElectionId) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.participations.contains_key(&(user_id, election_id))
            || tables
                .votes
                .find(|v| v.user_id == user_id && v.election_id == election_id)
                .next()
                .is_some())
    }
}

#[rocket::async_trait]
impl EligibleVoterStore for MemoryStore {
    async fn eligible_voters_by_election(
        &self,
        election_id: ElectionId,
    ) -> StoreResult<Vec<EligibleVoter>> {
        let tables = self.tables.read().await;
        Ok(tables
            .eligible_voters
            .find(|v| v.election_id == election_id)
            .map(eligible_voter)
            .collect())
    }

    async fn eligible_voter_by_student_id(
        &self,
        student_id: &str,
    ) -> StoreResult<Option<EligibleVoter>> {
        let tables = self.tables.read().await;
        let found = tables
            .eligible_voters
            .find(|v| v.student_id == student_id)
            .next();
        Ok(found.map(eligible_voter))
    }

    async fn eligible_voter_for_election(
        &self,
        election_id: ElectionId,
        student_id: &str,
    ) -> StoreResult<Option<EligibleVoter>> {
        let tables = self.tables.read().await;
        let found = tables
            .eligible_voters
            .find(|v| v.election_id == election_id && v.student_id == student_id)
            .next();
        Ok(found.map(eligible_voter))
    }

    async fn create_eligible_voter(&self, voter: NewEligibleVoter) -> StoreResult<EligibleVoter> {
        let mut tables = self.tables.write().await;
        if tables.roster_contains(&voter) {
            return Err(StoreError::Duplicate(format!(
                "student {} on roster of election {}",
                voter.student_id, voter.election_id
            )));
        }
        let id = tables.eligible_voters.insert(voter.clone());
        Ok(EligibleVoter { id, voter })
    }

    async fn bulk_create_eligible_voters(
        &self,
        voters: Vec<NewEligibleVoter>,
    ) -> StoreResult<Vec<EligibleVoter>> {
        let mut tables = self.tables.write().await;
        let mut created = Vec::new();
        for voter in voters {
            if tables.roster_contains(&voter) {
                continue;
            }
            let id = tables.eligible_voters.insert(voter.clone());
            created.push(EligibleVoter { id, voter });
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::model::common::election::ElectionStatus;

    async fn store_with_election() -> (MemoryStore, Election) {
        let store = MemoryStore::new();
        let election = store
            .create_election(ElectionCore::active_example())
            .await
            .unwrap();
        (store, election)
    }

    #[rocket::async_test]
    async fn ids_start_at_one_and_increase() {
        let store = MemoryStore::new();
        let first = store
            .create_election(ElectionCore::draft_example())
            .await
            .unwrap();
        let second = store
            .create_election(ElectionCore::draft_example())
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        // Tables count independently.
        let position = store
            .create_position(PositionCore::example("President", first.id))
            .await
            .unwrap();
        assert_eq!(position.id, 1);
    }

    #[rocket::async_test]
    async fn users_are_unique() {
        let store = MemoryStore::new();
        store
            .create_user(UserCore::example_voter("S1001"))
            .await
            .unwrap();

        // Same username.
        let result = store.create_user(UserCore::example_voter("S1001")).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));

        // Different username, same student ID.
        let mut clash = UserCore::example_voter("S1001");
        clash.username = "someone-else".to_string();
        let result = store.create_user(clash).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));

        // Admins have no student ID and never clash on it.
        store.create_user(UserCore::example_admin()).await.unwrap();
        let found = store.user_by_student_id("S1001").await.unwrap().unwrap();
        assert_eq!(found.username, "S1001");
    }

    #[rocket::async_test]
    async fn role_can_be_changed() {
        let store = MemoryStore::new();
        let voter = store
            .create_user(UserCore::example_voter("S1001"))
            .await
            .unwrap();
        let promoted = store
            .set_role(voter.id, Role::Candidate)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promoted.role, Role::Candidate);
        assert!(store.set_role(999, Role::Admin).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn elections_can_be_patched() {
        let store = MemoryStore::new();
        let election = store
            .create_election(ElectionCore::draft_example())
            .await
            .unwrap();
        let updated = store
            .update_election(election.id, ElectionPatch::status(ElectionStatus::Active))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ElectionStatus::Active);
        assert_eq!(updated.title, election.title);
        assert!(store
            .update_election(999, ElectionPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[rocket::async_test]
    async fn duplicate_applications_are_rejected() {
        let (store, election) = store_with_election().await;
        let candidate = CandidateCore::example(1, 1, election.id, CandidateStatus::Pending);
        store.create_candidate(candidate.clone()).await.unwrap();
        let result = store.create_candidate(candidate).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));

        // A different position is fine.
        store
            .create_candidate(CandidateCore::example(1, 2, election.id, CandidateStatus::Pending))
            .await
            .unwrap();
        assert_eq!(store.candidates_by_user(1).await.unwrap().len(), 2);
        assert_eq!(store.candidates_by_position(2).await.unwrap().len(), 1);
    }

    fn ballot(user_id: UserId, election_id: ElectionId, picks: &[(PositionId, CandidateId)]) -> Vec<NewVote> {
        picks
            .iter()
            .map(|&(position_id, candidate_id)| VoteCore {
                user_id,
                candidate_id,
                position_id,
                election_id,
                timestamp: Utc::now(),
            })
            .collect()
    }

    /// An active election with two approved candidates for position 1.
    async fn store_with_candidates() -> (MemoryStore, Election, Candidate, Candidate) {
        let (store, election) = store_with_election().await;
        let first = store
            .create_candidate(CandidateCore::example(1, 1, election.id, CandidateStatus::Approved))
            .await
            .unwrap();
        let second = store
            .create_candidate(CandidateCore::example(2, 1, election.id, CandidateStatus::Approved))
            .await
            .unwrap();
        (store, election, first, second)
    }

    #[rocket::async_test]
    async fn votes_are_recorded_once() {
        let (store, election, first, _) = store_with_candidates().await;

        assert!(!store.has_voted(7, election.id).await.unwrap());
        let recorded = store
            .record_votes(7, election.id, ballot(7, election.id, &[(1, first.id)]))
            .await
            .unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(store.has_voted(7, election.id).await.unwrap());

        let again = store
            .record_votes(7, election.id, ballot(7, election.id, &[(1, first.id)]))
            .await;
        assert!(matches!(
            again,
            Err(StoreError::AlreadyVoted { user_id: 7, .. })
        ));
        assert_eq!(store.votes_by_election(election.id).await.unwrap().len(), 1);

        // Other elections are unaffected.
        assert!(!store.has_voted(7, election.id + 1).await.unwrap());
    }

    #[rocket::async_test]
    async fn malformed_batches_are_refused() {
        let (store, election, first, second) = store_with_candidates().await;

        // Two votes for one position.
        let result = store
            .record_votes(
                7,
                election.id,
                ballot(7, election.id, &[(1, first.id), (1, second.id)]),
            )
            .await;
        assert!(matches!(result, Err(StoreError::MalformedSubmission(_))));

        // Rows belonging to someone else.
        let result = store
            .record_votes(7, election.id, ballot(8, election.id, &[(1, first.id)]))
            .await;
        assert!(matches!(result, Err(StoreError::MalformedSubmission(_))));

        // Rows for another election.
        let result = store
            .record_votes(7, election.id, ballot(7, election.id + 1, &[(1, first.id)]))
            .await;
        assert!(matches!(result, Err(StoreError::MalformedSubmission(_))));

        assert!(store.votes_by_election(election.id).await.unwrap().is_empty());
        assert!(!store.has_voted(7, election.id).await.unwrap());
        assert!(!store.has_voted(8, election.id).await.unwrap());
    }

    #[rocket::async_test]
    async fn changes_since_validation_are_caught() {
        let (store, election, first, second) = store_with_candidates().await;

        store
            .update_candidate_status(second.id, CandidateStatus::Rejected)
            .await
            .unwrap();
        let result = store
            .record_votes(7, election.id, ballot(7, election.id, &[(1, second.id)]))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::CandidateNotStanding { candidate_id, .. }) if candidate_id == second.id
        ));

        store
            .update_election(election.id, ElectionPatch::status(ElectionStatus::Completed))
            .await
            .unwrap();
        let result = store
            .record_votes(7, election.id, ballot(7, election.id, &[(1, first.id)]))
            .await;
        assert!(matches!(result, Err(StoreError::ElectionClosed(id)) if id == election.id));

        assert!(store.votes_by_election(election.id).await.unwrap().is_empty());
        assert!(!store.has_voted(7, election.id).await.unwrap());
    }

    #[rocket::async_test]
    async fn rosters_are_per_election() {
        let (store, election) = store_with_election().await;
        store
            .create_eligible_voter(EligibleVoterCore::example("S1001", election.id))
            .await
            .unwrap();
        let result = store
            .create_eligible_voter(EligibleVoterCore::example("S1001", election.id))
            .await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));

        // Same student, another election.
        store
            .create_eligible_voter(EligibleVoterCore::example("S1001", election.id + 1))
            .await
            .unwrap();

        let created = store
            .bulk_create_eligible_voters(vec![
                EligibleVoterCore::example("S1001", election.id),
                EligibleVoterCore::example("S1002", election.id),
                EligibleVoterCore::example("S1002", election.id),
            ])
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].student_id, "S1002");

        let roster = store.eligible_voters_by_election(election.id).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert!(store
            .eligible_voter_for_election(election.id + 1, "S1002")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .eligible_voter_by_student_id("S1002")
            .await
            .unwrap()
            .is_some());
    }
}
