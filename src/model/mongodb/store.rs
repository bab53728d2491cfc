use std::time::Duration;

use mongodb::{
    bson::{doc, to_document, Document},
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Database,
};
use rocket::{futures::TryStreamExt, tokio::time::sleep};
use serde::{de::DeserializeOwned, Serialize};

use crate::model::{
    common::{
        candidate::CandidateStatus, user::Role, CandidateId, ElectionId, PositionId, UserId,
    },
    db::{
        Candidate, Election, ElectionPatch, EligibleVoter, NewCandidate, NewElection,
        NewEligibleVoter, NewPosition, NewUser, NewVote, Participation, Position, User, Vote,
    },
    store::{
        check_still_open, check_submission, CandidateStore, ElectionStore, EligibleVoterStore,
        PositionStore, StoreError, StoreResult, UserStore, VoteStore,
    },
};

use super::{
    collection::{ensure_indexes_exist, u32_id_filter, Coll, MongoCollection},
    counter::{ensure_counters_exist, Counter},
    errors::is_duplicate_key_error,
};

/// How many times to retry a vote transaction that hit a transient error.
const MAX_TRANSACTION_RETRIES: u32 = 4;

/// How many times to retry a commit whose outcome is unknown.
const MAX_COMMIT_RETRIES: u32 = 3;

/// Pause before the first retry of a vote transaction; later retries wait longer.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Counts the retries an operation has used against a fixed allowance.
#[derive(Debug)]
struct Retries {
    max: u32,
    used: u32,
}

impl Retries {
    fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    /// Use up a retry, returning whether one was left.
    fn take(&mut self) -> bool {
        if self.used == self.max {
            return false;
        }
        self.used += 1;
        true
    }

    fn used(&self) -> u32 {
        self.used
    }
}

/// A durable store backed by MongoDB.
///
/// Vote submissions use multi-document transactions, so the deployment
/// must be a replica set (a single-node one is fine).
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect to the given database, creating any indexes and counters it lacks.
    pub async fn connect(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        ensure_counters_exist(&db).await?;
        Ok(Self { client, db })
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    async fn next_id<T: MongoCollection>(&self) -> StoreResult<u32> {
        Counter::next(&self.coll(), T::NAME).await
    }

    /// Find all matching documents, in ID order.
    async fn find_all<T>(&self, filter: Document) -> StoreResult<Vec<T>>
    where
        T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
    {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let found = self
            .coll::<T>()
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(found)
    }

    async fn find_one<T>(&self, filter: Document) -> StoreResult<Option<T>>
    where
        T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
    {
        Ok(self.coll::<T>().find_one(filter, None).await?)
    }

    /// Insert a document, reporting unique index violations as [`StoreError::Duplicate`].
    async fn insert<T>(&self, doc: &T, what: impl FnOnce() -> String) -> StoreResult<()>
    where
        T: MongoCollection + Serialize + Send + Sync,
    {
        match self.coll::<T>().insert_one(doc, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => Err(StoreError::Duplicate(what())),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a `$set` to the document with the given ID, returning the updated document.
    async fn set_fields<T>(&self, id: u32, fields: Document) -> StoreResult<Option<T>>
    where
        T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
    {
        if fields.is_empty() {
            return self.find_one(u32_id_filter(id)).await;
        }
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .coll::<T>()
            .find_one_and_update(u32_id_filter(id), doc! {"$set": fields}, options)
            .await?)
    }

    /// One attempt at recording a submission inside a transaction.
    async fn try_record_votes(
        &self,
        user_id: UserId,
        election_id: ElectionId,
        votes: &[NewVote],
    ) -> StoreResult<Vec<Vote>> {
        // IDs are reserved outside the transaction; an aborted attempt just leaves a gap.
        let first_id = if votes.is_empty() {
            0
        } else {
            Counter::reserve(&self.coll(), Vote::NAME, votes.len() as u32).await?
        };
        let recorded: Vec<Vote> = votes
            .iter()
            .zip(first_id..)
            .map(|(vote, id)| Vote {
                id,
                vote: vote.clone(),
            })
            .collect();

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let already_voted = StoreError::AlreadyVoted {
            user_id,
            election_id,
        };

        // The participation marker goes first: its unique index makes this
        // the insert-if-absent guard against concurrent submissions.
        let marker = Participation::now(user_id, election_id);
        if let Err(e) = self
            .coll::<Participation>()
            .insert_one_with_session(&marker, None, &mut session)
            .await
        {
            session.abort_transaction().await?;
            return Err(if is_duplicate_key_error(&e) {
                already_voted
            } else {
                e.into()
            });
        }

        // Votes recorded before markers existed also count.
        let existing = self
            .coll::<Vote>()
            .count_documents_with_session(
                doc! {"user_id": i64::from(user_id), "election_id": i64::from(election_id)},
                None,
                &mut session,
            )
            .await?;
        if existing > 0 {
            session.abort_transaction().await?;
            return Err(already_voted);
        }

        // The caller validated these already; re-check them as late as possible.
        let election = self
            .coll::<Election>()
            .find_one_with_session(u32_id_filter(election_id), None, &mut session)
            .await?;
        let candidate_ids: Vec<i64> = votes.iter().map(|v| i64::from(v.candidate_id)).collect();
        let mut cursor = self
            .coll::<Candidate>()
            .find_with_session(doc! {"_id": {"$in": candidate_ids}}, None, &mut session)
            .await?;
        let candidates: Vec<Candidate> = cursor.stream(&mut session).try_collect().await?;
        if let Err(e) = check_still_open(election_id, election.as_ref(), votes, &candidates) {
            session.abort_transaction().await?;
            return Err(e);
        }

        if !recorded.is_empty() {
            if let Err(e) = self
                .coll::<Vote>()
                .insert_many_with_session(&recorded, None, &mut session)
                .await
            {
                session.abort_transaction().await?;
                return Err(if is_duplicate_key_error(&e) {
                    already_voted
                } else {
                    e.into()
                });
            }
        }

        commit(&mut session).await?;
        Ok(recorded)
    }
}

/// Commit a transaction, retrying a bounded number of times if the outcome is unknown.
async fn commit(session: &mut ClientSession) -> Result<(), DbError> {
    let mut retries = Retries::new(MAX_COMMIT_RETRIES);
    loop {
        match session.commit_transaction().await {
            Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) && retries.take() => {
                warn!(
                    "Transaction commit result unknown, retrying ({}/{MAX_COMMIT_RETRIES})",
                    retries.used()
                );
            }
            result => return result,
        }
    }
}

fn user_id_filter(user_id: UserId, election_id: ElectionId) -> Document {
    doc! {"user_id": i64::from(user_id), "election_id": i64::from(election_id)}
}

#[rocket::async_trait]
impl UserStore for MongoStore {
    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        self.find_one(u32_id_filter(id)).await
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.find_one(doc! {"username": username}).await
    }

    async fn user_by_student_id(&self, student_id: &str) -> StoreResult<Option<User>> {
        self.find_one(doc! {"student_id": student_id}).await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let user = User {
            id: self.next_id::<User>().await?,
            user,
        };
        self.insert(&user, || format!("username or student ID for {}", user.username))
            .await?;
        Ok(user)
    }

    async fn set_role(&self, id: UserId, role: Role) -> StoreResult<Option<User>> {
        self.set_fields(id, doc! {"role": role}).await
    }
}

#[rocket::async_trait]
impl ElectionStore for MongoStore {
    async fn elections(&self) -> StoreResult<Vec<Election>> {
        self.find_all(doc! {}).await
    }

    async fn election_by_id(&self, id: ElectionId) -> StoreResult<Option<Election>> {
        self.find_one(u32_id_filter(id)).await
    }

    async fn create_election(&self, election: NewElection) -> StoreResult<Election> {
        let election = Election {
            id: self.next_id::<Election>().await?,
            election,
        };
        self.insert(&election, || format!("election {}", election.id))
            .await?;
        Ok(election)
    }

    async fn update_election(
        &self,
        id: ElectionId,
        patch: ElectionPatch,
    ) -> StoreResult<Option<Election>> {
        let fields = to_document(&patch).map_err(DbError::from)?;
        self.set_fields(id, fields).await
    }
}

#[rocket::async_trait]
impl PositionStore for MongoStore {
    async fn positions_by_election(&self, election_id: ElectionId) -> StoreResult<Vec<Position>> {
        self.find_all(doc! {"election_id": i64::from(election_id)})
            .await
    }

    async fn position_by_id(&self, id: PositionId) -> StoreResult<Option<Position>> {
        self.find_one(u32_id_filter(id)).await
    }

    async fn create_position(&self, position: NewPosition) -> StoreResult<Position> {
        let position = Position {
            id: self.next_id::<Position>().await?,
            position,
        };
        self.insert(&position, || format!("position {}", position.id))
            .await?;
        Ok(position)
    }
}

#[rocket::async_trait]
impl CandidateStore for MongoStore {
    async fn candidates_by_election(
        &self,
        election_id: ElectionId,
    ) -> StoreResult<Vec<Candidate>> {
        self.find_all(doc! {"election_id": i64::from(election_id)})
            .await
    }

    async fn candidate_by_id(&self, id: CandidateId) -> StoreResult<Option<Candidate>> {
        self.find_one(u32_id_filter(id)).await
    }

    async fn candidates_by_position(
        &self,
        position_id: PositionId,
    ) -> StoreResult<Vec<Candidate>> {
        self.find_all(doc! {"position_id": i64::from(position_id)})
            .await
    }

    async fn candidates_by_user(&self, user_id: UserId) -> StoreResult<Vec<Candidate>> {
        self.find_all(doc! {"user_id": i64::from(user_id)}).await
    }

    async fn create_candidate(&self, candidate: NewCandidate) -> StoreResult<Candidate> {
        let candidate = Candidate {
            id: self.next_id::<Candidate>().await?,
            candidate,
        };
        self.insert(&candidate, || {
            format!(
                "application by user {} for position {}",
                candidate.user_id, candidate.position_id
            )
        })
        .await?;
        Ok(candidate)
    }

    async fn update_candidate_status(
        &self,
        id: CandidateId,
        status: CandidateStatus,
    ) -> StoreResult<Option<Candidate>> {
        self.set_fields(id, doc! {"status": status}).await
    }
}

#[rocket::async_trait]
impl VoteStore for MongoStore {
    async fn record_votes(
        &self,
        user_id: UserId,
        election_id: ElectionId,
        votes: Vec<NewVote>,
    ) -> StoreResult<Vec<Vote>> {
        check_submission(user_id, election_id, &votes)?;
        let mut retries = Retries::new(MAX_TRANSACTION_RETRIES);
        loop {
            match self.try_record_votes(user_id, election_id, &votes).await {
                Err(StoreError::Db(e))
                    if e.contains_label(TRANSIENT_TRANSACTION_ERROR) && retries.take() =>
                {
                    warn!(
                        "Transient error recording votes, retrying ({}/{MAX_TRANSACTION_RETRIES}): {e}",
                        retries.used()
                    );
                    sleep(RETRY_BACKOFF * retries.used()).await;
                }
                result => return result,
            }
        }
    }

    async fn votes_by_election(&self, election_id: ElectionId) -> StoreResult<Vec<Vote>> {
        self.find_all(doc! {"election_id": i64::from(election_id)})
            .await
    }

    async fn has_voted(&self, user_id: UserId, election_id: ElectionId) -> StoreResult<bool> {
        let filter = user_id_filter(user_id, election_id);
        let markers = self
            .coll::<Participation>()
            .count_documents(filter.clone(), None)
            .await?;
        if markers > 0 {
            return Ok(true);
        }
        let votes = self.coll::<Vote>().count_documents(filter, None).await?;
        Ok(votes > 0)
    }
}

#[rocket::async_trait]
impl EligibleVoterStore for MongoStore {
    async fn eligible_voters_by_election(
        &self,
        election_id: ElectionId,
    ) -> StoreResult<Vec<EligibleVoter>> {
        self.find_all(doc! {"election_id": i64::from(election_id)})
            .await
    }

    async fn eligible_voter_by_student_id(
        &self,
        student_id: &str,
    ) -> StoreResult<Option<EligibleVoter>> {
        self.find_one(doc! {"student_id": student_id}).await
    }

    async fn eligible_voter_for_election(
        &self,
        election_id: ElectionId,
        student_id: &str,
    ) -> StoreResult<Option<EligibleVoter>> {
        self.find_one(doc! {"election_id": i64::from(election_id), "student_id": student_id})
            .await
    }

    async fn create_eligible_voter(&self, voter: NewEligibleVoter) -> StoreResult<EligibleVoter> {
        let voter = EligibleVoter {
            id: self.next_id::<EligibleVoter>().await?,
            voter,
        };
        self.insert(&voter, || {
            format!(
                "student {} on roster of election {}",
                voter.student_id, voter.election_id
            )
        })
        .await?;
        Ok(voter)
    }

    async fn bulk_create_eligible_voters(
        &self,
        voters: Vec<NewEligibleVoter>,
    ) -> StoreResult<Vec<EligibleVoter>> {
        let mut created = Vec::new();
        for voter in voters {
            match self.create_eligible_voter(voter).await {
                Ok(voter) => created.push(voter),
                Err(StoreError::Duplicate(what)) => debug!("Skipping duplicate {what}"),
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }
}
