use std::ops::Deref;

use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::IndexOptions,
    Collection, Database, IndexModel,
};

use crate::model::db::{Candidate, Election, EligibleVoter, Participation, Position, User, Vote};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A filter matching the document with the given integer ID.
pub fn u32_id_filter(id: u32) -> Document {
    doc! { "_id": i64::from(id) }
}

pub const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}

pub const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}

pub const POSITIONS: &str = "positions";
impl MongoCollection for Position {
    const NAME: &'static str = POSITIONS;
}

pub const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}

pub const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}

pub const ELIGIBLE_VOTERS: &str = "eligible_voters";
impl MongoCollection for EligibleVoter {
    const NAME: &'static str = ELIGIBLE_VOTERS;
}

pub const PARTICIPATIONS: &str = "participations";
impl MongoCollection for Participation {
    const NAME: &'static str = PARTICIPATIONS;
}

pub const COUNTERS: &str = "counters";
impl MongoCollection for Counter {
    const NAME: &'static str = COUNTERS;
}

/// Collections whose IDs come from a counter.
pub const COUNTED_COLLECTIONS: [&str; 6] =
    [USERS, ELECTIONS, POSITIONS, CANDIDATES, VOTES, ELIGIBLE_VOTERS];

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection.
    let username_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    let student_id_index = IndexModel::builder()
        .keys(doc! {"student_id": 1})
        .options(IndexOptions::builder().unique(true).sparse(true).build())
        .build();
    Coll::<User>::from_db(db)
        .create_indexes([username_index, student_id_index], None)
        .await?;

    // Roster collection: eligibility is per election.
    let roster_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "student_id": 1})
        .options(unique.clone())
        .build();
    Coll::<EligibleVoter>::from_db(db)
        .create_index(roster_index, None)
        .await?;

    // Candidate collection.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "election_id": 1, "position_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // Vote collection.
    let vote_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "election_id": 1, "position_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Participation collection: the insert-if-absent guard for submissions.
    let participation_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "election_id": 1})
        .options(unique)
        .build();
    Coll::<Participation>::from_db(db)
        .create_index(participation_index, None)
        .await?;

    Ok(())
}
