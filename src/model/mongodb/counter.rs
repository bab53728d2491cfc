use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
    Database,
};
use serde::{Deserialize, Serialize};

use crate::model::store::{StoreError, StoreResult};

use super::collection::{Coll, COUNTED_COLLECTIONS};

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    /// Name of the collection this counter hands out IDs for.
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` starting at the given value.
    pub fn new(id: impl Into<String>, start: u32) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> StoreResult<u32> {
        Self::reserve(counters, id, 1).await
    }

    /// Atomically reserve `count` consecutive values, returning the first.
    pub async fn reserve(counters: &Coll<Counter>, id: &str, count: u32) -> StoreResult<u32> {
        let update = doc! {
            "$inc": { "next": i64::from(count) }
        };
        let options: FindOneAndUpdateOptions = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| StoreError::MissingCounter(id.to_string()))?;
        Ok(counter.next)
    }
}

/// Ensure a counter exists for every collection with integer IDs.
/// Existing counters are left alone.
///
/// This operation is idempotent.
pub async fn ensure_counters_exist(db: &Database) -> Result<(), DbError> {
    let counters = Coll::<Counter>::from_db(db);
    let upsert = UpdateOptions::builder().upsert(true).build();
    for name in COUNTED_COLLECTIONS {
        counters
            .update_one(
                doc! { "_id": name },
                doc! { "$setOnInsert": { "next": 1_i64 } },
                upsert.clone(),
            )
            .await?;
    }
    Ok(())
}
