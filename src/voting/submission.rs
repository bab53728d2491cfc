use std::collections::BTreeSet;

use chrono::Utc;

use crate::model::{
    api::ballot::{Receipt, Selection},
    common::{ElectionId, UserId},
    db::NewVote,
    store::{Store, StoreError},
};

use super::{
    eligibility::{active_election, eligible_voter},
    Rejection,
};

/// Record a voter's complete submission for an election.
///
/// The whole batch is validated before anything is written, and the write
/// itself is atomic, so a rejected submission leaves no trace. A second
/// submission by the same voter is always rejected, including when two race.
pub async fn submit_vote(
    store: &dyn Store,
    election_id: ElectionId,
    voter_id: UserId,
    selections: &[Selection],
) -> Result<Receipt, Rejection> {
    let result = try_submit(store, election_id, voter_id, selections).await;
    match result {
        Ok(ref receipt) => info!(
            "Recorded {} votes from user {voter_id} in election {election_id}",
            receipt.votes_recorded
        ),
        Err(ref e) => {
            debug!("Rejected submission from user {voter_id} in election {election_id}: {e}")
        }
    }
    result
}

async fn try_submit(
    store: &dyn Store,
    election_id: ElectionId,
    voter_id: UserId,
    selections: &[Selection],
) -> Result<Receipt, Rejection> {
    if store.has_voted(voter_id, election_id).await? {
        return Err(Rejection::AlreadyVoted);
    }
    if selections.is_empty() {
        return Err(Rejection::EmptySubmission);
    }
    let mut seen = BTreeSet::new();
    for selection in selections {
        if !seen.insert(selection.position_id) {
            return Err(Rejection::DuplicatePositionSelection(
                selection.position_id,
            ));
        }
    }

    let election = active_election(store, election_id).await?;
    eligible_voter(store, &election, voter_id).await?;

    for selection in selections {
        let valid = store
            .candidate_by_id(selection.candidate_id)
            .await?
            .map_or(false, |c| {
                c.stands_for(selection.position_id, election_id)
            });
        if !valid {
            return Err(Rejection::InvalidSelection {
                position_id: selection.position_id,
                candidate_id: selection.candidate_id,
            });
        }
    }

    let submitted_at = Utc::now();
    let votes = selections
        .iter()
        .map(|selection| NewVote {
            user_id: voter_id,
            candidate_id: selection.candidate_id,
            position_id: selection.position_id,
            election_id,
            timestamp: submitted_at,
        })
        .collect();

    match store.record_votes(voter_id, election_id, votes).await {
        Ok(recorded) => Ok(Receipt {
            election_id,
            votes_recorded: recorded.len(),
            submitted_at,
        }),
        // Lost a race with a concurrent submission.
        Err(StoreError::AlreadyVoted { .. }) => Err(Rejection::AlreadyVoted),
        // Lost a race with an admin closing the election or withdrawing a candidate.
        Err(StoreError::ElectionClosed(_)) => Err(Rejection::ElectionNotActive),
        Err(StoreError::CandidateNotStanding {
            position_id,
            candidate_id,
        }) => Err(Rejection::InvalidSelection {
            position_id,
            candidate_id,
        }),
        Err(e) => Err(e.into()),
    }
}
