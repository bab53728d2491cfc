use std::collections::{BTreeSet, HashMap};

use crate::model::{
    api::results::{CandidateResult, ElectionResults, PositionResults},
    common::{election::ElectionStatus, user::Role, CandidateId, ElectionId, UserId},
    db::{Candidate, Election, Position, User, Vote},
    store::Store,
};

use super::{eligibility::display_name, Rejection};

/// `numerator / denominator` as a whole percentage, rounded half up.
/// Zero when the denominator is zero.
pub fn percentage(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ((numerator * 100 + denominator / 2) / denominator) as u32
}

/// May someone with the given role see full results of an election in this state?
pub fn results_visible(role: Role, status: ElectionStatus) -> bool {
    role == Role::Admin || status == ElectionStatus::Completed
}

/// Count an election's votes.
///
/// Every approved candidate of a position is listed, even with no votes,
/// followed by anyone else who received votes. Candidates are then ranked by
/// votes with a stable sort, so ties keep that order. Percentages are rounded
/// independently and need not sum to 100.
pub fn tally(
    election: &Election,
    positions: &[Position],
    candidates: &[Candidate],
    users: &HashMap<UserId, User>,
    votes: &[Vote],
    roster_size: usize,
) -> ElectionResults {
    let candidates_by_id: HashMap<CandidateId, &Candidate> =
        candidates.iter().map(|c| (c.id, c)).collect();

    let position_results = positions
        .iter()
        .map(|position| {
            let mut counts: Vec<(CandidateId, usize)> = candidates
                .iter()
                .filter(|c| c.stands_for(position.id, election.id))
                .map(|c| (c.id, 0))
                .collect();
            counts.sort_by_key(|(id, _)| *id);

            let mut total_votes = 0;
            for vote in votes.iter().filter(|v| v.position_id == position.id) {
                total_votes += 1;
                match counts.iter_mut().find(|(id, _)| *id == vote.candidate_id) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((vote.candidate_id, 1)),
                }
            }
            counts.sort_by(|(_, a), (_, b)| b.cmp(a));

            let results: Vec<_> = counts
                .into_iter()
                .map(|(candidate_id, votes)| {
                    let user = candidates_by_id
                        .get(&candidate_id)
                        .and_then(|c| users.get(&c.user_id));
                    CandidateResult {
                        candidate_id,
                        candidate_name: display_name(user),
                        candidate_student_id: user.and_then(|u| u.student_id.clone()),
                        votes,
                        percentage: percentage(votes, total_votes),
                    }
                })
                .collect();

            PositionResults {
                position_id: position.id,
                position_title: position.title.clone(),
                total_votes,
                winner: results
                    .first()
                    .filter(|_| total_votes > 0)
                    .map(|r| r.candidate_id),
                results,
            }
        })
        .collect();

    let voters: BTreeSet<UserId> = votes.iter().map(|v| v.user_id).collect();
    ElectionResults {
        election_id: election.id,
        election_title: election.title.clone(),
        total_eligible_voters: roster_size,
        total_votes_cast: voters.len(),
        voter_turnout: percentage(voters.len(), roster_size),
        position_results,
    }
}

/// Load everything needed and tally an election.
///
/// Nothing is cached, and the reads are not isolated from concurrent votes.
pub async fn compute_results(
    store: &dyn Store,
    election_id: ElectionId,
) -> Result<ElectionResults, Rejection> {
    let election = store
        .election_by_id(election_id)
        .await?
        .ok_or(Rejection::ElectionNotFound)?;
    let positions = store.positions_by_election(election_id).await?;
    let mut candidates = store.candidates_by_election(election_id).await?;
    let votes = store.votes_by_election(election_id).await?;
    let roster_size = store.eligible_voters_by_election(election_id).await?.len();

    // Votes may reference candidates filed under another election; fetch them by ID.
    let known: BTreeSet<CandidateId> = candidates.iter().map(|c| c.id).collect();
    let missing: BTreeSet<CandidateId> = votes
        .iter()
        .map(|v| v.candidate_id)
        .filter(|id| !known.contains(id))
        .collect();
    for id in missing {
        if let Some(candidate) = store.candidate_by_id(id).await? {
            candidates.push(candidate);
        }
    }

    let mut users = HashMap::new();
    for candidate in &candidates {
        if users.contains_key(&candidate.user_id) {
            continue;
        }
        if let Some(user) = store.user_by_id(candidate.user_id).await? {
            users.insert(user.id, user);
        }
    }

    Ok(tally(
        &election,
        &positions,
        &candidates,
        &users,
        &votes,
        roster_size,
    ))
}
