use crate::model::{
    api::ballot::{BallotCandidate, BallotPosition, BallotView},
    common::{ElectionId, UserId},
    db::{Election, User},
    store::Store,
};

use super::Rejection;

/// Assemble the ballot a voter may fill in for an election.
///
/// Checks, in order: the voter has not already voted, the election exists
/// and is active, and the voter is on its roster. On success every position
/// is returned, with only its approved candidates. Read-only.
pub async fn get_ballot(
    store: &dyn Store,
    election_id: ElectionId,
    voter_id: UserId,
) -> Result<BallotView, Rejection> {
    if store.has_voted(voter_id, election_id).await? {
        return Err(Rejection::AlreadyVoted);
    }
    let election = active_election(store, election_id).await?;
    eligible_voter(store, &election, voter_id).await?;

    let mut positions = Vec::new();
    for position in store.positions_by_election(election_id).await? {
        let mut candidates = Vec::new();
        for candidate in store.candidates_by_position(position.id).await? {
            if !candidate.stands_for(position.id, election_id) {
                continue;
            }
            let user = store.user_by_id(candidate.user_id).await?;
            candidates.push(BallotCandidate {
                candidate_id: candidate.id,
                name: display_name(user.as_ref()),
                student_id: user.as_ref().and_then(|u| u.student_id.clone()),
                department: user.as_ref().and_then(|u| u.department.clone()),
                manifesto: candidate.candidate.manifesto,
            });
        }
        positions.push(BallotPosition {
            position_id: position.id,
            title: position.position.title,
            description: position.position.description,
            candidates,
        });
    }

    Ok(BallotView {
        election_id,
        election_title: election.election.title,
        positions,
    })
}

/// Look up an election, requiring it to be open for voting.
pub(super) async fn active_election(
    store: &dyn Store,
    election_id: ElectionId,
) -> Result<Election, Rejection> {
    let election = store
        .election_by_id(election_id)
        .await?
        .ok_or(Rejection::ElectionNotFound)?;
    if !election.is_active() {
        return Err(Rejection::ElectionNotActive);
    }
    Ok(election)
}

/// Look up a voter, requiring them to be on the election's roster.
pub(super) async fn eligible_voter(
    store: &dyn Store,
    election: &Election,
    voter_id: UserId,
) -> Result<User, Rejection> {
    let voter = store
        .user_by_id(voter_id)
        .await?
        .ok_or(Rejection::VoterNotFound)?;
    let student_id = voter.student_id.as_deref().ok_or(Rejection::NotEligible)?;
    store
        .eligible_voter_for_election(election.id, student_id)
        .await?
        .ok_or(Rejection::NotEligible)?;
    Ok(voter)
}

/// How to show a user on a ballot or results sheet.
pub(super) fn display_name(user: Option<&User>) -> String {
    user.and_then(|u| u.name.clone().or_else(|| Some(u.username.clone())))
        .unwrap_or_else(|| "Unknown".to_string())
}
