use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AnyUser, AuthToken, Voter},
            ballot::{BallotView, Receipt, VoteSubmission},
            election::ElectionSummary,
            position::PositionDesc,
            results::ElectionResults,
        },
        common::ElectionId,
        store::DynStore,
    },
    voting,
};

pub fn routes() -> Vec<Route> {
    routes![
        active_elections,
        election_positions,
        get_ballot,
        submit_vote,
        get_results
    ]
}

#[get("/api/elections/active")]
async fn active_elections(
    _token: AuthToken<AnyUser>,
    store: &State<DynStore>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let elections = store.elections().await?;
    Ok(Json(
        elections
            .into_iter()
            .filter(|e| e.is_active())
            .map(Into::into)
            .collect(),
    ))
}

#[get("/api/elections/<election_id>/positions")]
async fn election_positions(
    _token: AuthToken<AnyUser>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<Vec<PositionDesc>>> {
    let positions = store.positions_by_election(election_id).await?;
    Ok(Json(positions.into_iter().map(Into::into).collect()))
}

#[get("/api/elections/<election_id>/ballot")]
async fn get_ballot(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<BallotView>> {
    let ballot = voting::get_ballot(store.inner().as_ref(), election_id, token.id).await?;
    Ok(Json(ballot))
}

#[post("/api/vote", data = "<submission>", format = "json")]
async fn submit_vote(
    token: AuthToken<Voter>,
    submission: Json<VoteSubmission>,
    store: &State<DynStore>,
) -> Result<Json<Receipt>> {
    let receipt = voting::submit_vote(
        store.inner().as_ref(),
        submission.election_id,
        token.id,
        &submission.votes,
    )
    .await?;
    Ok(Json(receipt))
}

#[get("/api/elections/<election_id>/results")]
async fn get_results(
    token: AuthToken<AnyUser>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<ElectionResults>> {
    let election = store
        .election_by_id(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    if !voting::results_visible(token.role, election.status) {
        return Err(Error::forbidden("Results are not available yet"));
    }

    let results = voting::compute_results(store.inner().as_ref(), election_id).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::json,
    };

    use super::*;
    use crate::api::helpers::login_voter;
    use crate::model::{
        api::ballot::Selection,
        common::election::ElectionStatus,
        db::{ElectionCore, ElectionPatch},
    };
    use crate::voting::fixtures::Fixture;

    fn vote_for(election_id: ElectionId, selections: &[Selection]) -> String {
        json!(VoteSubmission {
            election_id,
            votes: selections.to_vec(),
        })
        .to_string()
    }

    #[backend_test]
    async fn ballot_then_vote(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;
        login_voter(&client, "S1000").await;

        let response = client
            .get(uri!(get_ballot(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let ballot: BallotView = response.into_json().await.unwrap();
        assert_eq!(ballot.positions.len(), 2);
        let president = &ballot.positions[0];
        let ids: Vec<_> = president.candidates.iter().map(|c| c.candidate_id).collect();
        assert_eq!(ids, vec![fx.alice.id, fx.bob.id]);

        let response = client
            .post(uri!(submit_vote))
            .header(ContentType::JSON)
            .body(vote_for(
                fx.election.id,
                &[
                    Selection {
                        position_id: fx.president.id,
                        candidate_id: fx.alice.id,
                    },
                    Selection {
                        position_id: fx.treasurer.id,
                        candidate_id: fx.dave.id,
                    },
                ],
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let receipt: Receipt = response.into_json().await.unwrap();
        assert_eq!(receipt.votes_recorded, 2);

        // Locked out afterwards.
        let response = client
            .get(uri!(get_ballot(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let response = client
            .post(uri!(submit_vote))
            .header(ContentType::JSON)
            .body(vote_for(
                fx.election.id,
                &[Selection {
                    position_id: fx.president.id,
                    candidate_id: fx.bob.id,
                }],
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
        assert_eq!(fx.store.votes_by_election(fx.election.id).await.unwrap().len(), 2);
    }

    #[backend_test]
    async fn invalid_submissions_write_nothing(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;
        login_voter(&client, "S1001").await;

        // Carol is still pending.
        let response = client
            .post(uri!(submit_vote))
            .header(ContentType::JSON)
            .body(vote_for(
                fx.election.id,
                &[
                    Selection {
                        position_id: fx.treasurer.id,
                        candidate_id: fx.dave.id,
                    },
                    Selection {
                        position_id: fx.president.id,
                        candidate_id: fx.carol.id,
                    },
                ],
            ))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!(submit_vote))
            .header(ContentType::JSON)
            .body(vote_for(
                fx.election.id,
                &[
                    Selection {
                        position_id: fx.president.id,
                        candidate_id: fx.alice.id,
                    },
                    Selection {
                        position_id: fx.president.id,
                        candidate_id: fx.bob.id,
                    },
                ],
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let response = client
            .post(uri!(submit_vote))
            .header(ContentType::JSON)
            .body(vote_for(fx.election.id, &[]))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        assert!(fx.store.votes_by_election(fx.election.id).await.unwrap().is_empty());
        assert!(!fx.store.has_voted(fx.voters[1].id, fx.election.id).await.unwrap());
    }

    #[backend_test]
    async fn inactive_elections(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store.clone()).await;
        let draft = store
            .create_election(ElectionCore::draft_example())
            .await
            .unwrap();
        login_voter(&client, "S1000").await;

        let elections: Vec<ElectionSummary> = client
            .get(uri!(active_elections))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(elections.len(), 1);
        assert_eq!(elections[0].id, fx.election.id);

        let response = client.get(uri!(get_ballot(draft.id))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client.get(uri!(get_ballot(9999))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let positions: Vec<PositionDesc> = client
            .get(uri!(election_positions(fx.election.id)))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(positions.len(), 2);
    }

    #[backend_test]
    async fn results_hidden_until_completed(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;
        login_voter(&client, "S1000").await;
        client
            .post(uri!(submit_vote))
            .header(ContentType::JSON)
            .body(vote_for(
                fx.election.id,
                &[Selection {
                    position_id: fx.president.id,
                    candidate_id: fx.alice.id,
                }],
            ))
            .dispatch()
            .await;

        let response = client
            .get(uri!(get_results(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        fx.store
            .update_election(fx.election.id, ElectionPatch::status(ElectionStatus::Completed))
            .await
            .unwrap();

        let response = client
            .get(uri!(get_results(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votes_cast, 1);
        assert_eq!(results.position_results[0].winner, Some(fx.alice.id));
        assert_eq!(results.position_results[0].results[0].percentage, 100);
    }

    #[backend_test]
    async fn students_only(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;

        let response = client
            .get(uri!(get_ballot(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client.get(uri!(active_elections)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(admin)]
    async fn admins_cannot_vote(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;

        let response = client
            .get(uri!(get_ballot(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        // But may always see results.
        let response = client
            .get(uri!(get_results(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }
}
