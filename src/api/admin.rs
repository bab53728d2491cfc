use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            candidate::{CandidateDesc, CandidateDetails, StatusUpdate},
            election::{ElectionDetails, ElectionSpec, ElectionSummary, ElectionUpdate},
            position::{PositionDesc, PositionSpec},
            results::ElectionResults,
            voter::{EligibleVoterDesc, EligibleVoterSpec, ImportSummary, RosterUpload},
        },
        common::{election::ElectionStatus, CandidateId, ElectionId},
        db::{Election, ElectionPatch},
        store::{DynStore, Store, StoreError},
    },
    roster::{parse_roster, RosterError},
    voting,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_elections,
        create_election,
        get_election,
        update_election,
        publish_election,
        complete_election,
        create_position,
        get_positions,
        get_candidates,
        update_candidate_status,
        get_voters,
        create_voter,
        upload_voters,
        get_results,
    ]
}

/// Query string selecting an election.
#[derive(Debug, FromForm)]
pub struct ElectionQuery {
    #[field(name = "electionId")]
    election_id: Option<ElectionId>,
}

impl ElectionQuery {
    fn required(&self) -> Result<ElectionId> {
        self.election_id
            .ok_or_else(|| Error::bad_request("Election ID is required"))
    }
}

async fn existing_election(store: &dyn Store, election_id: ElectionId) -> Result<Election> {
    store
        .election_by_id(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// Move an election one step along its lifecycle.
async fn transition(
    store: &dyn Store,
    election_id: ElectionId,
    next: ElectionStatus,
) -> Result<ElectionSummary> {
    let election = existing_election(store, election_id).await?;
    if election.status == next || !election.status.can_become(next) {
        return Err(Error::bad_request(format!(
            "Cannot move election {election_id} from {} to {next}",
            election.status
        )));
    }

    let updated = store
        .update_election(election_id, ElectionPatch::status(next))
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    info!("Election {election_id} is now {next}");
    Ok(updated.into())
}

#[get("/api/admin/elections")]
async fn get_elections(
    _token: AuthToken<Admin>,
    store: &State<DynStore>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let elections = store.elections().await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[post("/api/admin/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    store: &State<DynStore>,
) -> Result<(Status, Json<ElectionSummary>)> {
    spec.validate().map_err(Error::bad_request)?;
    let election = store.create_election(spec.into_inner().into()).await?;
    info!("Created election {} ({})", election.id, election.title);
    Ok((Status::Created, Json(election.into())))
}

#[get("/api/admin/elections/<election_id>")]
async fn get_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<ElectionDetails>> {
    store
        .election_with_details(election_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

#[patch("/api/admin/elections/<election_id>", data = "<update>", format = "json")]
async fn update_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    update: Json<ElectionUpdate>,
    store: &State<DynStore>,
) -> Result<Json<ElectionSummary>> {
    let election = existing_election(store.inner().as_ref(), election_id).await?;
    update.validate_against(&election).map_err(Error::bad_request)?;

    let updated = store
        .update_election(election_id, update.into_inner().into())
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    Ok(Json(updated.into()))
}

#[post("/api/admin/elections/<election_id>/publish")]
async fn publish_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<ElectionSummary>> {
    transition(store.inner().as_ref(), election_id, ElectionStatus::Active)
        .await
        .map(Json)
}

#[post("/api/admin/elections/<election_id>/complete")]
async fn complete_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<ElectionSummary>> {
    transition(store.inner().as_ref(), election_id, ElectionStatus::Completed)
        .await
        .map(Json)
}

#[post("/api/admin/positions", data = "<spec>", format = "json")]
async fn create_position(
    _token: AuthToken<Admin>,
    spec: Json<PositionSpec>,
    store: &State<DynStore>,
) -> Result<(Status, Json<PositionDesc>)> {
    if spec.title.trim().is_empty() {
        return Err(Error::bad_request("Position title is required"));
    }
    existing_election(store.inner().as_ref(), spec.election_id).await?;

    let position = store.create_position(spec.into_inner().into()).await?;
    Ok((Status::Created, Json(position.into())))
}

#[get("/api/admin/elections/<election_id>/positions")]
async fn get_positions(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<Vec<PositionDesc>>> {
    let positions = store.positions_by_election(election_id).await?;
    Ok(Json(positions.into_iter().map(Into::into).collect()))
}

#[get("/api/admin/candidates?<query..>")]
async fn get_candidates(
    _token: AuthToken<Admin>,
    query: ElectionQuery,
    store: &State<DynStore>,
) -> Result<Json<Vec<CandidateDetails>>> {
    let election_id = query.required()?;

    let mut details = Vec::new();
    for candidate in store.candidates_by_election(election_id).await? {
        details.push(store.candidate_with_details(candidate).await?);
    }
    Ok(Json(details))
}

#[patch("/api/admin/candidates/<candidate_id>/status", data = "<update>", format = "json")]
async fn update_candidate_status(
    _token: AuthToken<Admin>,
    candidate_id: CandidateId,
    update: Json<StatusUpdate>,
    store: &State<DynStore>,
) -> Result<Json<CandidateDesc>> {
    let candidate = store
        .update_candidate_status(candidate_id, update.status)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;
    info!("Candidate {candidate_id} is now {:?}", update.status);
    Ok(Json(candidate.into()))
}

#[get("/api/admin/voters?<query..>")]
async fn get_voters(
    _token: AuthToken<Admin>,
    query: ElectionQuery,
    store: &State<DynStore>,
) -> Result<Json<Vec<EligibleVoterDesc>>> {
    let election_id = query.required()?;

    let mut voters = Vec::new();
    for voter in store.eligible_voters_by_election(election_id).await? {
        let has_voted = match store.user_by_student_id(&voter.student_id).await? {
            Some(user) => store.has_voted(user.id, election_id).await?,
            None => false,
        };
        voters.push(EligibleVoterDesc::new(voter, has_voted));
    }
    Ok(Json(voters))
}

#[post("/api/admin/voters", data = "<spec>", format = "json")]
async fn create_voter(
    _token: AuthToken<Admin>,
    spec: Json<EligibleVoterSpec>,
    store: &State<DynStore>,
) -> Result<(Status, Json<EligibleVoterDesc>)> {
    spec.validate().map_err(Error::bad_request)?;
    existing_election(store.inner().as_ref(), spec.election_id).await?;

    let voter = store
        .create_eligible_voter(spec.into_inner().into())
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => {
                Error::conflict("Student is already eligible for this election")
            }
            e => e.into(),
        })?;
    Ok((Status::Created, Json(EligibleVoterDesc::new(voter, false))))
}

#[post("/api/admin/voters/upload", data = "<upload>", format = "json")]
async fn upload_voters(
    _token: AuthToken<Admin>,
    upload: Json<RosterUpload>,
    store: &State<DynStore>,
) -> Result<(Status, Json<ImportSummary>)> {
    existing_election(store.inner().as_ref(), upload.election_id).await?;

    let voters = parse_roster(upload.csv_data.as_bytes(), upload.election_id)
        .map_err(|e: RosterError| Error::bad_request(e.to_string()))?;
    let parsed = voters.len();
    let created = store.bulk_create_eligible_voters(voters).await?;

    info!(
        "Imported {} of {parsed} roster rows into election {}",
        created.len(),
        upload.election_id
    );
    Ok((Status::Created, Json(ImportSummary::new(created.len()))))
}

#[get("/api/admin/results/<election_id>")]
async fn get_results(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    store: &State<DynStore>,
) -> Result<Json<ElectionResults>> {
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
    use crate::model::{
        api::ballot::Selection,
        common::candidate::CandidateStatus,
        db::{ElectionCore, EligibleVoterCore, PositionCore},
    };
    use crate::voting::fixtures::{Fixture, ROSTER_SIZE};

    #[backend_test(admin)]
    async fn election_lifecycle(client: Client) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let election: ElectionSummary = response.into_json().await.unwrap();
        assert_eq!(election.status, ElectionStatus::Draft);

        // Cannot skip straight to completed.
        let response = client
            .post(uri!(complete_election(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!(publish_election(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let published: ElectionSummary = response.into_json().await.unwrap();
        assert_eq!(published.status, ElectionStatus::Active);

        // Cannot publish twice.
        let response = client
            .post(uri!(publish_election(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!(complete_election(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // No reopening.
        let response = client
            .patch(uri!(update_election(election.id)))
            .header(ContentType::JSON)
            .body(json!({ "status": "active" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let elections: Vec<ElectionSummary> = client
            .get(uri!(get_elections))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(elections.len(), 1);
        assert_eq!(elections[0].status, ElectionStatus::Completed);
    }

    #[backend_test(admin)]
    async fn update_election_fields(client: Client, store: DynStore) {
        let election = store
            .create_election(ElectionCore::draft_example())
            .await
            .unwrap();

        let response = client
            .patch(uri!(update_election(election.id)))
            .header(ContentType::JSON)
            .body(json!({ "title": "Renamed", "description": "New text" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let updated: ElectionSummary = response.into_json().await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.description, Some("New text".to_string()));
        assert_eq!(updated.status, ElectionStatus::Draft);

        let response = client
            .patch(uri!(update_election(election.id + 1)))
            .header(ContentType::JSON)
            .body(json!({ "title": "Nope" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn positions_and_details(client: Client, store: DynStore) {
        let election = store
            .create_election(ElectionCore::draft_example())
            .await
            .unwrap();

        let response = client
            .post(uri!(create_position))
            .header(ContentType::JSON)
            .body(json!(PositionSpec::example("President", election.id)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        // Unknown election.
        let response = client
            .post(uri!(create_position))
            .header(ContentType::JSON)
            .body(json!(PositionSpec::example("Secretary", election.id + 1)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let positions: Vec<PositionDesc> = client
            .get(uri!(get_positions(election.id)))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].title, "President");

        let details: ElectionDetails = client
            .get(uri!(get_election(election.id)))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(details.election.id, election.id);
        assert_eq!(details.positions.len(), 1);
        assert!(details.positions[0].candidates.is_empty());

        let response = client
            .get(uri!(get_election(election.id + 1)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn candidate_review(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;

        let response = client.get("/api/admin/candidates").dispatch().await;
        assert_eq!(Status::BadRequest, response.status());

        let candidates: Vec<CandidateDetails> = client
            .get(format!("/api/admin/candidates?electionId={}", fx.election.id))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(candidates.len(), 4);
        assert!(candidates.iter().all(|c| c.user.is_some() && c.position.is_some()));

        let response = client
            .patch(uri!(update_candidate_status(fx.carol.id)))
            .header(ContentType::JSON)
            .body(json!(StatusUpdate { status: CandidateStatus::Approved }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let carol = fx.store.candidate_by_id(fx.carol.id).await.unwrap().unwrap();
        assert_eq!(carol.status, CandidateStatus::Approved);

        let response = client
            .patch(uri!(update_candidate_status(9999)))
            .header(ContentType::JSON)
            .body(json!({ "status": "rejected" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn voter_roster(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;
        voting::submit_vote(
            fx.store.as_ref(),
            fx.election.id,
            fx.voters[0].id,
            &[Selection {
                position_id: fx.president.id,
                candidate_id: fx.alice.id,
            }],
        )
        .await
        .unwrap();

        let voters: Vec<EligibleVoterDesc> = client
            .get(format!("/api/admin/voters?electionId={}", fx.election.id))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(voters.len(), ROSTER_SIZE);
        assert_eq!(voters.iter().filter(|v| v.has_voted).count(), 1);
        assert!(voters.iter().any(|v| v.student_id == "S1000" && v.has_voted));

        // Already on this roster.
        let response = client
            .post(uri!(create_voter))
            .header(ContentType::JSON)
            .body(json!(EligibleVoterSpec::example("S1000", fx.election.id)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let response = client
            .post(uri!(create_voter))
            .header(ContentType::JSON)
            .body(json!(EligibleVoterSpec::example("S2000", fx.election.id)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let voter: EligibleVoterDesc = response.into_json().await.unwrap();
        assert!(!voter.has_voted);
    }

    #[backend_test(admin)]
    async fn roster_upload(client: Client, store: DynStore) {
        let election = store
            .create_election(ElectionCore::draft_example())
            .await
            .unwrap();
        store
            .create_eligible_voter(EligibleVoterCore::example("S1001", election.id))
            .await
            .unwrap();

        let csv = "studentId,name,department\n\
                   S1001,Already There,Physics\n\
                   S1002,Grace Hopper,Computing\n\
                   ,Missing Id,History\n\
                   S1003,Edsger Dijkstra\n";
        let response = client
            .post(uri!(upload_voters))
            .header(ContentType::JSON)
            .body(json!(RosterUpload { csv_data: csv.to_string(), election_id: election.id }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let summary: ImportSummary = response.into_json().await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.message, "2 voters imported successfully");

        let roster = store
            .eligible_voters_by_election(election.id)
            .await
            .unwrap();
        assert_eq!(roster.len(), 3);

        let response = client
            .post(uri!(upload_voters))
            .header(ContentType::JSON)
            .body(json!(RosterUpload { csv_data: "studentId,name\n,\n".to_string(), election_id: election.id }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn results_for_admins_at_any_time(client: Client, store: DynStore) {
        let fx = Fixture::with_store(store).await;
        for voter in &fx.voters[..4] {
            voting::submit_vote(
                fx.store.as_ref(),
                fx.election.id,
                voter.id,
                &[Selection {
                    position_id: fx.president.id,
                    candidate_id: fx.bob.id,
                }],
            )
            .await
            .unwrap();
        }

        let response = client
            .get(uri!(get_results(fx.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votes_cast, 4);
        assert_eq!(results.voter_turnout, 40);
        assert_eq!(results.position_results[0].winner, Some(fx.bob.id));

        let response = client.get(uri!(get_results(9999))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn admin_only(client: Client, store: DynStore) {
        let response = client.get(uri!(get_elections)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        let election = store
            .create_election(ElectionCore::active_example())
            .await
            .unwrap();
        store
            .create_position(PositionCore::example("President", election.id))
            .await
            .unwrap();
        store
            .create_eligible_voter(EligibleVoterCore::example("S1001", election.id))
            .await
            .unwrap();
        crate::api::helpers::login_voter(&client, "S1001").await;

        let response = client.get(uri!(get_elections)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }
}
