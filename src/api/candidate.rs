use rocket::{
    http::{CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{AnyUser, AuthToken, Candidate},
            candidate::{CandidateApplication, CandidateDesc, CandidateProfile},
        },
        common::{candidate::CandidateStatus, user::Role},
        db::{NewCandidate, NewUser},
        store::{DynStore, StoreError},
    },
};

pub fn routes() -> Vec<Route> {
    routes![apply, profile]
}

#[post("/api/candidates/apply", data = "<application>", format = "json")]
async fn apply(
    token: AuthToken<AnyUser>,
    cookies: &CookieJar<'_>,
    application: Json<CandidateApplication>,
    store: &State<DynStore>,
    config: &State<Config>,
) -> Result<(Status, Json<CandidateDesc>)> {
    application.validate().map_err(Error::bad_request)?;
    let application = application.into_inner();

    store
        .election_by_id(application.election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {}", application.election_id)))?;
    let position = store.position_by_id(application.position_id).await?;
    if position.map(|p| p.election_id) != Some(application.election_id) {
        return Err(Error::bad_request("Position does not belong to this election"));
    }

    let student_id = application.student_id.trim().to_string();
    let user = match store.user_by_student_id(&student_id).await? {
        Some(user) => user,
        None => {
            store
                .create_user(NewUser {
                    username: application.email.trim().to_string(),
                    password_hash: None,
                    role: Role::Candidate,
                    student_id: Some(student_id),
                    department: application.department.clone(),
                    name: Some(application.full_name()),
                })
                .await?
        }
    };

    let already_applied = store
        .candidates_by_user(user.id)
        .await?
        .iter()
        .any(|c| c.position_id == application.position_id && c.election_id == application.election_id);
    if already_applied {
        return Err(Error::conflict("You have already applied for this position"));
    }

    let candidate = store
        .create_candidate(NewCandidate {
            user_id: user.id,
            position_id: application.position_id,
            manifesto: Some(application.manifesto),
            status: CandidateStatus::Pending,
            election_id: application.election_id,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => {
                Error::conflict("You have already applied for this position")
            }
            e => e.into(),
        })?;

    if user.is(Role::Voter) {
        store.set_role(user.id, Role::Candidate).await?;
    }
    if user.id == token.id && token.role != Role::Candidate {
        let token = AuthToken::<AnyUser>::with_role(&user, Role::Candidate);
        cookies.add(token.into_cookie(config));
    }

    info!(
        "User {} applied for position {} in election {}",
        user.id, candidate.position_id, candidate.election_id
    );
    Ok((Status::Created, Json(candidate.into())))
}

#[get("/api/candidates/profile")]
async fn profile(
    token: AuthToken<Candidate>,
    store: &State<DynStore>,
) -> Result<Json<Vec<CandidateProfile>>> {
    let applications = store.candidates_by_user(token.id).await?;
    if applications.is_empty() {
        return Err(Error::not_found("Candidate profile"));
    }

    let mut profiles = Vec::new();
    for application in applications {
        let election = store
            .election_by_id(application.election_id)
            .await?
            .map(Into::into);
        let details = store.candidate_with_details(application).await?;
        profiles.push(CandidateProfile { details, election });
    }
    Ok(Json(profiles))
}
