use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{
                AnyUser, AuthToken, LoginRequest, RegisterRequest, StudentLoginRequest,
                AUTH_TOKEN_COOKIE,
            },
            user::{PublicUser, Session},
            Message,
        },
        common::user::Role,
        db::{hash_password, NewUser, User},
        store::DynStore,
    },
};

pub fn routes() -> Vec<Route> {
    routes![login, student_login, register, logout, current_session]
}

/// Start a session for `user` in `role` and describe it.
fn start_session(
    cookies: &CookieJar<'_>,
    config: &Config,
    user: User,
    role: Role,
) -> Json<Session> {
    let token = AuthToken::<AnyUser>::with_role(&user, role);
    cookies.add(token.into_cookie(config));

    let mut user = PublicUser::from(user);
    user.role = role;
    Json(Session { user: Some(user) })
}

#[post("/api/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginRequest>,
    store: &State<DynStore>,
    config: &State<Config>,
) -> Result<Json<Session>> {
    if credentials.role != Role::Admin {
        return Err(Error::bad_request("Invalid login method for this role"));
    }

    let admin = store
        .user_by_username(&credentials.username)
        .await?
        .filter(|user| user.is(Role::Admin) && user.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Invalid admin credentials"))?;

    info!("Admin {} logged in", admin.username);
    Ok(start_session(cookies, config, admin, Role::Admin))
}

#[post("/api/auth/student-login", data = "<request>", format = "json")]
pub async fn student_login(
    cookies: &CookieJar<'_>,
    request: Json<StudentLoginRequest>,
    store: &State<DynStore>,
    config: &State<Config>,
) -> Result<Json<Session>> {
    let student_id = request.student_id.trim();

    let user = match request.role {
        Role::Voter => {
            let roster_entry = store
                .eligible_voter_by_student_id(student_id)
                .await?
                .ok_or_else(|| {
                    Error::unauthorized("Student ID not found in eligible voters list")
                })?;

            match store.user_by_student_id(student_id).await? {
                Some(user) => user,
                None => {
                    debug!("Creating voter account for student {student_id}");
                    store
                        .create_user(NewUser {
                            username: student_id.to_string(),
                            password_hash: None,
                            role: Role::Voter,
                            student_id: Some(student_id.to_string()),
                            department: roster_entry.department.clone(),
                            name: roster_entry.name.clone(),
                        })
                        .await?
                }
            }
        }
        Role::Candidate => {
            let user = store
                .user_by_student_id(student_id)
                .await?
                .ok_or_else(|| Error::unauthorized("Student ID not found in candidate database"))?;
            if store.candidates_by_user(user.id).await?.is_empty() {
                return Err(Error::unauthorized(
                    "No candidate application found for this student ID",
                ));
            }
            user
        }
        Role::Admin => return Err(Error::bad_request("Invalid role specified")),
    };

    Ok(start_session(cookies, config, user, request.role))
}

#[post("/api/auth/register", data = "<request>", format = "json")]
pub async fn register(
    cookies: &CookieJar<'_>,
    request: Json<RegisterRequest>,
    store: &State<DynStore>,
    config: &State<Config>,
) -> Result<(Status, Json<Session>)> {
    request.validate().map_err(Error::bad_request)?;
    let request = request.into_inner();
    let student_id = request.student_id.trim().to_string();

    if store.user_by_student_id(&student_id).await?.is_some() {
        return Err(Error::conflict("A user with this student ID already exists"));
    }
    if store.user_by_username(&request.username).await?.is_some() {
        return Err(Error::conflict("Username already in use"));
    }
    if request.role == Role::Voter
        && store
            .eligible_voter_by_student_id(&student_id)
            .await?
            .is_none()
    {
        return Err(Error::forbidden(
            "Your student ID is not in the eligible voters list. Please contact your administrator.",
        ));
    }

    let user = store
        .create_user(NewUser {
            username: request.username,
            password_hash: Some(hash_password(&request.password)),
            role: request.role,
            student_id: Some(student_id),
            department: request.department,
            name: Some(request.name),
        })
        .await?;

    info!("Registered {} {}", user.role, user.username);
    let role = user.role;
    Ok((Status::Created, start_session(cookies, config, user, role)))
}

#[post("/api/auth/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Json<Message> {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Json(Message::new("Logout successful"))
}

#[get("/api/auth/session")]
pub async fn current_session(
    token: Option<AuthToken<AnyUser>>,
    store: &State<DynStore>,
) -> Result<Json<Session>> {
    let user = match token {
        Some(token) => store.user_by_id(token.id).await?.map(|user| {
            let mut user = PublicUser::from(user);
            user.role = token.role;
            user
        }),
        None => None,
    };
    Ok(Json(Session { user }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::json,
    };

    use super::*;
    use crate::model::db::{EligibleVoterCore, UserCore};

    #[backend_test]
    async fn admin_login_valid(client: Client, store: DynStore) {
        store.create_user(UserCore::example_admin()).await.unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(LoginRequest::example_admin()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let session: Session = response.into_json().await.unwrap();
        assert_eq!(session.user.unwrap().role, Role::Admin);
    }

    #[backend_test]
    async fn admin_login_invalid(client: Client, store: DynStore) {
        store.create_user(UserCore::example_admin()).await.unwrap();

        // Wrong password.
        let mut credentials = LoginRequest::example_admin();
        credentials.password = "wrong".to_string();
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());

        // Password login is for administrators only.
        let mut credentials = LoginRequest::example_admin();
        credentials.role = Role::Voter;
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn voter_login_creates_account(client: Client, store: DynStore) {
        store
            .create_eligible_voter(EligibleVoterCore::example("S1001", 1))
            .await
            .unwrap();

        let response = client
            .post(uri!(student_login))
            .header(ContentType::JSON)
            .body(json!(StudentLoginRequest::voter("S1001")).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let user = store.user_by_student_id("S1001").await.unwrap().unwrap();
        assert!(user.is(Role::Voter));
        assert_eq!(user.name, Some("Student S1001".to_string()));

        // A second login reuses the account.
        client
            .post(uri!(student_login))
            .header(ContentType::JSON)
            .body(json!(StudentLoginRequest::voter("S1001")).to_string())
            .dispatch()
            .await;
        let again = store.user_by_student_id("S1001").await.unwrap().unwrap();
        assert_eq!(user.id, again.id);
    }

    #[backend_test]
    async fn student_login_rejections(client: Client, store: DynStore) {
        // Not on any roster.
        let response = client
            .post(uri!(student_login))
            .header(ContentType::JSON)
            .body(json!(StudentLoginRequest::voter("S9999")).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        // Known student, but no applications.
        store
            .create_user(UserCore::example_voter("S1002"))
            .await
            .unwrap();
        let response = client
            .post(uri!(student_login))
            .header(ContentType::JSON)
            .body(json!(StudentLoginRequest::candidate("S1002")).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
    }

    #[backend_test]
    async fn registration(client: Client, store: DynStore) {
        // Voters must be on a roster.
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example("S3001", Role::Voter)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        store
            .create_eligible_voter(EligibleVoterCore::example("S3001", 1))
            .await
            .unwrap();
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example("S3001", Role::Voter)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let user = store.user_by_student_id("S3001").await.unwrap().unwrap();
        assert!(user.verify_password("hunter22"));

        // The student ID is now taken.
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example("S3001", Role::Candidate)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        // Administrators cannot self-register.
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example("S3002", Role::Admin)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn admin_tests_start_logged_in(client: Client, store: DynStore) {
        let admin = store
            .user_by_username(&LoginRequest::example_admin().username)
            .await
            .unwrap()
            .unwrap();

        let session: Session = client
            .get(uri!(current_session))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        let user = session.user.unwrap();
        assert_eq!(user.id, admin.id);
        assert_eq!(user.role, Role::Admin);
    }

    #[backend_test(admin)]
    async fn session_and_logout(client: Client) {
        let session: Session = client
            .get(uri!(current_session))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(session.user.unwrap().role, Role::Admin);

        let response = client.post(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());

        let session: Session = client
            .get(uri!(current_session))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(session.user, None);
    }
}
