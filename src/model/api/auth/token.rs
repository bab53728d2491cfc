use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    common::{user::Role, UserId},
    db::User,
    store::DynStore,
};

use super::role::RoleGuard;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with a specific role.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<R> {
    pub id: UserId,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl<R> AuthToken<R> {
    /// Create a new [`AuthToken`] for the given user, carrying their current role.
    pub fn new(user: &User) -> Self {
        Self::with_role(user, user.role)
    }

    /// Create a new [`AuthToken`] for the given user acting in a specific role.
    /// Students may log in as a voter or a candidate regardless of which one
    /// their account was last promoted to.
    pub fn with_role(user: &User, role: Role) -> Self {
        Self {
            id: user.id,
            role,
            phantom: PhantomData,
        }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .path("/")
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)?;
        Ok(token)
    }

    /// Reinterpret this token under a different guard.
    pub fn cast<S>(self) -> AuthToken<S> {
        AuthToken {
            id: self.id,
            role: self.role,
            phantom: PhantomData,
        }
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: RoleGuard + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie, check it grants a role this guard
    /// accepts, and check the user it names still exists.
    ///
    /// A missing or invalid cookie fails with 401; a valid cookie with the
    /// wrong role fails with 403.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = try_outcome!(req
            .guard::<&State<Config>>()
            .await
            .map_failure(|_| unmanaged("Config")));

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Not authenticated"),
                ))
            }
        };

        let token: Self = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        if !R::permits(token.role) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::forbidden(format!("Not permitted for role {}", token.role)),
            ));
        }

        // Check the user actually exists.
        let store = try_outcome!(req
            .guard::<&State<DynStore>>()
            .await
            .map_failure(|_| unmanaged("DynStore")));
        match store.user_by_id(token.id).await {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("User no longer exists"),
            )),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

fn unmanaged(state: &str) -> (Status, Error) {
    (
        Status::InternalServerError,
        Error::internal(format!("{state} is not managed")),
    )
}
