use rocket::Route;

mod admin;
pub mod auth;
mod candidate;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(candidate::routes());
    routes.extend(voter::routes());
    routes
}
