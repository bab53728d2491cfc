#[macro_use]
extern crate log;
#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{figment::Figment, Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::model::store::DynStore;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod roster;
pub mod voting;

/// Build a server from `Rocket.toml` and the environment, with the store
/// chosen by configuration.
pub fn build() -> Rocket<Build> {
    mount_api(rocket::build()).attach(StoreFairing)
}

/// Build a server from the given configuration over an existing store.
pub fn rocket_for_store(figment: Figment, store: DynStore) -> Rocket<Build> {
    mount_api(rocket::custom(figment)).manage(store)
}

fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
        .register("/", error::catchers())
}

/// Configuration for tests: no files or environment required.
#[cfg(test)]
pub(crate) fn test_figment() -> Figment {
    rocket::Config::figment()
        .merge(("jwt_secret", "test secret, not for production"))
        .merge(("auth_ttl", 3600))
}
