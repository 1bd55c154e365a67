//! Backend server for the student council election portal: single-use
//! voter tokens, exactly-once ballot commitment, and an administrative
//! surface for rosters, results and credentials.

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod model;
pub mod registry;
pub mod session;
pub mod store;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, SlateFairing, StoreFairing};
use crate::logging::LoggerFairing;

/// Assemble the server on the default figment: config, logging, candidate
/// slate, backing store and routes.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build())
}

fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .attach(SlateFairing)
        .attach(StoreFairing)
}
