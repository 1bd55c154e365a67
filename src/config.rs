use std::time::Duration;

use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::candidate::Slate;
use crate::registry::Registry;
use crate::store::{local::LocalStore, remote::MongoStore, VoterStore};

/// Name of the election database on the remote store.
const DATABASE: &str = "council_vote";

fn default_store_timeout() -> u64 {
    5
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_store_timeout")]
    store_timeout: u64,
    // secrets
    admin_key: String,
}

impl Config {
    /// Shared static secret for the administrative endpoints.
    /// Configured via `ADMIN_KEY`.
    pub fn admin_key(&self) -> &str {
        &self.admin_key
    }

    /// Bound on any single store operation.
    /// Configured via `STORE_TIMEOUT` (seconds).
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout)
    }
}

/// A fairing that loads the application config and puts it in managed
/// state. This could easily be achieved using `AdHoc::config`, but is
/// written out explicitly for symmetry with the other fairings and
/// control over error messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the candidate slate.
#[derive(Deserialize)]
struct SlateConfig {
    // non-secrets
    slate_path: String,
}

/// A fairing that loads the candidate slate from its JSON file and puts
/// it in managed state.
pub struct SlateFairing;

#[rocket::async_trait]
impl Fairing for SlateFairing {
    fn info(&self) -> Info {
        Info {
            name: "Candidate slate",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<SlateConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load slate config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let contents = match std::fs::read_to_string(&config.slate_path) {
            Ok(contents) => contents,
            Err(e) => {
                error!("Failed to read candidate slate {}: {e}", config.slate_path);
                return Err(rocket);
            }
        };
        let slate: Slate = match serde_json::from_str(&contents) {
            Ok(slate) => slate,
            Err(e) => {
                error!("Invalid candidate slate {}: {e}", config.slate_path);
                return Err(rocket);
            }
        };
        info!(
            "Loaded candidate slate: {} male, {} female",
            slate.male_candidates.len(),
            slate.female_candidates.len()
        );

        rocket = rocket.manage(slate);
        Ok(rocket)
    }
}

/// Configuration for the backing store. `db_uri` selects the shared
/// remote database; without it the server runs against the local
/// fallback file.
#[derive(Deserialize)]
struct StoreConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    local_store_path: String,
}

/// A fairing that opens the backing store, seeds the voter registry from
/// it, and places the registry into managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voter store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let store_timeout = match rocket.figment().extract::<Config>() {
            Ok(config) => config.store_timeout(),
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: Box<dyn VoterStore> = match config.db_uri {
            Some(uri) => {
                info!("Loaded store config, connecting...");
                match MongoStore::connect(&uri, DATABASE).await {
                    Ok(store) => {
                        info!("...store connection online!");
                        Box::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to voter store: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!(
                    "No db_uri configured; using the local fallback store at {}",
                    config.local_store_path
                );
                match LocalStore::open(&config.local_store_path) {
                    Ok(store) => Box::new(store),
                    Err(e) => {
                        error!("Failed to open local store: {e}");
                        return Err(rocket);
                    }
                }
            }
        };

        let registry = match Registry::open(store, store_timeout).await {
            Ok(registry) => registry,
            Err(e) => {
                error!("Failed to initialise voter registry: {e}");
                return Err(rocket);
            }
        };

        rocket = rocket.manage(registry);
        Ok(rocket)
    }
}
