use rocket::{serde::json::Json, Route, State};
use serde::Serialize;

use crate::registry::SharedRegistry;

pub fn routes() -> Vec<Route> {
    routes![status]
}

/// Connectivity indicator for the portal header badge.
#[derive(Debug, Serialize)]
struct StatusReport {
    /// Whether the remote change feed is delivering events.
    connected: bool,
    /// `remote` or `local`, depending on the configured store.
    store: &'static str,
}

#[get("/status")]
async fn status(registry: &State<SharedRegistry>) -> Json<StatusReport> {
    Json(StatusReport {
        connected: registry.is_connected(),
        store: if registry.is_remote() {
            "remote"
        } else {
            "local"
        },
    })
}
