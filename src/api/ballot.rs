use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    ballot::BallotChoices,
    candidate::{Candidate, Slate},
    role::Role,
};
use crate::registry::SharedRegistry;
use crate::session::VoteSession;

pub fn routes() -> Vec<Route> {
    routes![authenticate, submit]
}

/// Request body for token authentication.
#[derive(Debug, Deserialize)]
struct AuthRequest {
    token: String,
}

/// Ballot data shown to an authenticated voter: only the ticket sections
/// their role votes on.
#[derive(Debug, Serialize)]
struct BallotAccess {
    name: String,
    role: Role,
    male_candidates: Option<Vec<Candidate>>,
    female_candidates: Option<Vec<Candidate>>,
}

#[post("/ballot/authenticate", data = "<request>", format = "json")]
async fn authenticate(
    request: Json<AuthRequest>,
    registry: &State<SharedRegistry>,
    slate: &State<Slate>,
) -> Result<Json<BallotAccess>> {
    let mut session = VoteSession::new(registry.inner().clone());
    let voter = session.authenticate(&request.token).await?;

    Ok(Json(BallotAccess {
        name: voter.name.clone(),
        role: voter.role,
        male_candidates: voter
            .role
            .votes_male()
            .then(|| slate.male_candidates.clone()),
        female_candidates: voter
            .role
            .votes_female()
            .then(|| slate.female_candidates.clone()),
    }))
}

/// Request body for ballot submission.
#[derive(Debug, Deserialize)]
struct SubmitRequest {
    token: String,
    #[serde(default)]
    male_vote: Option<String>,
    #[serde(default)]
    female_vote: Option<String>,
}

#[post("/ballot/submit", data = "<request>", format = "json")]
async fn submit(
    request: Json<SubmitRequest>,
    registry: &State<SharedRegistry>,
    slate: &State<Slate>,
) -> Result<()> {
    let request = request.into_inner();

    // Ensure the chosen candidates exist before touching the session.
    if let Some(id) = &request.male_vote {
        if !slate.has_male(id) {
            return Err(Error::not_found(format!("Male candidate '{id}'")));
        }
    }
    if let Some(id) = &request.female_vote {
        if !slate.has_female(id) {
            return Err(Error::not_found(format!("Female candidate '{id}'")));
        }
    }

    let mut session = VoteSession::new(registry.inner().clone());
    session.authenticate(&request.token).await?;
    session
        .submit(BallotChoices::new(request.male_vote, request.female_vote))
        .await
}
