use std::cmp::Ordering;

use rocket::{
    form::FromFormField,
    http::{ContentType, Status},
    request::{self, FromRequest, Request},
    serde::json::Json,
    Route, State,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    export,
    import,
    model::{candidate::Slate, role::Role, voter::Voter},
    registry::SharedRegistry,
};

/// Header carrying the administrative key on privileged requests.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

pub fn routes() -> Vec<Route> {
    routes![
        login,
        list_voters,
        upload_roster,
        results,
        export_results,
        credentials,
        wipe
    ]
}

/// Request guard proving the caller presented the administrative key.
///
/// The key is a shared static secret compared for exact equality; there
/// is deliberately no hashing, rate-limiting or lockout here.
pub struct AdminKey;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminKey {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // Panics iff the `Config` is not managed, which cannot happen
        // after ignition.
        let config = req.guard::<&State<Config>>().await.unwrap();
        match req.headers().get_one(ADMIN_KEY_HEADER) {
            Some(key) if key == config.admin_key() => request::Outcome::Success(AdminKey),
            _ => request::Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthorized("invalid admin key".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    key: String,
}

#[post("/admin/login", data = "<request>", format = "json")]
async fn login(request: Json<LoginRequest>, config: &State<Config>) -> Result<()> {
    if request.key == config.admin_key() {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid admin key".to_string()))
    }
}

/// Participation filter for the registry listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
enum StatusFilter {
    Voted,
    Awaiting,
}

/// Printed-registry ordering: teachers first, then male, then female.
fn print_rank(role: Role) -> u8 {
    match role {
        Role::Teacher => 0,
        Role::Male => 1,
        Role::Female => 2,
    }
}

fn by_print_order(a: &Voter, b: &Voter) -> Ordering {
    print_rank(a.role)
        .cmp(&print_rank(b.role))
        .then_with(|| a.name.cmp(&b.name))
}

#[get("/admin/voters?<search>&<role>&<status>")]
async fn list_voters(
    _key: AdminKey,
    search: Option<String>,
    role: Option<Role>,
    status: Option<StatusFilter>,
    registry: &State<SharedRegistry>,
) -> Result<Json<Vec<Voter>>> {
    let needle = search.map(|s| s.to_lowercase());
    let mut voters: Vec<Voter> = registry
        .snapshot()
        .await
        .into_iter()
        .filter(|v| match &needle {
            Some(needle) => {
                v.name.to_lowercase().contains(needle)
                    || v.token.as_str().to_lowercase().contains(needle)
            }
            None => true,
        })
        .filter(|v| role.map_or(true, |role| v.role == role))
        .filter(|v| match status {
            Some(StatusFilter::Voted) => v.used,
            Some(StatusFilter::Awaiting) => !v.used,
            None => true,
        })
        .collect();
    voters.sort_by(by_print_order);
    Ok(Json(voters))
}

#[derive(Debug, Serialize)]
struct ImportSummary {
    imported: usize,
}

#[post("/admin/roster", data = "<roster>")]
async fn upload_roster(
    _key: AdminKey,
    roster: String,
    registry: &State<SharedRegistry>,
) -> Result<Json<ImportSummary>> {
    let existing = registry.tokens().await;
    let batch = import::parse_roster(&roster, &existing)?;
    let imported = registry.import(batch).await?;
    info!("Imported {imported} voters from roster upload");
    Ok(Json(ImportSummary { imported }))
}

#[derive(Debug, Serialize)]
struct CandidateTally {
    id: String,
    name: String,
    vice_name: String,
    votes: usize,
}

#[derive(Debug, Serialize)]
struct Results {
    total_voters: usize,
    votes_cast: usize,
    awaiting: usize,
    turnout_percent: u32,
    male_ticket: Vec<CandidateTally>,
    female_ticket: Vec<CandidateTally>,
}

#[get("/admin/results")]
async fn results(
    _key: AdminKey,
    registry: &State<SharedRegistry>,
    slate: &State<Slate>,
) -> Result<Json<Results>> {
    let voters = registry.snapshot().await;
    let votes_cast = voters.iter().filter(|v| v.used).count();
    let turnout_percent = if voters.is_empty() {
        0
    } else {
        ((votes_cast as f64 / voters.len() as f64) * 100.0).round() as u32
    };

    let male_ticket = slate
        .male_candidates
        .iter()
        .map(|c| CandidateTally {
            id: c.id.clone(),
            name: c.name.clone(),
            vice_name: c.vice_name.clone(),
            votes: voters
                .iter()
                .filter(|v| v.male_vote.as_deref() == Some(c.id.as_str()))
                .count(),
        })
        .collect();
    let female_ticket = slate
        .female_candidates
        .iter()
        .map(|c| CandidateTally {
            id: c.id.clone(),
            name: c.name.clone(),
            vice_name: c.vice_name.clone(),
            votes: voters
                .iter()
                .filter(|v| v.female_vote.as_deref() == Some(c.id.as_str()))
                .count(),
        })
        .collect();

    Ok(Json(Results {
        total_voters: voters.len(),
        awaiting: voters.len() - votes_cast,
        votes_cast,
        turnout_percent,
        male_ticket,
        female_ticket,
    }))
}

#[get("/admin/export")]
async fn export_results(
    _key: AdminKey,
    registry: &State<SharedRegistry>,
    slate: &State<Slate>,
) -> Result<(ContentType, String)> {
    let mut voters = registry.snapshot().await;
    voters.sort_by(by_print_order);
    Ok((ContentType::CSV, export::render_results(&voters, slate)))
}

/// Data printed on one QR credential card. The QR payload is exactly the
/// token string.
#[derive(Debug, Serialize)]
struct Credential {
    name: String,
    role: Role,
    token: String,
}

#[get("/admin/credentials")]
async fn credentials(
    _key: AdminKey,
    registry: &State<SharedRegistry>,
) -> Result<Json<Vec<Credential>>> {
    let mut voters = registry.snapshot().await;
    voters.sort_by(by_print_order);
    Ok(Json(
        voters
            .into_iter()
            .map(|v| Credential {
                name: v.name.clone(),
                role: v.role,
                token: v.token.to_string(),
            })
            .collect(),
    ))
}

#[delete("/admin/voters")]
async fn wipe(_key: AdminKey, registry: &State<SharedRegistry>) -> Result<()> {
    registry.wipe().await?;
    warn!("Administrative wipe: all voter records deleted");
    Ok(())
}
