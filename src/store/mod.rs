//! Storage abstraction over the shared remote database and the local
//! fallback file.

pub mod local;
pub mod remote;

use rocket::tokio::sync::mpsc;

use crate::error::Result;
use crate::model::{ballot::BallotChoices, id::Id, voter::Voter};

/// Capacity of the change-event channel between a store and the registry.
pub(crate) const CHANGE_BUFFER: usize = 64;

/// An incremental change to the voter collection, as observed at the
/// store.
#[derive(Debug, Clone)]
pub enum VoterChange {
    /// A record was inserted or replaced.
    Upserted(Voter),
    /// A record was deleted.
    Removed(Id),
    /// The whole collection was dropped.
    Cleared,
}

/// The authoritative collection of voter records.
///
/// Reads always come from the registry's in-memory view; these operations
/// are the only way business logic touches the backing data.
#[rocket::async_trait]
pub trait VoterStore: Send + Sync {
    /// Fetch the full voter set.
    async fn fetch_all(&self) -> Result<Vec<Voter>>;

    /// Insert-or-replace the given records by ID.
    ///
    /// Not atomic: records are written one at a time and the first
    /// failure surfaces without rolling back earlier writes.
    async fn upsert_batch(&self, voters: &[Voter]) -> Result<()>;

    /// Consume a voter's token: mark the record used and attach the
    /// choices, in one conditional write that only applies while `used`
    /// is still false.
    ///
    /// Losing the race fails with `TokenAlreadyUsed`; a record that no
    /// longer exists fails with `TokenNotFound`.
    async fn commit_vote(&self, id: Id, choices: &BallotChoices) -> Result<()>;

    /// Delete every record. Irreversible.
    async fn wipe(&self) -> Result<()>;

    /// Open the store's change feed.
    ///
    /// `None` when the store has no external change source. Dropping the
    /// receiver closes the subscription.
    async fn subscribe(&self) -> Result<Option<mpsc::Receiver<VoterChange>>>;
}
