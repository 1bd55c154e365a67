//! The live voter registry: an in-memory view reconciled with the
//! authoritative store.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rocket::tokio::{self, sync::RwLock, time::timeout};

use crate::error::{Error, Result};
use crate::model::{ballot::BallotChoices, id::Id, token::Token, voter::Voter};
use crate::store::{VoterChange, VoterStore};

pub type SharedRegistry = Arc<Registry>;

/// Owns the in-memory voter view and keeps it reconciled with the store.
///
/// The registry is the only writer to the view: a live change feed applies
/// remote events, and in local mode the registry applies its own
/// successful writes. Business logic writes to the store, never to the
/// view, and reads only the view.
pub struct Registry {
    store: Box<dyn VoterStore>,
    view: RwLock<HashMap<Id, Voter>>,
    /// Whether a change feed drives the view (remote store).
    remote: bool,
    connected: AtomicBool,
    store_timeout: Duration,
}

impl Registry {
    /// Seed the view from the store and start the change feed, if any.
    pub async fn open(
        store: Box<dyn VoterStore>,
        store_timeout: Duration,
    ) -> Result<SharedRegistry> {
        let initial = timeout(store_timeout, store.fetch_all())
            .await
            .map_err(|_| Error::StoreUnavailable("initial fetch timed out".to_string()))??;
        let feed = timeout(store_timeout, store.subscribe())
            .await
            .map_err(|_| Error::StoreUnavailable("subscribe timed out".to_string()))??;

        let view = initial.into_iter().map(|v| (v.id, v)).collect();
        let remote = feed.is_some();
        let registry = Arc::new(Self {
            store,
            view: RwLock::new(view),
            remote,
            connected: AtomicBool::new(remote),
            store_timeout,
        });

        if let Some(mut feed) = feed {
            // Hold only a weak handle so the feed task cannot keep a
            // discarded registry alive.
            let weak = Arc::downgrade(&registry);
            tokio::spawn(async move {
                while let Some(change) = feed.recv().await {
                    match weak.upgrade() {
                        Some(registry) => registry.apply(change).await,
                        None => return,
                    }
                }
                if let Some(registry) = weak.upgrade() {
                    warn!("Voter change feed ended; serving the cached view only");
                    registry.connected.store(false, Ordering::Relaxed);
                }
            });
        }

        Ok(registry)
    }

    /// Apply one change event to the view.
    async fn apply(&self, change: VoterChange) {
        let mut view = self.view.write().await;
        match change {
            VoterChange::Upserted(voter) => {
                view.insert(voter.id, voter);
            }
            VoterChange::Removed(id) => {
                view.remove(&id);
            }
            VoterChange::Cleared => view.clear(),
        }
    }

    /// Whether the store's change feed is still delivering events. Always
    /// false in local mode, which has no feed.
    pub fn is_connected(&self) -> bool {
        self.remote && self.connected.load(Ordering::Relaxed)
    }

    /// Whether the registry runs against the shared remote store.
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Look up a voter by the exact token string.
    pub async fn find_by_token(&self, token: &str) -> Option<Voter> {
        let view = self.view.read().await;
        view.values().find(|v| v.token.as_str() == token).cloned()
    }

    /// A point-in-time copy of every record in the view.
    pub async fn snapshot(&self) -> Vec<Voter> {
        self.view.read().await.values().cloned().collect()
    }

    /// Tokens currently present in the view.
    pub async fn tokens(&self) -> HashSet<Token> {
        self.view.read().await.values().map(|v| v.token).collect()
    }

    /// Persist an imported batch. Returns the number of records written.
    pub async fn import(&self, batch: Vec<Voter>) -> Result<usize> {
        self.bounded(self.store.upsert_batch(&batch), "roster upsert")
            .await?;
        if !self.remote {
            let mut view = self.view.write().await;
            for voter in &batch {
                view.insert(voter.id, voter.clone());
            }
        }
        Ok(batch.len())
    }

    /// Commit a ballot through the store's conditional write.
    pub async fn commit_vote(&self, id: Id, choices: &BallotChoices) -> Result<()> {
        self.bounded(self.store.commit_vote(id, choices), "vote commit")
            .await?;
        if !self.remote {
            let mut view = self.view.write().await;
            if let Some(voter) = view.get_mut(&id) {
                voter.mark_used(choices);
            }
        }
        Ok(())
    }

    /// Administrative wipe of the whole collection.
    pub async fn wipe(&self) -> Result<()> {
        self.bounded(self.store.wipe(), "wipe")
            .await
            .map_err(|err| match err {
                Error::StoreUnavailable(msg) => Error::WipeFailed(msg),
                other => other,
            })?;
        if !self.remote {
            self.view.write().await.clear();
        }
        Ok(())
    }

    /// Run a store operation under the configured time bound.
    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T>> + Send,
        what: &str,
    ) -> Result<T> {
        match timeout(self.store_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(Error::StoreUnavailable(format!("{what} timed out"))),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use crate::import::parse_roster;
    use crate::model::role::Role;

    use super::testutil::local_registry;

    const ROSTER: &str = "name,role\nAlice,male\nBob,female\nMs Carol,teacher\n";

    async fn import_roster(registry: &Registry) -> Vec<Voter> {
        let batch = parse_roster(ROSTER, &registry.tokens().await).unwrap();
        registry.import(batch.clone()).await.unwrap();
        batch
    }

    /// `used=false` must imply both vote fields are empty, whatever
    /// happened before.
    fn assert_invariant(voters: &[Voter]) {
        for voter in voters {
            if !voter.used {
                assert!(voter.male_vote.is_none() && voter.female_vote.is_none());
            }
        }
    }

    #[rocket::async_test]
    async fn local_mode_applies_own_writes_to_the_view() {
        let registry = local_registry().await;
        assert!(!registry.is_remote());
        assert!(!registry.is_connected());

        let batch = import_roster(&registry).await;
        assert_eq!(registry.snapshot().await.len(), 3);

        let alice = &batch[0];
        let found = registry.find_by_token(alice.token.as_str()).await.unwrap();
        assert_eq!(found.id, alice.id);

        registry
            .commit_vote(alice.id, &BallotChoices::new(Some("m1".to_string()), None))
            .await
            .unwrap();
        let found = registry.find_by_token(alice.token.as_str()).await.unwrap();
        assert!(found.used);
        assert_invariant(&registry.snapshot().await);
    }

    #[rocket::async_test]
    async fn wipe_clears_store_and_view() {
        let registry = local_registry().await;
        import_roster(&registry).await;

        registry.wipe().await.unwrap();
        assert!(registry.snapshot().await.is_empty());
        assert!(registry.find_by_token("ANYTOKEN").await.is_none());
    }

    #[rocket::async_test]
    async fn reimport_after_wipe_preserves_distribution_not_tokens() {
        let registry = local_registry().await;
        let first = import_roster(&registry).await;
        registry.wipe().await.unwrap();
        let second = import_roster(&registry).await;

        assert_eq!(first.len(), second.len());
        let count_roles = |batch: &[Voter]| {
            let mut counts: HashMap<Role, usize> = HashMap::new();
            for voter in batch {
                *counts.entry(voter.role).or_default() += 1;
            }
            counts
        };
        assert_eq!(count_roles(&first), count_roles(&second));

        // Tokens are never deterministic between runs.
        let first_tokens: HashSet<Token> = first.iter().map(|v| v.token).collect();
        assert!(second.iter().all(|v| !first_tokens.contains(&v.token)));
    }

    #[rocket::async_test]
    async fn invariant_survives_an_operation_sequence() {
        let registry = local_registry().await;
        let batch = import_roster(&registry).await;
        assert_invariant(&registry.snapshot().await);

        // A failed commit (wrong id) changes nothing.
        let _ = registry
            .commit_vote(Id::new(), &BallotChoices::new(Some("m1".to_string()), None))
            .await;
        assert_invariant(&registry.snapshot().await);

        let teacher = batch.iter().find(|v| v.role == Role::Teacher).unwrap();
        registry
            .commit_vote(
                teacher.id,
                &BallotChoices::new(Some("m2".to_string()), Some("f1".to_string())),
            )
            .await
            .unwrap();
        assert_invariant(&registry.snapshot().await);

        registry.wipe().await.unwrap();
        import_roster(&registry).await;
        assert_invariant(&registry.snapshot().await);
    }
}
