//! Process-local fallback store backed by a single JSON file.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use rocket::tokio::sync::{mpsc, Mutex};

use crate::error::{Error, Result};
use crate::model::{ballot::BallotChoices, id::Id, voter::Voter};

use super::{VoterChange, VoterStore};

/// Fallback store used when no remote database is configured.
///
/// The collection lives in memory and is mirrored to one JSON array file,
/// rewritten wholesale on every change. There is no external change
/// source, so `subscribe` yields nothing. The mutex makes the
/// check-then-set inside `commit_vote` atomic in-process.
pub struct LocalStore {
    path: PathBuf,
    voters: Mutex<HashMap<Id, Voter>>,
}

impl LocalStore {
    /// Open the store, loading any previously persisted collection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let voters = match fs::read_to_string(&path) {
            Ok(contents) => {
                let records: Vec<Voter> = serde_json::from_str(&contents).map_err(|err| {
                    Error::StoreUnavailable(format!("corrupt local store file: {err}"))
                })?;
                records.into_iter().map(|v| (v.id, v)).collect()
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(Error::StoreUnavailable(format!(
                    "cannot read local store file: {err}"
                )))
            }
        };
        Ok(Self {
            path,
            voters: Mutex::new(voters),
        })
    }

    /// Rewrite the persisted file from the in-memory collection.
    fn persist(&self, voters: &HashMap<Id, Voter>) -> Result<()> {
        let records: Vec<&Voter> = voters.values().collect();
        let contents = serde_json::to_string(&records).map_err(|err| {
            Error::StoreUnavailable(format!("cannot serialise local store: {err}"))
        })?;
        fs::write(&self.path, contents).map_err(|err| {
            Error::StoreUnavailable(format!("cannot write local store file: {err}"))
        })
    }
}

#[rocket::async_trait]
impl VoterStore for LocalStore {
    async fn fetch_all(&self) -> Result<Vec<Voter>> {
        let voters = self.voters.lock().await;
        Ok(voters.values().cloned().collect())
    }

    async fn upsert_batch(&self, batch: &[Voter]) -> Result<()> {
        let mut voters = self.voters.lock().await;

        // Token uniqueness is a store constraint, mirroring the remote
        // store's unique index.
        for voter in batch {
            let clash = voters
                .values()
                .any(|existing| existing.token == voter.token && existing.id != voter.id);
            if clash {
                return Err(Error::BadRequest(format!(
                    "duplicate token {}",
                    voter.token
                )));
            }
        }

        for voter in batch {
            voters.insert(voter.id, voter.clone());
        }
        self.persist(&voters)
    }

    async fn commit_vote(&self, id: Id, choices: &BallotChoices) -> Result<()> {
        let mut voters = self.voters.lock().await;
        let current = voters.get(&id).ok_or(Error::TokenNotFound)?.clone();
        if current.used {
            return Err(Error::TokenAlreadyUsed);
        }

        let mut updated = current.clone();
        updated.mark_used(choices);
        voters.insert(id, updated);

        // No partial state: roll the map back if the file write fails.
        if let Err(err) = self.persist(&voters) {
            voters.insert(id, current);
            return Err(err);
        }
        Ok(())
    }

    async fn wipe(&self) -> Result<()> {
        let mut voters = self.voters.lock().await;
        let previous = std::mem::take(&mut *voters);
        if let Err(err) = self.persist(&voters) {
            *voters = previous;
            return Err(Error::WipeFailed(err.to_string()));
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<Option<mpsc::Receiver<VoterChange>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::ballot::BallotChoices;

    fn temp_store_path() -> PathBuf {
        // Randomised per test, mirroring the per-test database names used
        // against the remote store.
        let random: u32 = rand::random();
        std::env::temp_dir().join(format!("voters-test-{random}.json"))
    }

    #[rocket::async_test]
    async fn starts_empty_without_a_file() {
        let store = LocalStore::open(temp_store_path()).unwrap();
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn upsert_then_fetch_round_trips() {
        let store = LocalStore::open(temp_store_path()).unwrap();
        let batch = vec![Voter::example_male(), Voter::example_female()];
        store.upsert_batch(&batch).await.unwrap();

        let mut fetched = store.fetch_all().await.unwrap();
        fetched.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(fetched, batch);
    }

    #[rocket::async_test]
    async fn persists_across_reopen() {
        let path = temp_store_path();
        {
            let store = LocalStore::open(&path).unwrap();
            store
                .upsert_batch(&[Voter::example_teacher()])
                .await
                .unwrap();
        }

        let reopened = LocalStore::open(&path).unwrap();
        let fetched = reopened.fetch_all().await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].name, "Ms Carol");
    }

    #[rocket::async_test]
    async fn commit_vote_is_single_use() {
        let store = LocalStore::open(temp_store_path()).unwrap();
        let voter = Voter::example_male();
        store.upsert_batch(&[voter.clone()]).await.unwrap();

        let choices = BallotChoices::new(Some("m1".to_string()), None);
        store.commit_vote(voter.id, &choices).await.unwrap();

        let stored = &store.fetch_all().await.unwrap()[0];
        assert!(stored.used);
        assert_eq!(stored.male_vote.as_deref(), Some("m1"));
        assert_eq!(stored.female_vote, None);

        // The second commit loses the conditional write.
        let err = store.commit_vote(voter.id, &choices).await.unwrap_err();
        assert!(matches!(err, Error::TokenAlreadyUsed));
    }

    #[rocket::async_test]
    async fn commit_vote_on_missing_record_is_not_found() {
        let store = LocalStore::open(temp_store_path()).unwrap();
        let err = store
            .commit_vote(Id::new(), &BallotChoices::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenNotFound));
    }

    #[rocket::async_test]
    async fn upsert_rejects_token_clashes() {
        let store = LocalStore::open(temp_store_path()).unwrap();
        let voter = Voter::example_male();
        store.upsert_batch(&[voter.clone()]).await.unwrap();

        let mut impostor = Voter::example_female();
        impostor.voter.token = voter.token;
        let err = store.upsert_batch(&[impostor]).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[rocket::async_test]
    async fn wipe_clears_everything() {
        let path = temp_store_path();
        let store = LocalStore::open(&path).unwrap();
        store
            .upsert_batch(&[Voter::example_male(), Voter::example_female()])
            .await
            .unwrap();

        store.wipe().await.unwrap();
        assert!(store.fetch_all().await.unwrap().is_empty());

        // The wipe reaches the persisted file too.
        let reopened = LocalStore::open(&path).unwrap();
        assert!(reopened.fetch_all().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn has_no_change_feed() {
        let store = LocalStore::open(temp_store_path()).unwrap();
        assert!(store.subscribe().await.unwrap().is_none());
    }
}
