//! Shared MongoDB store: the single arbiter of write ordering when
//! multiple voting stations run against the same election.

use mongodb::{
    bson::{doc, Document},
    change_stream::event::OperationType,
    options::{ChangeStreamOptions, FullDocumentType, IndexOptions, ReplaceOptions},
    Client, Collection, IndexModel,
};
use rocket::futures::{StreamExt, TryStreamExt};
use rocket::tokio::{self, sync::mpsc};

use crate::error::{Error, Result};
use crate::model::{ballot::BallotChoices, id::Id, voter::Voter};

use super::{VoterChange, VoterStore, CHANGE_BUFFER};

/// Name of the voter collection.
const COLLECTION: &str = "voters";

pub struct MongoStore {
    voters: Collection<Voter>,
}

impl MongoStore {
    /// Connect to the database and ensure the collection's indexes exist.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        let store = Self {
            voters: db.collection(COLLECTION),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Unique index on `token`: uniqueness is enforced at the store, not
    /// by the generator.
    async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "token": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.voters.create_index(index, None).await?;
        Ok(())
    }
}

#[rocket::async_trait]
impl VoterStore for MongoStore {
    async fn fetch_all(&self) -> Result<Vec<Voter>> {
        let cursor = self.voters.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn upsert_batch(&self, voters: &[Voter]) -> Result<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        for voter in voters {
            self.voters
                .replace_one(voter.id.as_doc(), voter, options.clone())
                .await?;
        }
        Ok(())
    }

    async fn commit_vote(&self, id: Id, choices: &BallotChoices) -> Result<()> {
        // Conditional write: only an unused record can be consumed, so
        // concurrent stations cannot both land a ballot on one token.
        let filter = doc! { "_id": *id, "used": false };
        let update = doc! {
            "$set": {
                "used": true,
                "male_vote": choices.male_vote.as_deref(),
                "female_vote": choices.female_vote.as_deref(),
            }
        };
        let result = self.voters.update_one(filter, update, None).await?;
        if result.matched_count == 0 {
            // Either another station won the race, or the record was
            // wiped mid-session.
            return match self.voters.find_one(id.as_doc(), None).await? {
                Some(_) => Err(Error::TokenAlreadyUsed),
                None => Err(Error::TokenNotFound),
            };
        }
        Ok(())
    }

    async fn wipe(&self) -> Result<()> {
        self.voters
            .delete_many(doc! {}, None)
            .await
            .map_err(|err| Error::WipeFailed(err.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<Option<mpsc::Receiver<VoterChange>>> {
        let pipeline: Vec<Document> = Vec::new();
        let options = ChangeStreamOptions::builder()
            .full_document(Some(FullDocumentType::UpdateLookup))
            .build();
        let mut stream = self.voters.watch(pipeline, options).await?;

        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("Voter change stream failed: {err}");
                        break;
                    }
                };
                let change = match event.operation_type {
                    OperationType::Insert | OperationType::Update | OperationType::Replace => {
                        match event.full_document {
                            Some(voter) => VoterChange::Upserted(voter),
                            None => continue,
                        }
                    }
                    OperationType::Delete => {
                        let id = event
                            .document_key
                            .as_ref()
                            .and_then(|key| key.get_object_id("_id").ok());
                        match id {
                            Some(id) => VoterChange::Removed(id.into()),
                            None => continue,
                        }
                    }
                    OperationType::Drop | OperationType::Invalidate => VoterChange::Cleared,
                    _ => continue,
                };
                if tx.send(change).await.is_err() {
                    // Receiver dropped: the subscription is closed.
                    break;
                }
            }
        });
        Ok(Some(rx))
    }
}
