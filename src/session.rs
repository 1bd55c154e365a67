//! The voting session: from token entry to committed ballot.

use crate::error::{Error, Result};
use crate::model::{ballot::BallotChoices, id::Id, role::Role, voter::Voter};
use crate::registry::SharedRegistry;

/// Progress of a single voting session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unverified,
    Authenticated { id: Id, role: Role },
    Submitted,
}

/// A voter's journey from token entry to committed ballot.
///
/// `authenticate` binds the session to a record; `submit` consumes the
/// token. Rejections leave the state unchanged, so retrying is always
/// possible until a commit actually lands. A successful submit is
/// terminal.
pub struct VoteSession {
    registry: SharedRegistry,
    state: State,
}

impl VoteSession {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            state: State::Unverified,
        }
    }

    /// Validate a presented token and bind the session to its record.
    ///
    /// The input is trimmed; the match is exact and case-sensitive.
    pub async fn authenticate(&mut self, raw: &str) -> Result<Voter> {
        if self.state == State::Submitted {
            return Err(Error::BadRequest(
                "session already completed".to_string(),
            ));
        }

        let token = raw.trim();
        let voter = self
            .registry
            .find_by_token(token)
            .await
            .ok_or(Error::TokenNotFound)?;
        if voter.used {
            return Err(Error::TokenAlreadyUsed);
        }

        self.state = State::Authenticated {
            id: voter.id,
            role: voter.role,
        };
        Ok(voter)
    }

    /// Commit the ballot for the authenticated voter.
    ///
    /// The role check runs before any store write. On a store failure the
    /// session stays authenticated and the call may be retried; losing
    /// the commit race surfaces as a late `TokenAlreadyUsed`.
    pub async fn submit(&mut self, choices: BallotChoices) -> Result<()> {
        let (id, role) = match self.state {
            State::Authenticated { id, role } => (id, role),
            State::Unverified => {
                return Err(Error::BadRequest("ballot not yet authenticated".to_string()))
            }
            State::Submitted => {
                return Err(Error::BadRequest("ballot already submitted".to_string()))
            }
        };

        role.validate(&choices)?;

        self.registry.commit_vote(id, &choices).await?;
        self.state = State::Submitted;
        Ok(())
    }
}
