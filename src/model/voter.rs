use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use super::{ballot::BallotChoices, id::Id, role::Role, token::Token};

/// Core voter record data, as stored in the database.
///
/// `used` flips to true exactly once, together with the vote fields, when
/// the ballot is committed; until then both vote fields stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    pub name: String,
    pub role: Role,
    pub token: Token,
    pub used: bool,
    pub male_vote: Option<String>,
    pub female_vote: Option<String>,
}

impl VoterCore {
    /// A fresh, unused record for the given voter.
    pub fn new(name: String, role: Role, token: Token) -> Self {
        Self {
            name,
            role,
            token,
            used: false,
            male_vote: None,
            female_vote: None,
        }
    }
}

/// A voter record with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Voter {
    /// A brand-new record with a freshly generated ID.
    pub fn new(name: String, role: Role, token: Token) -> Self {
        Self {
            id: Id::new(),
            voter: VoterCore::new(name, role, token),
        }
    }

    /// Apply a committed ballot to this record.
    pub(crate) fn mark_used(&mut self, choices: &BallotChoices) {
        self.voter.used = true;
        self.voter.male_vote = choices.male_vote.clone();
        self.voter.female_vote = choices.female_vote.clone();
    }
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_are_unused_with_empty_votes() {
        let voter = Voter::example_male();
        assert!(!voter.used);
        assert!(voter.male_vote.is_none());
        assert!(voter.female_vote.is_none());
    }

    #[test]
    fn serde_uses_the_store_field_names() {
        let voter = Voter::example_female();
        let json = serde_json::to_value(&voter).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["name"], "Bob");
        assert_eq!(json["role"], "female");
        assert_eq!(json["used"], false);
        assert_eq!(json["male_vote"], serde_json::Value::Null);

        let back: Voter = serde_json::from_value(json).unwrap();
        assert_eq!(voter, back);
    }

    #[test]
    fn mark_used_sets_votes_together_with_used() {
        let mut voter = Voter::example_teacher();
        voter.mark_used(&BallotChoices::new(
            Some("m1".to_string()),
            Some("f2".to_string()),
        ));
        assert!(voter.used);
        assert_eq!(voter.male_vote.as_deref(), Some("m1"));
        assert_eq!(voter.female_vote.as_deref(), Some("f2"));
    }
}
