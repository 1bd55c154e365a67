use std::fmt::Display;
use std::str::FromStr;

use rocket::form::{self, FromFormField, ValueField};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::model::ballot::BallotChoices;

/// Which ballot a voter is entitled to, fixed at registration.
///
/// The variant decides which ticket sections the voter sees and which
/// choices must be present before a submission is accepted: `Male` and
/// `Female` vote on their own ticket only, `Teacher` votes on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Male,
    Female,
    Teacher,
}

impl Role {
    /// Whether this role votes on the male ticket.
    pub fn votes_male(self) -> bool {
        matches!(self, Role::Male | Role::Teacher)
    }

    /// Whether this role votes on the female ticket.
    pub fn votes_female(self) -> bool {
        matches!(self, Role::Female | Role::Teacher)
    }

    /// Check submitted choices against this role's requirements.
    ///
    /// Required sides must be present and the other side must be empty;
    /// anything else is a [`Error::RoleMismatch`].
    pub fn validate(self, choices: &BallotChoices) -> Result<()> {
        let male_ok = choices.male_vote.is_some() == self.votes_male();
        let female_ok = choices.female_vote.is_some() == self.votes_female();
        if male_ok && female_ok {
            Ok(())
        } else {
            Err(Error::RoleMismatch(format!(
                "role '{}' requires {} ballot",
                self,
                match (self.votes_male(), self.votes_female()) {
                    (true, true) => "both a male and a female",
                    (true, false) => "exactly a male",
                    _ => "exactly a female",
                },
            )))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Male => "male",
            Role::Female => "female",
            Role::Teacher => "teacher",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(string: &str) -> std::result::Result<Self, Self::Err> {
        match string {
            "male" => Ok(Role::Male),
            "female" => Ok(Role::Female),
            "teacher" => Ok(Role::Teacher),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl<'r> FromFormField<'r> for Role {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        field
            .value
            .parse::<Role>()
            .map_err(|_| form::Error::validation("expected male, female or teacher").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(male: Option<&str>, female: Option<&str>) -> BallotChoices {
        BallotChoices::new(male.map(String::from), female.map(String::from))
    }

    #[test]
    fn male_votes_male_only() {
        assert!(Role::Male.validate(&choices(Some("m1"), None)).is_ok());
        assert!(Role::Male.validate(&choices(None, None)).is_err());
        assert!(Role::Male.validate(&choices(Some("m1"), Some("f1"))).is_err());
        assert!(Role::Male.validate(&choices(None, Some("f1"))).is_err());
    }

    #[test]
    fn female_votes_female_only() {
        assert!(Role::Female.validate(&choices(None, Some("f2"))).is_ok());
        assert!(Role::Female.validate(&choices(Some("m1"), Some("f2"))).is_err());
        assert!(Role::Female.validate(&choices(None, None)).is_err());
    }

    #[test]
    fn teacher_votes_both() {
        assert!(Role::Teacher
            .validate(&choices(Some("m1"), Some("f1")))
            .is_ok());
        // A partial teacher ballot is rejected before any store write.
        assert!(Role::Teacher.validate(&choices(Some("m1"), None)).is_err());
        assert!(Role::Teacher.validate(&choices(None, Some("f1"))).is_err());
    }

    #[test]
    fn parses_lowercase_names_only() {
        assert_eq!("male".parse::<Role>(), Ok(Role::Male));
        assert_eq!("teacher".parse::<Role>(), Ok(Role::Teacher));
        assert!("Male".parse::<Role>().is_err());
        assert!("staff".parse::<Role>().is_err());
    }
}
