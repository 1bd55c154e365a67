use serde::{Deserialize, Serialize};

/// The choices carried by one submitted ballot.
///
/// A side the voter is not entitled to (or chose not to receive) stays
/// `None`; role rules decide which sides must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotChoices {
    pub male_vote: Option<String>,
    pub female_vote: Option<String>,
}

impl BallotChoices {
    pub fn new(male_vote: Option<String>, female_vote: Option<String>) -> Self {
        Self {
            male_vote,
            female_vote,
        }
    }
}
