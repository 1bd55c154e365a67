use serde::{Deserialize, Serialize};

/// One presidential ticket entry: the primary nominee and their running
/// mate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub vice_name: String,
}

/// The full candidate slate for both tickets, loaded once at startup and
/// kept in managed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slate {
    pub male_candidates: Vec<Candidate>,
    pub female_candidates: Vec<Candidate>,
}

impl Slate {
    /// Resolve a male-ticket candidate ID to its display name.
    pub fn male_name(&self, id: &str) -> Option<&str> {
        self.male_candidates
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// Resolve a female-ticket candidate ID to its display name.
    pub fn female_name(&self, id: &str) -> Option<&str> {
        self.female_candidates
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// Whether the ID names a candidate on the male ticket.
    pub fn has_male(&self, id: &str) -> bool {
        self.male_name(id).is_some()
    }

    /// Whether the ID names a candidate on the female ticket.
    pub fn has_female(&self, id: &str) -> bool {
        self.female_name(id).is_some()
    }
}
