//! Results export as comma-delimited text.

use crate::model::{candidate::Slate, voter::Voter};

/// Fixed header row of the results export.
pub const EXPORT_HEADER: &str = "Name,Role,Token,Used,Male Vote,Female Vote";

/// Render the voter collection as a results CSV.
///
/// Vote columns carry the resolved candidate display name, or stay empty
/// when that ballot side was not cast (or names an unknown candidate).
pub fn render_results(voters: &[Voter], slate: &Slate) -> String {
    let mut out = String::from(EXPORT_HEADER);
    out.push('\n');
    for voter in voters {
        let male_vote = voter
            .male_vote
            .as_deref()
            .and_then(|id| slate.male_name(id))
            .unwrap_or("");
        let female_vote = voter
            .female_vote
            .as_deref()
            .and_then(|id| slate.female_name(id))
            .unwrap_or("");
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            voter.name,
            voter.role,
            voter.token,
            if voter.used { "Yes" } else { "No" },
            male_vote,
            female_vote,
        ));
    }
    out
}
