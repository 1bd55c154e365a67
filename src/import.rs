//! Roster import: a pure transform from tabular text to a batch of fresh
//! voter records. Nothing is persisted until the caller stores the batch.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{role::Role, token::Token, voter::Voter};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("Roster is empty or missing data rows")]
    EmptyInput,
    #[error("Roster must have 'Name' and 'Role' columns")]
    MissingColumns,
    #[error("No valid voters found in roster")]
    NoValidRows,
}

/// Parse a comma-delimited roster into new voter records.
///
/// The header row must contain `name` and `role` columns (case-insensitive
/// match, any column order). Data rows with too few fields or an unknown
/// role are dropped. Empty names become a positional placeholder. Every
/// record gets a fresh ID and a fresh token; generated tokens are checked
/// against `existing` and against the batch itself.
pub fn parse_roster(
    text: &str,
    existing: &HashSet<Token>,
) -> std::result::Result<Vec<Voter>, ImportError> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(ImportError::EmptyInput);
    }

    let headers: Vec<String> = lines[0]
        .to_lowercase()
        .split(',')
        .map(|h| h.trim().to_string())
        .collect();
    let name_idx = headers.iter().position(|h| h == "name");
    let role_idx = headers.iter().position(|h| h == "role");
    let (name_idx, role_idx) = match (name_idx, role_idx) {
        (Some(name_idx), Some(role_idx)) => (name_idx, role_idx),
        _ => return Err(ImportError::MissingColumns),
    };

    let mut taken = existing.clone();
    let mut voters = Vec::new();
    for (index, line) in lines.iter().enumerate().skip(1) {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() <= name_idx.max(role_idx) {
            continue;
        }

        let role = match fields[role_idx].to_lowercase().parse::<Role>() {
            Ok(role) => role,
            Err(_) => continue,
        };
        let name = if fields[name_idx].is_empty() {
            format!("Voter {index}")
        } else {
            fields[name_idx].to_string()
        };

        voters.push(Voter::new(name, role, fresh_token(&mut taken)));
    }

    if voters.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    Ok(voters)
}

/// Generate a token not present in `taken`, recording it there.
fn fresh_token(taken: &mut HashSet<Token>) -> Token {
    loop {
        let token = Token::random();
        if taken.insert(token) {
            return token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_existing() -> HashSet<Token> {
        HashSet::new()
    }

    #[test]
    fn imports_a_simple_roster() {
        let batch = parse_roster("name,role\nAlice,male\nBob,female\n", &no_existing()).unwrap();
        assert_eq!(batch.len(), 2);

        assert_eq!(batch[0].name, "Alice");
        assert_eq!(batch[0].role, Role::Male);
        assert_eq!(batch[1].name, "Bob");
        assert_eq!(batch[1].role, Role::Female);
        for voter in &batch {
            assert!(!voter.used);
            assert!(voter.male_vote.is_none());
            assert!(voter.female_vote.is_none());
            assert_eq!(voter.token.as_str().len(), 8);
        }
        assert_ne!(batch[0].token, batch[1].token);
        assert_ne!(batch[0].id, batch[1].id);
    }

    #[test]
    fn header_match_is_case_insensitive_and_order_free() {
        let batch = parse_roster(
            "Class,ROLE,Name\n7A,teacher,Ms Dee\n",
            &no_existing(),
        )
        .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "Ms Dee");
        assert_eq!(batch[0].role, Role::Teacher);
    }

    #[test]
    fn roles_are_normalised_and_unknown_roles_dropped() {
        let batch = parse_roster(
            "name,role\nAlice,MALE\nEve,visitor\nBob,Female\n",
            &no_existing(),
        )
        .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].role, Role::Male);
        assert_eq!(batch[1].role, Role::Female);
    }

    #[test]
    fn short_rows_are_skipped() {
        let batch = parse_roster("name,role\nAlice\nBob,male\n", &no_existing()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "Bob");
    }

    #[test]
    fn empty_names_get_a_positional_placeholder() {
        let batch = parse_roster("name,role\n,male\nBob,female\n", &no_existing()).unwrap();
        assert_eq!(batch[0].name, "Voter 1");
        assert_eq!(batch[1].name, "Bob");
    }

    #[test]
    fn handles_crlf_and_blank_lines() {
        let batch = parse_roster(
            "name,role\r\n\r\nAlice,male\r\n   \r\nBob,female\r\n",
            &no_existing(),
        )
        .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_roster("", &no_existing()), Err(ImportError::EmptyInput));
        assert_eq!(
            parse_roster("name,role\n", &no_existing()),
            Err(ImportError::EmptyInput)
        );
    }

    #[test]
    fn rejects_missing_columns() {
        assert_eq!(
            parse_roster("name,class\nAlice,7A\n", &no_existing()),
            Err(ImportError::MissingColumns)
        );
    }

    #[test]
    fn rejects_rosters_with_no_valid_rows() {
        assert_eq!(
            parse_roster("name,role\nEve,visitor\n", &no_existing()),
            Err(ImportError::NoValidRows)
        );
    }

    #[test]
    fn generated_tokens_avoid_existing_ones() {
        let existing: HashSet<Token> = (0..50).map(|_| Token::random()).collect();
        let batch = parse_roster("name,role\nAlice,male\nBob,female\n", &existing).unwrap();
        for voter in &batch {
            assert!(!existing.contains(&voter.token));
        }
    }
}
