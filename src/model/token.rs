use std::fmt::Display;
use std::str::FromStr;

use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LENGTH: usize = 8;

/// Symbols a token may contain. `0`, `1`, `I` and `O` are left out so
/// printed credentials survive manual transcription.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A single-use voting credential code.
///
/// Eight symbols drawn from [`ALPHABET`]. The same string is the payload
/// of the printed QR code and the manual-entry fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token {
    #[serde(with = "serialize_token")]
    code: [u8; LENGTH],
}

impl Token {
    /// Generate a random token. Uniqueness is not checked here; callers
    /// pair generation with a collision check against existing tokens.
    pub fn random() -> Self {
        let mut code = [0; LENGTH];
        let symbol_dist = Uniform::from(0..ALPHABET.len());
        let mut rng = rand::thread_rng();
        for symbol in &mut code {
            *symbol = ALPHABET[symbol_dist.sample(&mut rng)];
        }
        Self { code }
    }

    /// The token as the exact string a voter types or scans.
    pub fn as_str(&self) -> &str {
        // Valid because the alphabet is pure ASCII.
        std::str::from_utf8(&self.code).unwrap()
    }
}

/// (De)serialisation for tokens as plain strings.
mod serialize_token {
    use serde::{
        de::{Error, Unexpected, Visitor},
        Deserializer, Serializer,
    };

    use super::{ALPHABET, LENGTH};

    pub fn serialize<S>(code: &[u8; LENGTH], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&code.iter().map(|b| *b as char).collect::<String>())
    }

    struct StrVisitor;

    impl<'de> Visitor<'de> for StrVisitor {
        type Value = [u8; LENGTH];

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(formatter, "a string of {} token symbols", LENGTH)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            if v.len() != LENGTH {
                return Err(E::invalid_length(
                    v.len(),
                    &format!("a string of {} token symbols", LENGTH).as_str(),
                ));
            }

            let mut code = [0; LENGTH];
            for (slot, c) in code.iter_mut().zip(v.chars()) {
                if !c.is_ascii() || !ALPHABET.contains(&(c as u8)) {
                    return Err(E::invalid_value(
                        Unexpected::Char(c),
                        &"a character from the token alphabet",
                    ));
                }
                *slot = c as u8;
            }
            Ok(code)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; LENGTH], D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(StrVisitor)
    }
}

impl Display for Token {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl FromStr for Token {
    type Err = ParseError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let len = string.len();
        if len != LENGTH {
            return Err(Self::Err::InvalidLength(len));
        }
        let mut code = [0; LENGTH];
        for (slot, c) in code.iter_mut().zip(string.chars()) {
            if !c.is_ascii() || !ALPHABET.contains(&(c as u8)) {
                return Err(Self::Err::InvalidChar(c));
            }
            *slot = c as u8;
        }
        Ok(Self { code })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("token must contain exactly 8 characters")]
    InvalidLength(usize),
    #[error("token must contain only characters from the token alphabet")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_use_the_alphabet() {
        for _ in 0..100 {
            let token = Token::random();
            let string = token.as_str();
            assert_eq!(string.len(), LENGTH);
            assert!(string.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn alphabet_has_no_confusable_symbols() {
        for confusable in [b'0', b'1', b'I', b'O'] {
            assert!(!ALPHABET.contains(&confusable));
        }
        assert_eq!(ALPHABET.len(), 32);
    }

    #[test]
    fn parse_round_trip() {
        let token = Token::random();
        let reparsed = token.as_str().parse::<Token>().unwrap();
        assert_eq!(token, reparsed);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            "ABC".parse::<Token>(),
            Err(ParseError::InvalidLength(3))
        );
        assert_eq!(
            "ABCD123O".parse::<Token>(),
            Err(ParseError::InvalidChar('1'))
        );
        assert_eq!(
            "abcd2345".parse::<Token>(),
            Err(ParseError::InvalidChar('a'))
        );
    }

    #[test]
    fn serde_round_trips_as_string() {
        let token: Token = "ABCD2345".parse().unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"ABCD2345\"");
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(token, back);
    }

    #[test]
    fn deserialize_rejects_foreign_symbols() {
        assert!(serde_json::from_str::<Token>("\"ABCD123O\"").is_err());
        assert!(serde_json::from_str::<Token>("\"TOOLONGCODE\"").is_err());
    }
}
