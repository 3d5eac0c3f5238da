use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("personality code must have exactly four letters, got '{0}'")]
    Length(String),
    #[error("invalid letter '{letter}' at position {position} of personality code")]
    InvalidLetter { letter: char, position: usize },
    #[error("unknown situation: {0}")]
    UnknownSituation(String),
}

/// Four independent personality axes.
///
/// Each flag is true for the first pole of its axis: extraversion, sensing,
/// thinking, judging. The profile only ever selects a tone variant; it never
/// filters catalog content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PersonalityProfile {
    pub extraverted: bool,
    pub sensing: bool,
    pub thinking: bool,
    pub judging: bool,
}

impl PersonalityProfile {
    pub fn new(extraverted: bool, sensing: bool, thinking: bool, judging: bool) -> Self {
        Self {
            extraverted,
            sensing,
            thinking,
            judging,
        }
    }

    /// Four-letter type code, e.g. "ENTP".
    pub fn code(&self) -> String {
        let mut code = String::with_capacity(4);
        code.push(if self.extraverted { 'E' } else { 'I' });
        code.push(if self.sensing { 'S' } else { 'N' });
        code.push(if self.thinking { 'T' } else { 'F' });
        code.push(if self.judging { 'J' } else { 'P' });
        code
    }

    /// Parse a four-letter type code. Case-insensitive.
    pub fn parse_code(input: &str) -> Result<Self, ProfileError> {
        let letters: Vec<char> = input.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
        if letters.len() != 4 {
            return Err(ProfileError::Length(input.to_string()));
        }

        let axes = [('E', 'I'), ('S', 'N'), ('T', 'F'), ('J', 'P')];
        let mut flags = [false; 4];
        for (position, (letter, (first, second))) in letters.iter().zip(axes).enumerate() {
            flags[position] = match *letter {
                l if l == first => true,
                l if l == second => false,
                _ => {
                    return Err(ProfileError::InvalidLetter {
                        letter: input.trim().chars().nth(position).unwrap_or(*letter),
                        position,
                    })
                }
            };
        }

        Ok(Self::new(flags[0], flags[1], flags[2], flags[3]))
    }
}

/// Where the user physically is right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Situation {
    Office,
    Home,
    Cafe,
    Bed,
    Transit,
    Outside,
}

impl Situation {
    pub const ALL: [Situation; 6] = [
        Self::Office,
        Self::Home,
        Self::Cafe,
        Self::Bed,
        Self::Transit,
        Self::Outside,
    ];

    /// Identifier string: "office", "home", ...
    pub fn id(&self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Home => "home",
            Self::Cafe => "cafe",
            Self::Bed => "bed",
            Self::Transit => "transit",
            Self::Outside => "outside",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Office => "Office",
            Self::Home => "Home",
            Self::Cafe => "Cafe",
            Self::Bed => "Bed",
            Self::Transit => "Transit",
            Self::Outside => "Outside",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, ProfileError> {
        Self::ALL
            .into_iter()
            .find(|s| s.id().eq_ignore_ascii_case(id.trim()))
            .ok_or_else(|| ProfileError::UnknownSituation(id.to_string()))
    }
}
