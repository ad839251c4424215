use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

/// One user's star rating of one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: Uuid,
    pub game_id: String,
    pub game_name: String,
    pub username: String,
    pub rating: u8,
    /// Trimmed; empty when the user left no comment
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub(crate) fn new(game_id: &str, game_name: &str, username: &str, rating: u8, comment: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id: game_id.to_string(),
            game_name: game_name.to_string(),
            username: username.to_string(),
            rating,
            comment: comment.trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A star value as submitted by a form: a JSON number or the radio input's string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawRating {
    Number(f64),
    Text(String),
}

impl RawRating {
    /// Integer-coerce the way a form's `parseInt` would, then range-check.
    pub fn coerce(&self) -> Result<u8, ServiceError> {
        let value = match self {
            RawRating::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            RawRating::Number(_) => None,
            RawRating::Text(s) => parse_leading_int(s),
        };
        let value = value.ok_or_else(|| ServiceError::validation("rating must be a whole number"))?;
        check_range(value)
    }
}

/// Rating form payload; the game id comes from the route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub rating: Option<RawRating>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// What a game card shows: average, count and the latest ratings.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: String,
    pub game_name: String,
    pub average: f64,
    pub count: usize,
    pub recent: Vec<Rating>,
}

pub(crate) fn check_range(value: i64) -> Result<u8, ServiceError> {
    if (RATING_MIN as i64..=RATING_MAX as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ServiceError::validation(format!("rating must be between {RATING_MIN} and {RATING_MAX}")))
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    // a 0x prefix switches to hex, as parseInt does without a radix
    let (radix, rest) = match rest.get(..2) {
        Some("0x" | "0X") => (16, &rest[2..]),
        _ => (10, rest),
    };
    let end = rest.find(|c: char| !c.is_digit(radix)).unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    // overflow saturates; it is out of range either way
    let magnitude = i64::from_str_radix(&rest[..end], radix).unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Arithmetic mean rounded to one decimal place; 0 for no ratings.
pub fn average(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let total: u32 = ratings.iter().map(|r| r.rating as u32).sum();
    let mean = total as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// The last `n` entries, last position first.
pub fn recent(ratings: &[Rating], n: usize) -> Vec<Rating> {
    ratings.iter().rev().take(n).cloned().collect()
}
