//! Rating store: per-game star ratings keyed by (game, user).

pub mod domain;
pub mod service;

pub use domain::{GameSummary, Rating, RatingInput, RawRating};
pub use service::{RatingStore, RATINGS_KEY};
