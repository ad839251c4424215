use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, instrument};

use super::domain::{self, check_range, GameSummary, Rating};
use crate::account::SessionSource;
use crate::errors::ServiceError;
use crate::storage::{JsonDocument, KeyValueStorage};

/// Storage key holding the gameId -> ratings mapping.
pub const RATINGS_KEY: &str = "game_ratings";

type RatingsByGame = BTreeMap<String, Vec<Rating>>;

/// Per-game rating lists, at most one entry per user per game.
pub struct RatingStore {
    ratings: JsonDocument<RatingsByGame>,
    session: Arc<dyn SessionSource>,
}

impl RatingStore {
    pub async fn open(storage: Arc<dyn KeyValueStorage>, session: Arc<dyn SessionSource>) -> Result<Arc<Self>, ServiceError> {
        let ratings = JsonDocument::load(storage, RATINGS_KEY).await?;
        Ok(Arc::new(Self { ratings, session }))
    }

    /// Rate a game as the current user. A repeat rating replaces the user's
    /// earlier entry in place; otherwise the rating is appended.
    ///
    /// Fails with [`ServiceError::PermissionDenied`] when nobody is logged in.
    #[instrument(skip(self, game_name, comment), fields(game_id = %game_id))]
    pub async fn add_rating(&self, game_id: &str, game_name: &str, rating: u8, comment: &str) -> Result<Rating, ServiceError> {
        let user = self
            .session
            .current_user()
            .await
            .ok_or_else(|| ServiceError::PermissionDenied("please log in to rate games".into()))?;
        if game_id.trim().is_empty() {
            return Err(ServiceError::validation("game id is required"));
        }
        let value = check_range(rating as i64)?;

        let entry = Rating::new(game_id, game_name, &user.username, value, comment);
        let replaced = self
            .ratings
            .update(|map| {
                let list = map.entry(game_id.to_string()).or_default();
                match list.iter_mut().find(|r| r.username == entry.username) {
                    Some(slot) => {
                        *slot = entry.clone();
                        Ok(true)
                    }
                    None => {
                        list.push(entry.clone());
                        Ok(false)
                    }
                }
            })
            .await?;

        info!(username = %entry.username, rating = entry.rating, replaced, "rating_saved");
        Ok(entry)
    }

    pub async fn average_rating(&self, game_id: &str) -> f64 {
        self.ratings.read(|m| m.get(game_id).map_or(0.0, |l| domain::average(l))).await
    }

    /// The current user's rating for the game, if logged in and rated.
    pub async fn user_rating(&self, game_id: &str) -> Option<Rating> {
        let user = self.session.current_user().await?;
        self.ratings
            .read(|m| m.get(game_id)?.iter().find(|r| r.username == user.username).cloned())
            .await
    }

    /// The last `n` ratings of the game, last position first.
    pub async fn list_recent(&self, game_id: &str, n: usize) -> Vec<Rating> {
        self.ratings.read(|m| m.get(game_id).map(|l| domain::recent(l, n)).unwrap_or_default()).await
    }

    pub async fn ratings(&self, game_id: &str) -> Vec<Rating> {
        self.ratings.read(|m| m.get(game_id).cloned().unwrap_or_default()).await
    }

    pub async fn rating_count(&self, game_id: &str) -> usize {
        self.ratings.read(|m| m.get(game_id).map_or(0, Vec::len)).await
    }

    pub async fn summary(&self, game_id: &str, game_name: &str, recent: usize) -> GameSummary {
        self.ratings
            .read(|m| {
                let list = m.get(game_id).map(Vec::as_slice).unwrap_or_default();
                GameSummary {
                    game_id: game_id.to_string(),
                    game_name: game_name.to_string(),
                    average: domain::average(list),
                    count: list.len(),
                    recent: domain::recent(list, recent),
                }
            })
            .await
    }
}
