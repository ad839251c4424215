use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use service::notice::Notice;
use service::rating::{GameSummary, Rating, RatingInput};

use super::AppState;
use crate::errors::ApiError;

#[derive(Serialize)]
pub struct RatingOutput {
    pub notice: Notice,
    pub rating: Rating,
}

/// Summaries for every game in the catalog, in catalog order.
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<GameSummary>> {
    let mut out = Vec::with_capacity(state.site.games.len());
    for game in &state.site.games {
        out.push(state.ratings.summary(&game.id, &game.name, state.site.recent_ratings).await);
    }
    Json(out)
}

pub async fn game_summary(State(state): State<AppState>, Path(game_id): Path<String>) -> Json<GameSummary> {
    let name = state.site.game_name(&game_id).unwrap_or(&game_id).to_string();
    Json(state.ratings.summary(&game_id, &name, state.site.recent_ratings).await)
}

pub async fn add_rating(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Json(input): Json<RatingInput>,
) -> Result<Json<RatingOutput>, ApiError> {
    let Some(raw) = input.rating else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, state.notice(Notice::warning("please choose a star rating"))));
    };
    let value = raw.coerce().map_err(|e| state.reject(e))?;

    // the rating form does not always carry the name; the catalog knows it
    let game_name = match input.game_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => state.site.game_name(&game_id).unwrap_or_default().to_string(),
    };
    let comment = input.comment.unwrap_or_default();

    let rating = state
        .ratings
        .add_rating(&game_id, &game_name, value, &comment)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(RatingOutput { notice: state.notice(Notice::success("rating saved")), rating }))
}

/// The current user's rating, used to pre-fill the rating form.
pub async fn my_rating(State(state): State<AppState>, Path(game_id): Path<String>) -> Json<Option<Rating>> {
    Json(state.ratings.user_rating(&game_id).await)
}
