use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Html,
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::{SessionId, GENRE_PAGE_SIZE},
    error::{AppError, AppResult},
    models::{is_valid_rating, RecommendedBook, TitleRatings},
    services::{top_rated, DEFAULT_RECOMMENDATIONS, HOME_LIST_SIZE},
};

use super::views::{self, HomePage};
use super::AppState;

// Request/Response types

/// Rating form submitted from the home page
#[derive(Debug, Deserialize)]
pub struct RatingForm {
    pub movie_input: Option<String>,
    pub rating_input: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    /// Title ratings to recommend from; the session's ratings when absent
    ///
    /// Read wider than the rating scale so out-of-range values reach validation.
    pub ratings: Option<BTreeMap<String, i64>>,
    pub n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub books: usize,
    pub ratings: usize,
}

/// Outcome of validating one form submission
#[derive(Debug, PartialEq)]
enum Submission {
    Accepted { title: String, rating: u8 },
    Rejected(String),
}

fn validate_submission(state: &AppState, form: RatingForm) -> Submission {
    let title = form.movie_input.unwrap_or_default().trim().to_string();
    let raw_rating = form.rating_input.unwrap_or_default().trim().to_string();

    if title.is_empty() || raw_rating.is_empty() {
        return Submission::Rejected("Title or rating is missing.".to_string());
    }

    let rating = match raw_rating.parse::<i64>() {
        Ok(rating) => rating,
        Err(e) => {
            tracing::warn!(error = %e, input = %raw_rating, "Rejected non-integer rating");
            return Submission::Rejected("Invalid rating input.".to_string());
        }
    };

    if !is_valid_rating(rating) {
        return Submission::Rejected("Rating must be between 1 and 5.".to_string());
    }

    if state.catalog.book_id_for_title(&title).is_none() {
        return Submission::Rejected(format!("No book titled [{}] in the catalog.", title));
    }

    Submission::Accepted {
        title,
        rating: rating as u8,
    }
}

/// Personalized picks for a session, or nothing if they cannot be computed
fn session_picks(state: &AppState, ratings: &TitleRatings) -> Vec<RecommendedBook> {
    if ratings.is_empty() {
        return Vec::new();
    }

    match state.personalizer().recommend(ratings, DEFAULT_RECOMMENDATIONS) {
        Ok(picks) => picks,
        Err(e) => {
            tracing::warn!(error = %e, "Personalized recommendations unavailable");
            Vec::new()
        }
    }
}

async fn render_home_for(
    state: &AppState,
    session_id: SessionId,
    notice: Option<String>,
    error: Option<String>,
) -> Html<String> {
    let ratings = state.sessions.ratings(session_id).await;
    let picks = session_picks(state, &ratings);
    let popular = top_rated(state.catalog.books(), HOME_LIST_SIZE);

    views::render_home(&HomePage {
        notice,
        error,
        popular: &popular,
        picks: &picks,
        session_ratings: &ratings,
    })
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        books: state.catalog.books().len(),
        ratings: state.catalog.ratings().len(),
    })
}

/// Home page with popular books and the visitor's picks
pub async fn home(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> Html<String> {
    render_home_for(&state, session_id, None, None).await
}

/// Records one title rating for the visitor, then renders the home page
pub async fn submit_rating(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Form(form): Form<RatingForm>,
) -> Html<String> {
    match validate_submission(&state, form) {
        Submission::Accepted { title, rating } => {
            tracing::info!(session_id = %session_id, title = %title, rating, "Rating added");
            state
                .sessions
                .add_rating(session_id, title.clone(), rating)
                .await;
            let notice = format!("Successfully added [{}]", title);
            render_home_for(&state, session_id, Some(notice), None).await
        }
        Submission::Rejected(message) => {
            tracing::info!(session_id = %session_id, reason = %message, "Rating rejected");
            render_home_for(&state, session_id, None, Some(message)).await
        }
    }
}

/// Narrows raw JSON ratings onto the rating scale
fn checked_ratings(raw: BTreeMap<String, i64>) -> AppResult<TitleRatings> {
    raw.into_iter()
        .map(|(title, rating)| match u8::try_from(rating) {
            Ok(narrow) if is_valid_rating(rating) => Ok((title, narrow)),
            _ => Err(AppError::InvalidInput(format!(
                "Rating {} for [{}] is outside 1-5",
                rating, title
            ))),
        })
        .collect()
}

/// Personalized recommendations as JSON
pub async fn recommend(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> AppResult<Json<Vec<RecommendedBook>>> {
    let Json(request) = payload?;
    let ratings = match request.ratings {
        Some(raw) => checked_ratings(raw)?,
        None => state.sessions.ratings(session_id).await,
    };
    let n = request.n.unwrap_or(DEFAULT_RECOMMENDATIONS);

    if ratings.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one rated title is required".to_string(),
        ));
    }

    tracing::info!(
        session_id = %session_id,
        rated = ratings.len(),
        n,
        "Processing recommendation request"
    );

    let recommendations = state.personalizer().recommend(&ratings, n)?;
    Ok(Json(recommendations))
}

/// Books whose genres mention `genre`
pub async fn genres(State(state): State<AppState>, Path(genre): Path<String>) -> Html<String> {
    let books = state.catalog.books_by_genre(&genre, GENRE_PAGE_SIZE);
    tracing::debug!(genre = %genre, found = books.len(), "Genre lookup");
    views::render_genre(&genre, &books)
}
