use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use book_recommender::api::{create_router, AppState};
use book_recommender::db::{Catalog, InMemorySessionStore, SessionStore};
use book_recommender::models::Rating;
use book_recommender::services::Predictor;

/// Prefers books with higher ids
struct ByBookId;

impl Predictor for ByBookId {
    fn estimate(&self, _user_id: u32, book_id: u32) -> f64 {
        (book_id as f64 / 10.0).min(5.0)
    }

    fn estimate_unseen(&self, _ratings: &[Rating], book_ids: &[u32]) -> Vec<f64> {
        book_ids.iter().map(|&id| self.estimate(0, id)).collect()
    }

    fn name(&self) -> &'static str {
        "by-book-id"
    }
}

fn books_csv() -> String {
    let mut csv = String::from(
        "book_id,title,authors,year,pages,description,genres,average_rating,ratings_count,small_image_url\n",
    );
    csv.push_str("1,Dune,Frank Herbert,1965,412,Spice.,Science Fiction,4.25,90000,d.jpg\n");
    csv.push_str("2,Emma,Jane Austen,1815,474,Matchmaking.,\"Romance, Classics\",4.0,40000,e.jpg\n");
    csv.push_str("3,Obscure Gem,Nobody,2019,120,Tiny.,Poetry,5.0,2,o.jpg\n");
    for id in 10..22 {
        csv.push_str(&format!(
            "{id},Saga {id},Writer {id},2000,300,Epic.,High Fantasy,{avg:.1},{count},s{id}.jpg\n",
            id = id,
            avg = 3.5 + (id - 10) as f64 * 0.1,
            count = 100 * id
        ));
    }
    csv
}

const RATINGS_CSV: &str = "\
user_id,book_id,rating
1,1,5
1,2,4
2,10,3
";

fn create_state() -> AppState {
    let catalog = Catalog::from_readers(books_csv().as_bytes(), RATINGS_CSV.as_bytes()).unwrap();
    AppState::new(
        Arc::new(catalog),
        Arc::new(ByBookId),
        Arc::new(InMemorySessionStore::new(Duration::from_secs(60))),
    )
}

fn create_test_server(state: AppState) -> TestServer {
    let app = create_router(state);
    let mut server = TestServer::new(app).unwrap();
    server.do_save_cookies();
    server
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(create_state());
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["books"], 15);
    assert_eq!(body["ratings"], 3);
}

#[tokio::test]
async fn test_home_lists_five_popular_books() {
    let server = create_test_server(create_state());
    let response = server.get("/").await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("Popular books"));
    assert!(html.contains("Dune"));
    assert_eq!(html.matches("<div class=\"book\">").count(), 5);
    // two ratings are not enough to beat well-reviewed books
    assert!(!html.contains("Obscure Gem"));
}

#[tokio::test]
async fn test_rating_a_book_is_stored_for_the_session() {
    let state = create_state();
    let server = create_test_server(state.clone());

    let response = server
        .post("/")
        .form(&[("movie_input", "Dune"), ("rating_input", "5")])
        .await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Successfully added [Dune]"));
    assert!(html.contains("<li>Dune (5)</li>"));

    // the rating survives into the next request of the same visitor
    let html = server.get("/").await.text();
    assert!(html.contains("<li>Dune (5)</li>"));
    assert!(html.contains("Picked for you"));
    assert_eq!(state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_invalid_rating_leaves_ratings_unchanged() {
    let server = create_test_server(create_state());

    server
        .post("/")
        .form(&[("movie_input", "Dune"), ("rating_input", "4")])
        .await
        .assert_status_ok();

    let response = server
        .post("/")
        .form(&[("movie_input", "Emma"), ("rating_input", "abc")])
        .await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Invalid rating input."));
    assert!(!html.contains("Successfully added"));
    assert!(html.contains("<li>Dune (4)</li>"));
    assert!(!html.contains("<li>Emma"));
}

#[tokio::test]
async fn test_missing_field_is_reported() {
    let server = create_test_server(create_state());

    let response = server.post("/").form(&[("movie_input", "Dune")]).await;
    response.assert_status_ok();
    assert!(response.text().contains("Title or rating is missing."));
}

#[tokio::test]
async fn test_unknown_title_is_reported() {
    let server = create_test_server(create_state());

    let response = server
        .post("/")
        .form(&[("movie_input", "Middlemarch"), ("rating_input", "4")])
        .await;
    assert!(response
        .text()
        .contains("No book titled [Middlemarch] in the catalog."));
}

#[tokio::test]
async fn test_visitors_do_not_share_ratings() {
    let state = create_state();
    let alice = create_test_server(state.clone());
    let bob = create_test_server(state.clone());

    alice
        .post("/")
        .form(&[("movie_input", "Dune"), ("rating_input", "5")])
        .await
        .assert_status_ok();

    let html = bob.get("/").await.text();
    assert!(!html.contains("<li>Dune (5)</li>"));
    assert_eq!(state.sessions.len().await, 2);
}

#[tokio::test]
async fn test_recommend_with_explicit_ratings() {
    let server = create_test_server(create_state());

    let response = server
        .post("/recommend")
        .json(&json!({ "ratings": { "Dune": 5, "Saga 21": 4 }, "n": 3 }))
        .await;
    response.assert_status_ok();

    let books: Vec<serde_json::Value> = response.json();
    let ids: Vec<u64> = books.iter().map(|b| b["book_id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![20, 19, 18]);
    assert_eq!(books[0]["estimate"], 2.0);
}

#[tokio::test]
async fn test_recommend_uses_session_ratings() {
    let server = create_test_server(create_state());

    server
        .post("/")
        .form(&[("movie_input", "Saga 21"), ("rating_input", "2")])
        .await
        .assert_status_ok();

    let response = server.post("/recommend").json(&json!({})).await;
    response.assert_status_ok();
    let books: Vec<serde_json::Value> = response.json();
    assert_eq!(books.len(), 5);
    assert_eq!(books[0]["book_id"], 20);
}

#[tokio::test]
async fn test_recommend_without_ratings_is_rejected() {
    let server = create_test_server(create_state());
    let response = server.post("/recommend").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommend_unknown_title_is_rejected() {
    let server = create_test_server(create_state());

    let response = server
        .post("/recommend")
        .json(&json!({ "ratings": { "Middlemarch": 4 } }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Unknown titles: Middlemarch");
}

#[tokio::test]
async fn test_recommend_more_than_unread_is_rejected() {
    let server = create_test_server(create_state());

    let response = server
        .post("/recommend")
        .json(&json!({ "ratings": { "Dune": 5 }, "n": 50 }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_recommend_out_of_range_ratings_are_json_errors() {
    let server = create_test_server(create_state());

    for bad in [0, 9, 300, -1] {
        let response = server
            .post("/recommend")
            .json(&json!({ "ratings": { "Dune": bad } }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(
            body["error"],
            format!("Rating {} for [Dune] is outside 1-5", bad)
        );
    }
}

#[tokio::test]
async fn test_recommend_malformed_body_is_json_error() {
    let server = create_test_server(create_state());

    let response = server
        .post("/recommend")
        .json(&json!({ "ratings": { "Dune": "five" } }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());

    let response = server
        .post("/recommend")
        .text("{ not json")
        .content_type("application/json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_genre_page_is_case_insensitive_and_capped() {
    let server = create_test_server(create_state());

    let response = server.get("/genres/fantasy").await;
    response.assert_status_ok();
    let html = response.text();
    assert_eq!(html.matches("<div class=\"book\">").count(), 9);
    assert!(html.contains("Saga 10"));
    assert!(html.contains("Saga 18"));
    assert!(!html.contains("Saga 19"));
    assert!(!html.contains("Dune"));
}

#[tokio::test]
async fn test_genre_page_with_no_matches() {
    let server = create_test_server(create_state());

    let response = server.get("/genres/westerns").await;
    response.assert_status_ok();
    assert!(response.text().contains("No books found for this genre."));
}
