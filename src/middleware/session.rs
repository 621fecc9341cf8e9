use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::{api::AppState, db::SessionId};

/// Name of the cookie holding the visitor's session ID
pub const SESSION_COOKIE: &str = "bookrec_session";

/// Finds the session cookie among the request's `Cookie` headers
fn session_from_cookies(request: &Request) -> Option<SessionId> {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

/// Middleware that resolves the visitor's session and stores it in the request extensions.
///
/// A cookie naming a live session is reused. Otherwise a fresh session ID is
/// issued and returned to the client in a `Set-Cookie` header. Either way the
/// session is marked active.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = session_from_cookies(&request);
    let live = match presented {
        Some(id) if state.sessions.contains(id).await => Some(id),
        _ => None,
    };
    let session_id = live.unwrap_or_else(SessionId::new);

    state.sessions.touch(session_id).await;
    request.extensions_mut().insert(session_id);

    let mut response = next.run(request).await;

    if live.is_none() {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, session_id
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

/// Helper function to create a tracing span with the session cookie value
pub fn make_span_with_session(request: &Request<Body>) -> tracing::Span {
    let session = session_from_cookies(request)
        .map(|id| id.to_string())
        .unwrap_or_else(|| "new".to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        session = %session,
    )
}
