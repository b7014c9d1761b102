//! Question endpoint with cookie-backed sessions

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse, ErrorResponse};

/// POST /ask - answer a question within the caller's session
///
/// The session cookie is (re)issued whenever a new transcript was started.
pub async fn ask(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> (CookieJar, Response) {
    let cookie_name = state.config().session.cookie_name.clone();
    let token = jar.get(&cookie_name).map(|c| c.value().to_string());
    let session = state.sessions().resolve(token.as_deref());

    let jar = if session.created || token.is_none() {
        jar.add(
            Cookie::build((cookie_name, session.id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        )
    } else {
        jar
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::error!("Invalid /ask body: {}", rejection.body_text());
            let body = Json(ErrorResponse::new(rejection.body_text()));
            return (jar, (StatusCode::BAD_REQUEST, body).into_response());
        }
    };

    let question = request.question.unwrap_or_default();
    let response = match state.orchestrator().answer(session.id, &question).await {
        Ok(answer) => Json(AskResponse { answer }).into_response(),
        Err(e) => {
            tracing::error!("Error during question processing: {}", e);
            e.into_response()
        }
    };

    (jar, response)
}
