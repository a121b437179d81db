use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::errors::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_id";

pub fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Resolves the session cookie to a logged-in customer and makes the account
/// available to downstream handlers via request extensions.
pub async fn customer_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::AuthRequired)?;

    let user = state
        .auth
        .current_customer(&session_id)
        .await?
        .ok_or(AppError::AuthRequired)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
