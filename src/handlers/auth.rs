use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::dtos::auth_dtos::{FlashResponse, LoginRequest, RegisterRequest};
use crate::errors::{AppError, Result};
use crate::middleware::auth::{removal_cookie, session_cookie, SESSION_COOKIE};
use crate::models::user::{User, UserResponse};
use crate::services::auth_service::Registration;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    payload.validate().map_err(AppError::Validation)?;

    let registration = Registration {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        phone: payload.phone,
        address: payload.address,
    };

    match state.auth.register(registration).await {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(FlashResponse::success(
                "You are registered successfully",
                "/login",
            )),
        )
            .into_response()),
        Err(err @ (AppError::EmailTaken | AppError::PhoneTaken)) => Err(err),
        Err(AppError::MongoDB(e)) => {
            tracing::error!("Failed to create user: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FlashResponse::failure("Failed to create user", "/register")),
            )
                .into_response())
        }
        Err(err) => Err(err),
    }
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    payload.validate().map_err(AppError::Validation)?;

    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    match state
        .auth
        .login(session_id.as_deref(), &payload.email, &payload.password)
        .await
    {
        Ok(session) => {
            let jar = jar.add(session_cookie(session.id));
            Ok((
                jar,
                Json(FlashResponse::success_with_code("Login Successful", "/", 200)),
            )
                .into_response())
        }
        Err(AppError::InvalidCredentials) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(FlashResponse::failure(
                "Email or Password is incorrect",
                "/login",
            )),
        )
            .into_response()),
        Err(AppError::UnauthorizedAccess) => {
            let jar = jar.remove(removal_cookie());
            Ok((
                StatusCode::FORBIDDEN,
                jar,
                Json(FlashResponse::failure(
                    "Unauthorized Access! Only registered customer can log in.",
                    "/login",
                )),
            )
                .into_response())
        }
        Err(err) => Err(err),
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.auth.logout(cookie.value()).await?;
    }
    let jar = jar.remove(removal_cookie());

    Ok((jar, Json(FlashResponse::success("Logged out successfully", "/"))).into_response())
}

/// Session-guarded: `customer_guard` has already resolved the account.
pub async fn profile(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(user.into())
}
