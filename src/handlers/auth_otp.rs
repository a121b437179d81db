use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::dtos::auth_dtos::{
    FlashResponse, ResetPasswordRequest, SendOtpRequest, VerifyOtpRequest,
};
use crate::errors::{AppError, Result};
use crate::middleware::auth::{session_cookie, SESSION_COOKIE};
use crate::state::AppState;

fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

// 1. Email a reset code
pub async fn send_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SendOtpRequest>,
) -> Result<Response> {
    req.validate().map_err(AppError::Validation)?;

    let sid = session_id(&jar);
    match state.auth.send_otp(sid.as_deref(), &req.email).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(session.id));
            Ok((
                jar,
                Json(FlashResponse::success(
                    "OTP has been sent to your email address",
                    "/verify-otp",
                )),
            )
                .into_response())
        }
        Err(AppError::EmailNotFound) => Ok((
            StatusCode::NOT_FOUND,
            Json(FlashResponse::failure("Email address not found", "/send-otp")),
        )
            .into_response()),
        Err(AppError::Mail(e)) => {
            tracing::error!("Failed to send OTP email: {}", e);
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(FlashResponse::failure(
                    "Failed to send OTP email",
                    "/send-otp",
                )),
            )
                .into_response())
        }
        Err(err) => Err(err),
    }
}

// 2. Verify the submitted code
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Response> {
    req.validate().map_err(AppError::Validation)?;

    let sid = session_id(&jar);
    match state.auth.verify_otp(sid.as_deref(), &req.otp).await {
        Ok(()) => Ok(Json(FlashResponse::success(
            "OTP verified successfully",
            "/reset-password",
        ))
        .into_response()),
        Err(AppError::InvalidOtp) => Ok((
            StatusCode::BAD_REQUEST,
            Json(FlashResponse::failure(
                "Invalid OTP, please try again",
                "/verify-otp",
            )),
        )
            .into_response()),
        Err(err) => Err(err),
    }
}

// 3. Reset the password with a verified code
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Response> {
    req.validate().map_err(AppError::Validation)?;

    let sid = session_id(&jar);
    match state.auth.reset_password(sid.as_deref(), &req.password).await {
        Ok(()) => Ok(Json(FlashResponse::success(
            "Password reset successfully",
            "/login",
        ))
        .into_response()),
        Err(AppError::OtpNotVerified) => Ok((
            StatusCode::FORBIDDEN,
            Json(FlashResponse::failure("Please verify OTP first", "/send-otp")),
        )
            .into_response()),
        Err(err) => {
            // the caller only ever sees a generic message; the detail stays
            // in the server log
            tracing::error!("Password reset failed: {}", err);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FlashResponse::failure(
                    "Something went wrong",
                    "/reset-password",
                )),
            )
                .into_response())
        }
    }
}
