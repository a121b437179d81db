use axum::{routing::post, Router};

use crate::{handlers::auth_otp, state::AppState};

pub fn auth_otp_routes() -> Router<AppState> {
    Router::new()
        // Request a reset code by email
        .route("/send-otp", post(auth_otp::send_otp))
        // Verify the emailed code
        .route("/verify-otp", post(auth_otp::verify_otp))
        // Reset the password once the code is verified
        .route("/reset-password", post(auth_otp::reset_password))
}
