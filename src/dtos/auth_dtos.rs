use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^01[0-9]{9}$").unwrap());
static OTP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}$").unwrap());

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone")
            .with_message(Cow::Borrowed("Please enter a valid phone number")))
    }
}

fn validate_otp_digits(otp: &str) -> Result<(), ValidationError> {
    if OTP_RE.is_match(otp) {
        Ok(())
    } else {
        Err(ValidationError::new("otp").with_message(Cow::Borrowed("OTP must be 4 digits")))
    }
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Please enter your name"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(
        length(min = 4, message = "Password must be at least 4 characters"),
        must_match(
            other = "password_confirmation",
            message = "Password and confirm password do not match"
        )
    )]
    pub password: String,

    pub password_confirmation: String,

    #[validate(
        length(equal = 11, message = "Phone number must be 11 digits"),
        custom(function = "validate_phone")
    )]
    pub phone: String,

    #[validate(length(max = 255, message = "Address must be less than 255 characters"))]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        email(message = "Please enter a valid email address."),
        length(max = 255, message = "Please enter a valid email address.")
    )]
    pub email: String,

    #[validate(length(min = 4, message = "Password must be at least 4 characters."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(custom(function = "validate_otp_digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(
        length(min = 4, message = "Password must be at least 4 characters"),
        must_match(
            other = "password_confirmation",
            message = "Password and confirm password do not match"
        )
    )]
    pub password: String,

    pub password_confirmation: String,
}

// Response DTO
//
// Every mutating auth operation answers with a flash payload naming the page
// the client should navigate to next.

#[derive(Debug, Serialize)]
pub struct FlashResponse {
    pub message: String,
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub redirect: String,
}

impl FlashResponse {
    pub fn success(message: &str, redirect: &str) -> Self {
        FlashResponse {
            message: message.to_string(),
            status: true,
            code: None,
            redirect: redirect.to_string(),
        }
    }

    pub fn success_with_code(message: &str, redirect: &str, code: u16) -> Self {
        FlashResponse {
            code: Some(code),
            ..Self::success(message, redirect)
        }
    }

    pub fn failure(message: &str, redirect: &str) -> Self {
        FlashResponse {
            message: message.to_string(),
            status: false,
            code: None,
            redirect: redirect.to_string(),
        }
    }
}
