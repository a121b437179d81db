pub mod auth_service;
pub mod mail_service;
pub mod otp_service;
pub mod session_store;
pub mod user_store;
