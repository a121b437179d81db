use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Account role. Only `customer` accounts may log in through this API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// Sentinel stored in the `otp` field when no reset code is active.
pub const OTP_CLEARED: &str = "0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    pub role: Role,

    #[serde(default = "default_otp")]
    pub otp: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_otp() -> String {
    OTP_CLEARED.to_string()
}

impl User {
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        phone: String,
        address: Option<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        User {
            _id: None,
            name,
            email,
            password_hash,
            phone,
            address,
            role,
            otp: OTP_CLEARED.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            phone: user.phone,
            address: user.address,
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn new_user_starts_with_cleared_otp() {
        let user = User::new(
            "Rahim".into(),
            "rahim@example.com".into(),
            "hash".into(),
            "01712345678".into(),
            None,
            Role::Customer,
        );
        assert_eq!(user.otp, OTP_CLEARED);
    }

    #[test]
    fn response_never_contains_password_hash() {
        let mut user = User::new(
            "Rahim".into(),
            "rahim@example.com".into(),
            "hash".into(),
            "01712345678".into(),
            Some("Dhaka".into()),
            Role::Customer,
        );
        user._id = Some(ObjectId::new());
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "customer");
        assert_eq!(json["address"], "Dhaka");
    }
}
