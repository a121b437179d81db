use chrono::{DateTime, Duration, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// In-flight password-reset state, scoped to one client session.
///
/// Typed replacement for ad-hoc `email` / `otp_verify` session keys: the
/// flow either does not exist, exists with an unverified code, or exists
/// with a verified code. A completed reset removes it entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetFlow {
    pub email: String,
    pub otp_verified: bool,
}

impl PasswordResetFlow {
    pub fn started(email: String) -> Self {
        PasswordResetFlow {
            email,
            otp_verified: false,
        }
    }
}

/// One client session, persisted in the `sessions` collection and referenced
/// by an opaque id carried in an HTTP-only cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<PasswordResetFlow>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            customer_id: None,
            reset: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Same data under a fresh id and expiry. Used on login so an id fixed
    /// before authentication never names an authenticated session.
    pub fn regenerated(&self, ttl: Duration) -> Self {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            customer_id: self.customer_id,
            reset: self.reset.clone(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
