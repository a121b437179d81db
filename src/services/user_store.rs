use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, DateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use crate::errors::{AppError, Result};
use crate::models::user::User;

/// Persistence seam for user accounts. The MongoDB implementation is the
/// production one; tests drive the auth flows through an in-memory stand-in.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> Result<ObjectId>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>>;
    async fn count_by_email(&self, email: &str) -> Result<u64>;
    async fn count_by_email_and_otp(&self, email: &str, otp: &str) -> Result<u64>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn phone_exists(&self, phone: &str) -> Result<bool>;
    async fn set_otp(&self, email: &str, otp: &str) -> Result<()>;
    /// Returns the number of matched users so callers can detect a vanished
    /// account instead of reporting a write that never happened.
    async fn update_password(&self, email: &str, password_hash: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
        }
    }
}

/// Email and phone uniqueness is enforced here, not in application code.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let users = db.collection::<User>("users");
    for field in ["email", "phone"] {
        let index = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(index).await?;
    }
    Ok(())
}

fn map_write_error(err: mongodb::error::Error) -> AppError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
        if write_error.code == 11000 {
            if write_error.message.contains("phone") {
                return AppError::PhoneTaken;
            }
            return AppError::EmailTaken;
        }
    }
    AppError::MongoDB(err)
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn create(&self, user: &User) -> Result<ObjectId> {
        let result = self.users.insert_one(user).await.map_err(map_write_error)?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::ServiceError("inserted user id is not an ObjectId".into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn count_by_email(&self, email: &str) -> Result<u64> {
        Ok(self.users.count_documents(doc! { "email": email }).await?)
    }

    async fn count_by_email_and_otp(&self, email: &str, otp: &str) -> Result<u64> {
        Ok(self
            .users
            .count_documents(doc! { "email": email, "otp": otp })
            .await?)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.count_by_email(email).await? > 0)
    }

    async fn phone_exists(&self, phone: &str) -> Result<bool> {
        Ok(self.users.count_documents(doc! { "phone": phone }).await? > 0)
    }

    async fn set_otp(&self, email: &str, otp: &str) -> Result<()> {
        self.users
            .update_one(
                doc! { "email": email },
                doc! { "$set": {
                    "otp": otp,
                    "updated_at": DateTime::from_millis(Utc::now().timestamp_millis()),
                } },
            )
            .await?;
        Ok(())
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<u64> {
        let result = self
            .users
            .update_one(
                doc! { "email": email },
                doc! { "$set": {
                    "password_hash": password_hash,
                    "updated_at": DateTime::from_millis(Utc::now().timestamp_millis()),
                } },
            )
            .await?;
        Ok(result.matched_count)
    }
}
