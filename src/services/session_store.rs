use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

use crate::errors::Result;
use crate::models::session::Session;

/// Persistence seam for client sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Expired sessions are removed on load and reported as absent.
    async fn load(&self, id: &str) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoSessionStore {
    sessions: Collection<Session>,
}

impl MongoSessionStore {
    pub fn new(db: &Database) -> Self {
        Self {
            sessions: db.collection("sessions"),
        }
    }
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>> {
        let session = self.sessions.find_one(doc! { "_id": id }).await?;
        match session {
            Some(session) if session.is_expired() => {
                self.delete(&session.id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .replace_one(doc! { "_id": &session.id }, session)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.delete_one(doc! { "_id": id }).await?;
        Ok(())
    }
}
