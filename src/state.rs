use std::sync::Arc;

use chrono::Duration;
use mongodb::Database;

use crate::config::AppConfig;
use crate::services::auth_service::AuthService;
use crate::services::mail_service::SmtpMailer;
use crate::services::session_store::MongoSessionStore;
use crate::services::user_store::MongoUserStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let users = Arc::new(MongoUserStore::new(&db));
        let sessions = Arc::new(MongoSessionStore::new(&db));
        let mailer = Arc::new(SmtpMailer::new(config));
        let auth = AuthService::new(
            users,
            sessions,
            mailer,
            Duration::hours(config.session_ttl_hours),
        );

        AppState { db, auth }
    }
}
