use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Duration;
use mongodb::bson::oid::ObjectId;

use crate::errors::{AppError, Result};
use crate::models::session::{PasswordResetFlow, Session};
use crate::models::user::{Role, User, OTP_CLEARED};
use crate::services::mail_service::OtpNotifier;
use crate::services::otp_service;
use crate::services::session_store::SessionStore;
use crate::services::user_store::UserStore;

/// Validated registration input. Field-format validation happens at the DTO
/// layer; this service only enforces uniqueness.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: Option<String>,
}

/// Registration, login/logout and the OTP password-reset state machine.
///
/// Reset flow per client session:
/// no flow -> send_otp -> unverified flow -> verify_otp -> verified flow
/// -> reset_password -> no flow. Any reset attempt outside a verified flow
/// is turned away.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    mailer: Arc<dyn OtpNotifier>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        mailer: Arc<dyn OtpNotifier>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            mailer,
            session_ttl,
        }
    }

    /// Create a new customer account with a hashed password.
    pub async fn register(&self, registration: Registration) -> Result<ObjectId> {
        if self.users.email_exists(&registration.email).await? {
            return Err(AppError::EmailTaken);
        }
        if self.users.phone_exists(&registration.phone).await? {
            return Err(AppError::PhoneTaken);
        }

        let password_hash = hash(&registration.password, DEFAULT_COST)?;
        let user = User::new(
            registration.name,
            registration.email,
            password_hash,
            registration.phone,
            registration.address,
            Role::Customer,
        );

        // The unique indexes still apply, so a concurrent duplicate surfaces
        // here as EmailTaken/PhoneTaken.
        self.users.create(&user).await
    }

    /// Verify credentials and establish an authenticated session.
    ///
    /// The failure message never says whether the email or the password was
    /// wrong. On success the session id is regenerated.
    pub async fn login(
        &self,
        session_id: Option<&str>,
        email: &str,
        password: &str,
    ) -> Result<Session> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        if user.role != Role::Customer {
            if let Some(id) = session_id {
                self.sessions.delete(id).await?;
            }
            return Err(AppError::UnauthorizedAccess);
        }

        let old = match session_id {
            Some(id) => self.sessions.load(id).await?,
            None => None,
        };
        let mut session = match old {
            Some(old) => {
                self.sessions.delete(&old.id).await?;
                old.regenerated(self.session_ttl)
            }
            None => Session::new(self.session_ttl),
        };
        session.customer_id = user._id;
        self.sessions.save(&session).await?;

        Ok(session)
    }

    pub async fn logout(&self, session_id: &str) -> Result<()> {
        self.sessions.delete(session_id).await
    }

    /// Resolve a session id to its logged-in customer, if any.
    pub async fn current_customer(&self, session_id: &str) -> Result<Option<User>> {
        let Some(session) = self.sessions.load(session_id).await? else {
            return Ok(None);
        };
        let Some(customer_id) = session.customer_id else {
            return Ok(None);
        };
        self.users.find_by_id(&customer_id).await
    }

    /// Step 1 of the reset flow: email a fresh code and record the flow on
    /// the session. Nothing is persisted unless exactly one account matches,
    /// and the code is only stored after the email goes out.
    pub async fn send_otp(&self, session_id: Option<&str>, email: &str) -> Result<Session> {
        let count = self.users.count_by_email(email).await?;
        if count != 1 {
            return Err(AppError::EmailNotFound);
        }

        let code = otp_service::generate_otp();
        self.mailer.send_otp(email, &code).await?;
        self.users.set_otp(email, &code).await?;

        let mut session = match session_id {
            Some(id) => self.sessions.load(id).await?,
            None => None,
        }
        .unwrap_or_else(|| Session::new(self.session_ttl));
        session.reset = Some(PasswordResetFlow::started(email.to_string()));
        self.sessions.save(&session).await?;

        Ok(session)
    }

    /// Step 2: check the submitted code against the account named by the
    /// session's reset flow. A matching code is cleared immediately, so it
    /// cannot be replayed.
    pub async fn verify_otp(&self, session_id: Option<&str>, otp: &str) -> Result<()> {
        let session = match session_id {
            Some(id) => self.sessions.load(id).await?,
            None => None,
        };
        let Some(mut session) = session else {
            return Err(AppError::InvalidOtp);
        };
        let Some(mut flow) = session.reset.clone() else {
            return Err(AppError::InvalidOtp);
        };

        let count = self.users.count_by_email_and_otp(&flow.email, otp).await?;
        if count != 1 {
            return Err(AppError::InvalidOtp);
        }

        self.users.set_otp(&flow.email, OTP_CLEARED).await?;
        flow.otp_verified = true;
        session.reset = Some(flow);
        self.sessions.save(&session).await?;

        Ok(())
    }

    /// Step 3: replace the password and close the flow. Requires a verified
    /// flow on the session; clearing it means a second reset has to run the
    /// whole OTP dance again.
    pub async fn reset_password(&self, session_id: Option<&str>, password: &str) -> Result<()> {
        let session = match session_id {
            Some(id) => self.sessions.load(id).await?,
            None => None,
        };
        let Some(mut session) = session else {
            return Err(AppError::OtpNotVerified);
        };
        let Some(flow) = session.reset.clone() else {
            return Err(AppError::OtpNotVerified);
        };
        if !flow.otp_verified {
            return Err(AppError::OtpNotVerified);
        }

        let password_hash = hash(password, DEFAULT_COST)?;
        let matched = self
            .users
            .update_password(&flow.email, &password_hash)
            .await?;
        if matched == 0 {
            return Err(AppError::ResetFailed);
        }

        session.reset = None;
        self.sessions.save(&session).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        fn get(&self, email: &str) -> Option<User> {
            self.users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned()
        }

        fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn create(&self, user: &User) -> Result<ObjectId> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == user.email) {
                return Err(AppError::EmailTaken);
            }
            if users.iter().any(|u| u.phone == user.phone) {
                return Err(AppError::PhoneTaken);
            }
            let mut stored = user.clone();
            let id = ObjectId::new();
            stored._id = Some(id);
            users.push(stored);
            Ok(id)
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            Ok(self.get(email))
        }

        async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u._id == Some(*id))
                .cloned())
        }

        async fn count_by_email(&self, email: &str) -> Result<u64> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.email == email)
                .count() as u64)
        }

        async fn count_by_email_and_otp(&self, email: &str, otp: &str) -> Result<u64> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.email == email && u.otp == otp)
                .count() as u64)
        }

        async fn email_exists(&self, email: &str) -> Result<bool> {
            Ok(self.get(email).is_some())
        }

        async fn phone_exists(&self, phone: &str) -> Result<bool> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .any(|u| u.phone == phone))
        }

        async fn set_otp(&self, email: &str, otp: &str) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|u| u.email == email) {
                user.otp = otp.to_string();
            }
            Ok(())
        }

        async fn update_password(&self, email: &str, password_hash: &str) -> Result<u64> {
            let mut users = self.users.lock().unwrap();
            match users.iter_mut().find(|u| u.email == email) {
                Some(user) => {
                    user.password_hash = password_hash.to_string();
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    #[derive(Default)]
    struct MemorySessionStore {
        sessions: Mutex<Vec<Session>>,
    }

    #[async_trait]
    impl SessionStore for MemorySessionStore {
        async fn load(&self, id: &str) -> Result<Option<Session>> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == id && !s.is_expired())
                .cloned())
        }

        async fn save(&self, session: &Session) -> Result<()> {
            let mut sessions = self.sessions.lock().unwrap();
            sessions.retain(|s| s.id != session.id);
            sessions.push(session.clone());
            Ok(())
        }

        async fn delete(&self, id: &str) -> Result<()> {
            self.sessions.lock().unwrap().retain(|s| s.id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        fn last_code(&self) -> Option<String> {
            self.sent.lock().unwrap().last().map(|(_, code)| code.clone())
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OtpNotifier for RecordingMailer {
        async fn send_otp(&self, to: &str, code: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), code.to_string()));
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl OtpNotifier for FailingMailer {
        async fn send_otp(&self, _to: &str, _code: &str) -> Result<()> {
            Err(AppError::Mail("smtp connection refused".into()))
        }
    }

    struct Harness {
        auth: AuthService,
        users: Arc<MemoryUserStore>,
        sessions: Arc<MemorySessionStore>,
        mailer: Arc<RecordingMailer>,
    }

    fn harness() -> Harness {
        let users = Arc::new(MemoryUserStore::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let auth = AuthService::new(
            users.clone(),
            sessions.clone(),
            mailer.clone(),
            Duration::hours(2),
        );
        Harness {
            auth,
            users,
            sessions,
            mailer,
        }
    }

    fn registration(email: &str, phone: &str, password: &str) -> Registration {
        Registration {
            name: "Test Customer".into(),
            email: email.into(),
            password: password.into(),
            phone: phone.into(),
            address: None,
        }
    }

    #[tokio::test]
    async fn registration_is_unique_per_email_and_phone() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();

        let err = h
            .auth
            .register(registration("a@x.com", "01898765432", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));

        let err = h
            .auth
            .register(registration("b@x.com", "01712345678", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PhoneTaken));

        assert_eq!(h.users.len(), 1);
    }

    #[tokio::test]
    async fn registered_password_is_stored_hashed() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();
        let user = h.users.get("a@x.com").unwrap();
        assert_ne!(user.password_hash, "secret");
        assert!(verify("secret", &user.password_hash).unwrap());
        assert_eq!(user.role, Role::Customer);
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();

        let wrong_password = h
            .auth
            .login(None, "a@x.com", "nope")
            .await
            .unwrap_err();
        let unknown_email = h
            .auth
            .login(None, "ghost@x.com", "secret")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn login_rejects_non_customer_and_drops_the_session() {
        let h = harness();
        let admin = User::new(
            "Admin".into(),
            "admin@x.com".into(),
            hash("12345678", DEFAULT_COST).unwrap(),
            "01700000000".into(),
            None,
            Role::Admin,
        );
        h.users.create(&admin).await.unwrap();

        let stale = Session::new(Duration::hours(2));
        h.sessions.save(&stale).await.unwrap();

        let err = h
            .auth
            .login(Some(&stale.id), "admin@x.com", "12345678")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnauthorizedAccess));
        assert!(h.sessions.load(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_regenerates_the_session_id() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();

        let mut before = Session::new(Duration::hours(2));
        before.reset = Some(PasswordResetFlow::started("a@x.com".into()));
        h.sessions.save(&before).await.unwrap();

        let after = h
            .auth
            .login(Some(&before.id), "a@x.com", "secret")
            .await
            .unwrap();

        assert_ne!(after.id, before.id);
        assert!(after.customer_id.is_some());
        // data carries over to the fresh id, the stale id is gone
        assert_eq!(after.reset, before.reset);
        assert!(h.sessions.load(&before.id).await.unwrap().is_none());
        assert!(h.sessions.load(&after.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn logout_removes_the_session() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();
        let session = h.auth.login(None, "a@x.com", "secret").await.unwrap();

        h.auth.logout(&session.id).await.unwrap();
        assert!(h.sessions.load(&session.id).await.unwrap().is_none());
        assert!(h
            .auth
            .current_customer(&session.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn send_otp_is_a_noop_for_unknown_email() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();

        let err = h.auth.send_otp(None, "ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::EmailNotFound));
        assert_eq!(h.mailer.sent_count(), 0);
        assert_eq!(h.users.get("a@x.com").unwrap().otp, OTP_CLEARED);
        assert!(h.sessions.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_otp_mails_and_stores_a_code_in_range() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();

        let session = h.auth.send_otp(None, "a@x.com").await.unwrap();

        let code = h.mailer.last_code().unwrap();
        let value: u32 = code.parse().unwrap();
        assert!((1000..=9999).contains(&value));
        assert_eq!(h.users.get("a@x.com").unwrap().otp, code);

        let flow = session.reset.unwrap();
        assert_eq!(flow.email, "a@x.com");
        assert!(!flow.otp_verified);
    }

    #[tokio::test]
    async fn mail_failure_aborts_before_any_state_change() {
        let users = Arc::new(MemoryUserStore::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let auth = AuthService::new(
            users.clone(),
            sessions.clone(),
            Arc::new(FailingMailer),
            Duration::hours(2),
        );
        let user = User::new(
            "Test".into(),
            "a@x.com".into(),
            hash("secret", DEFAULT_COST).unwrap(),
            "01712345678".into(),
            None,
            Role::Customer,
        );
        users.create(&user).await.unwrap();

        let err = auth.send_otp(None, "a@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));
        assert_eq!(users.get("a@x.com").unwrap().otp, OTP_CLEARED);
        assert!(sessions.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_code_leaves_everything_untouched() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();
        let session = h.auth.send_otp(None, "a@x.com").await.unwrap();
        let real_code = h.mailer.last_code().unwrap();
        let wrong_code = if real_code == "1000" { "1001" } else { "1000" };

        let err = h
            .auth
            .verify_otp(Some(&session.id), wrong_code)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
        assert_eq!(h.users.get("a@x.com").unwrap().otp, real_code);
        let flow = h
            .sessions
            .load(&session.id)
            .await
            .unwrap()
            .unwrap()
            .reset
            .unwrap();
        assert!(!flow.otp_verified);
    }

    #[tokio::test]
    async fn verify_without_a_reset_flow_fails_like_a_wrong_code() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();

        let err = h.auth.verify_otp(None, "1234").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));

        let session = Session::new(Duration::hours(2));
        h.sessions.save(&session).await.unwrap();
        let err = h
            .auth
            .verify_otp(Some(&session.id), "1234")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }

    #[tokio::test]
    async fn a_correct_code_is_single_use() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();
        let session = h.auth.send_otp(None, "a@x.com").await.unwrap();
        let code = h.mailer.last_code().unwrap();

        h.auth.verify_otp(Some(&session.id), &code).await.unwrap();

        assert_eq!(h.users.get("a@x.com").unwrap().otp, OTP_CLEARED);
        let flow = h
            .sessions
            .load(&session.id)
            .await
            .unwrap()
            .unwrap()
            .reset
            .unwrap();
        assert!(flow.otp_verified);

        // replaying the consumed code fails
        let err = h
            .auth
            .verify_otp(Some(&session.id), &code)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }

    #[tokio::test]
    async fn reset_requires_a_verified_flow() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();

        // no session at all
        let err = h.auth.reset_password(None, "newpass").await.unwrap_err();
        assert!(matches!(err, AppError::OtpNotVerified));

        // flow exists but the code was never verified
        let session = h.auth.send_otp(None, "a@x.com").await.unwrap();
        let err = h
            .auth
            .reset_password(Some(&session.id), "newpass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OtpNotVerified));
        assert!(h.auth.login(None, "a@x.com", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn reset_clears_the_flow_so_it_cannot_repeat() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01712345678", "secret"))
            .await
            .unwrap();
        let session = h.auth.send_otp(None, "a@x.com").await.unwrap();
        let code = h.mailer.last_code().unwrap();
        h.auth.verify_otp(Some(&session.id), &code).await.unwrap();

        h.auth
            .reset_password(Some(&session.id), "newpass")
            .await
            .unwrap();

        let stored = h.sessions.load(&session.id).await.unwrap().unwrap();
        assert!(stored.reset.is_none());

        let err = h
            .auth
            .reset_password(Some(&session.id), "another")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OtpNotVerified));
    }

    #[tokio::test]
    async fn full_reset_flow_end_to_end() {
        let h = harness();
        h.auth
            .register(registration("a@x.com", "01234567890", "secret"))
            .await
            .unwrap();
        let login = h.auth.login(None, "a@x.com", "secret").await.unwrap();
        assert!(login.customer_id.is_some());

        let session = h.auth.send_otp(Some(&login.id), "a@x.com").await.unwrap();
        let code = h.mailer.last_code().unwrap();
        h.auth.verify_otp(Some(&session.id), &code).await.unwrap();
        h.auth
            .reset_password(Some(&session.id), "newpass")
            .await
            .unwrap();

        let old = h.auth.login(None, "a@x.com", "secret").await.unwrap_err();
        assert!(matches!(old, AppError::InvalidCredentials));
        assert!(h.auth.login(None, "a@x.com", "newpass").await.is_ok());
    }
}
