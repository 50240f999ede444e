//! Redactor service
//!
//! Redactors are the site's user accounts. This service covers:
//! - Registration and profile updates (unique usernames)
//! - Login/logout with Argon2id password hashes
//! - Session validation and the per-session visit counter
//! - Listings for the public pages and the admin backend

use crate::db::is_unique_violation;
use crate::db::repositories::{RedactorRepository, SessionRepository};
use crate::models::{
    CreateRedactorInput, InvalidPage, PageRequest, PagedResult, Redactor, RedactorDetail, Session,
    UpdateRedactorInput,
};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 14;

/// Error types for redactor service operations
#[derive(Debug, thiserror::Error)]
pub enum RedactorServiceError {
    #[error("Redactor not found: {0}")]
    NotFound(i64),

    #[error("Username already exists: {0}")]
    UsernameExists(String),

    /// Unknown username, wrong password or inactive account
    #[error("Authentication failed")]
    AuthenticationError,

    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct RedactorService {
    repo: Arc<dyn RedactorRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl RedactorService {
    pub fn new(repo: Arc<dyn RedactorRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    pub fn with_session_expiration(
        repo: Arc<dyn RedactorRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            repo,
            session_repo,
            session_expiration_days,
        }
    }

    pub fn session_expiration_days(&self) -> i64 {
        self.session_expiration_days
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// One page of redactors whose username contains `needle`.
    pub async fn list(
        &self,
        needle: &str,
        page: PageRequest,
        per_page: u32,
    ) -> Result<PagedResult<Redactor>, RedactorServiceError> {
        let total = self
            .repo
            .count_matching(needle)
            .await
            .context("Failed to count redactors")?;
        let params = page.resolve(total, per_page)?;
        let items = self
            .repo
            .find_page(needle, &params)
            .await
            .context("Failed to list redactors")?;
        Ok(PagedResult::new(items, total, &params))
    }

    pub async fn filter_by_substring(
        &self,
        needle: &str,
    ) -> Result<Vec<Redactor>, RedactorServiceError> {
        Ok(self.repo.filter_by_substring(needle).await?)
    }

    /// All redactors, for the publisher checkboxes
    pub async fn list_all(&self) -> Result<Vec<Redactor>, RedactorServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Redactor>, RedactorServiceError> {
        Ok(self.repo.get_by_id(id).await.context("Failed to get redactor by ID")?)
    }

    /// Redactor with the newspapers they publish
    pub async fn get_detail(&self, id: i64) -> Result<Option<RedactorDetail>, RedactorServiceError> {
        let Some(redactor) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        let newspapers = self
            .repo
            .newspapers_of(id)
            .await
            .context("Failed to load redactor newspapers")?;
        Ok(Some(RedactorDetail {
            redactor,
            newspapers,
        }))
    }

    /// Register a redactor. The password is stored hashed.
    pub async fn create(&self, input: CreateRedactorInput) -> Result<Redactor, RedactorServiceError> {
        if self.repo.get_by_username(&input.username).await?.is_some() {
            return Err(RedactorServiceError::UsernameExists(input.username));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let mut redactor = Redactor::new(input.username, password_hash);
        redactor.first_name = input.first_name;
        redactor.last_name = input.last_name;
        redactor.email = input.email;
        redactor.years_of_experience = input.years_of_experience;
        redactor.is_staff = input.is_staff;
        redactor.is_superuser = input.is_superuser;

        match self.repo.create(&redactor).await {
            Ok(created) => {
                tracing::info!(redactor_id = created.id, username = %created.username, "Redactor registered");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(RedactorServiceError::UsernameExists(redactor.username))
            }
            Err(e) => Err(e.context("Failed to create redactor").into()),
        }
    }

    /// Staff account with every permission
    pub async fn create_superuser(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Redactor, RedactorServiceError> {
        let mut input = CreateRedactorInput::new(username, password);
        input.is_staff = true;
        input.is_superuser = true;
        self.create(input).await
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateRedactorInput,
    ) -> Result<Redactor, RedactorServiceError> {
        let mut redactor = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(RedactorServiceError::NotFound(id))?;

        if let Some(existing) = self.repo.get_by_username(&input.username).await? {
            if existing.id != id {
                return Err(RedactorServiceError::UsernameExists(input.username));
            }
        }

        redactor.username = input.username;
        redactor.first_name = input.first_name;
        redactor.last_name = input.last_name;
        redactor.years_of_experience = input.years_of_experience;

        match self.repo.update(&redactor).await {
            Ok(updated) => Ok(updated),
            Err(e) if is_unique_violation(&e) => {
                Err(RedactorServiceError::UsernameExists(redactor.username))
            }
            Err(e) => Err(e.context("Failed to update redactor").into()),
        }
    }

    /// Delete a redactor along with their sessions and publisher links.
    pub async fn delete(&self, id: i64) -> Result<(), RedactorServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete redactor")? {
            return Err(RedactorServiceError::NotFound(id));
        }
        tracing::info!(redactor_id = id, "Redactor deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, RedactorServiceError> {
        Ok(self.repo.count().await?)
    }

    /// Admin listing ordered by experience then username
    pub async fn list_for_admin(&self, search: &str) -> Result<Vec<Redactor>, RedactorServiceError> {
        Ok(self.repo.list_for_admin(search).await?)
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Check credentials and open a new session.
    ///
    /// Unknown usernames, wrong passwords and inactive accounts all fail
    /// with the same `AuthenticationError`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Redactor, Session), RedactorServiceError> {
        let redactor = self
            .repo
            .get_by_username(username)
            .await
            .context("Failed to get redactor by username")?
            .ok_or(RedactorServiceError::AuthenticationError)?;

        let password_valid = verify_password(password, &redactor.password_hash)
            .context("Failed to verify password")?;
        if !password_valid || !redactor.is_active {
            tracing::debug!(username, "Login rejected");
            return Err(RedactorServiceError::AuthenticationError);
        }

        let session = self.create_session(redactor.id).await?;
        let now = Utc::now();
        self.repo
            .update_last_login(redactor.id, now)
            .await
            .context("Failed to record login")?;

        tracing::info!(redactor_id = redactor.id, "Redactor logged in");
        Ok((
            Redactor {
                last_login: Some(now),
                ..redactor
            },
            session,
        ))
    }

    /// Invalidate a session
    pub async fn logout(&self, session_id: &str) -> Result<(), RedactorServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Redactor owning a live session token.
    ///
    /// Expired sessions are removed; inactive accounts are treated as
    /// logged out.
    pub async fn validate_session(
        &self,
        token: &str,
    ) -> Result<Option<Redactor>, RedactorServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {:#}", e);
            }
            return Ok(None);
        }

        let redactor = self
            .repo
            .get_by_id(session.redactor_id)
            .await
            .context("Failed to get redactor")?;
        Ok(redactor.filter(|r| r.is_active))
    }

    /// Count one more index view for this session and return the new total.
    pub async fn record_visit(&self, session_id: &str) -> Result<i64, RedactorServiceError> {
        Ok(self
            .session_repo
            .increment_visits(session_id)
            .await
            .context("Failed to record visit")?)
    }

    /// Delete all expired sessions; returns how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, RedactorServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }

    async fn create_session(&self, redactor_id: i64) -> Result<Session, RedactorServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            redactor_id,
            visits: 0,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        Ok(self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxRedactorRepository, SqlxSessionRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> RedactorService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        RedactorService::new(
            SqlxRedactorRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn writer(username: &str) -> CreateRedactorInput {
        CreateRedactorInput::new(username, "user12test")
            .with_names("Test", "Writer")
            .with_experience(3)
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let service = setup_test_service().await;
        let redactor = service.create(writer("ann")).await.unwrap();
        assert!(redactor.password_hash.starts_with("$argon2id$"));
        assert_eq!(redactor.years_of_experience, 3);
        assert!(!redactor.is_staff);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let service = setup_test_service().await;
        service.create(writer("ann")).await.unwrap();
        assert!(matches!(
            service.create(writer("ann")).await,
            Err(RedactorServiceError::UsernameExists(_))
        ));
    }

    #[tokio::test]
    async fn test_create_superuser() {
        let service = setup_test_service().await;
        let admin = service.create_superuser("admin", "admin12345").await.unwrap();
        assert!(admin.is_staff);
        assert!(admin.is_superuser);
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let service = setup_test_service().await;
        let created = service.create(writer("ann")).await.unwrap();

        let (redactor, session) = service.login("ann", "user12test").await.unwrap();
        assert_eq!(redactor.id, created.id);
        assert!(redactor.last_login.is_some());

        let current = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(current.username, "ann");

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password_or_unknown_user() {
        let service = setup_test_service().await;
        service.create(writer("ann")).await.unwrap();

        assert!(matches!(
            service.login("ann", "wrong").await,
            Err(RedactorServiceError::AuthenticationError)
        ));
        assert!(matches!(
            service.login("nobody", "user12test").await,
            Err(RedactorServiceError::AuthenticationError)
        ));
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_login() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxRedactorRepository::boxed(pool.clone());
        let service = RedactorService::new(repo.clone(), SqlxSessionRepository::boxed(pool));

        let mut redactor = service.create(writer("ann")).await.unwrap();
        redactor.is_active = false;
        repo.update(&redactor).await.unwrap();

        assert!(matches!(
            service.login("ann", "user12test").await,
            Err(RedactorServiceError::AuthenticationError)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = RedactorService::with_session_expiration(
            SqlxRedactorRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        service.create(writer("ann")).await.unwrap();
        let (_, session) = service.login("ann", "user12test").await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_visit_counts_per_session() {
        let service = setup_test_service().await;
        service.create(writer("ann")).await.unwrap();
        let (_, first) = service.login("ann", "user12test").await.unwrap();
        let (_, second) = service.login("ann", "user12test").await.unwrap();

        assert_eq!(service.record_visit(&first.id).await.unwrap(), 1);
        assert_eq!(service.record_visit(&first.id).await.unwrap(), 2);
        assert_eq!(service.record_visit(&second.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_username_conflict() {
        let service = setup_test_service().await;
        service.create(writer("ann")).await.unwrap();
        let bob = service.create(writer("bob")).await.unwrap();

        let input = UpdateRedactorInput {
            username: "ann".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            years_of_experience: 1,
        };
        assert!(matches!(
            service.update(bob.id, input).await,
            Err(RedactorServiceError::UsernameExists(_))
        ));
    }

    #[tokio::test]
    async fn test_detail_and_delete() {
        let service = setup_test_service().await;
        let ann = service.create(writer("ann")).await.unwrap();

        let detail = service.get_detail(ann.id).await.unwrap().unwrap();
        assert!(detail.newspapers.is_empty());

        service.delete(ann.id).await.unwrap();
        assert!(service.get_detail(ann.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete(ann.id).await,
            Err(RedactorServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_for_admin() {
        let service = setup_test_service().await;
        service.create(writer("bob").with_experience(7)).await.unwrap();
        service.create(writer("ann").with_experience(2)).await.unwrap();

        let listed = service.list_for_admin("").await.unwrap();
        assert_eq!(listed[0].username, "ann");
        assert_eq!(service.list_for_admin("7").await.unwrap().len(), 1);
    }
}
