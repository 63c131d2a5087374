use crate::auth::password::PasswordHasher;
use crate::auth::token::{TokenIssuer, TokenKind};
use crate::db::models::{NewUser, User};
use crate::db::operations::UserStore;
use crate::error::{AppError, AuthError, DatabaseError};
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) const REGISTER_FIELDS_REQUIRED: &str = "all fields are required";
pub(crate) const LOGIN_FIELDS_REQUIRED: &str = "All fields are required";

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(
        &self,
        user_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, AppError> {
        if user_name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(REGISTER_FIELDS_REQUIRED.into()));
        }

        // Fast path only; the store's unique constraint is what actually decides.
        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::AlreadyExists.into());
        }

        let password_hash = self.hash_password(password).await?;

        let user = self
            .store
            .create(NewUser {
                user_name: user_name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                AppError::DatabaseError(DatabaseError::Duplicate) => {
                    AppError::AuthError(AuthError::AlreadyExists)
                }
                other => other,
            })?;

        let refresh_token = self.tokens.issue(user.id, TokenKind::Refresh)?;
        let access_token = self.tokens.issue(user.id, TokenKind::Access)?;

        info!("Registered user {}", user.id);

        Ok(Registration {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Checks the credentials. No token is issued here.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        if email.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(LOGIN_FIELDS_REQUIRED.into()));
        }

        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.verify_password(password, &user.password_hash).await? {
            debug!("Password mismatch for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(user)
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::operations::{InMemoryUserStore, MockUserStore};

    fn service_with(store: Arc<dyn UserStore>) -> AuthService {
        AuthService::new(
            store,
            PasswordHasher::new(1).unwrap(),
            TokenIssuer::new("test_secret").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = service_with(store.clone());

        let registration = service.register("alice", "a@x.com", "pw123456").await.unwrap();
        assert_eq!(registration.user.email, "a@x.com");
        assert_ne!(registration.user.password_hash, "pw123456");
        assert_eq!(service.tokens().verify(&registration.access_token).unwrap(), registration.user.id);
        assert_eq!(service.tokens().verify(&registration.refresh_token).unwrap(), registration.user.id);

        let result = service.register("alice", "a@x.com", "other-password").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::AlreadyExists))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_token_kinds() {
        let service = service_with(Arc::new(InMemoryUserStore::new()));
        let registration = service.register("alice", "a@x.com", "pw123456").await.unwrap();

        let access = service.tokens().decode(&registration.access_token).unwrap();
        let refresh = service.tokens().decode(&registration.refresh_token).unwrap();
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(refresh.kind, TokenKind::Refresh);
    }

    #[tokio::test]
    async fn test_register_validation_skips_store() {
        let mut store = MockUserStore::new();
        store.expect_find_by_email().never();
        store.expect_create().never();
        let service = service_with(Arc::new(store));

        for (name, email, password) in [("", "a@x.com", "pw"), ("alice", "", "pw"), ("alice", "a@x.com", "")] {
            let result = service.register(name, email, password).await;
            match result {
                Err(AppError::ValidationError(message)) => assert_eq!(message, "all fields are required"),
                other => panic!("expected validation error, got {:?}", other.map(|r| r.user.id)),
            }
        }
    }

    #[tokio::test]
    async fn test_register_store_race_maps_to_already_exists() {
        let mut store = MockUserStore::new();
        store.expect_find_by_email().times(1).returning(|_| Ok(None));
        store
            .expect_create()
            .times(1)
            .returning(|_| Err(AppError::DatabaseError(DatabaseError::Duplicate)));
        let service = service_with(Arc::new(store));

        let result = service.register("alice", "a@x.com", "pw123456").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::AlreadyExists))));
    }

    #[tokio::test]
    async fn test_register_store_outage_is_internal() {
        let mut store = MockUserStore::new();
        store.expect_find_by_email().returning(|_| {
            Err(AppError::DatabaseError(DatabaseError::ConnectionError("refused".into())))
        });
        let service = service_with(Arc::new(store));

        let err = service.register("alice", "a@x.com", "pw123456").await.unwrap_err();
        assert!(err.is_internal());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_single_winner() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = Arc::new(service_with(store.clone()));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service.register(&format!("user{}", i), "race@x.com", "pw123456").await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(AppError::AuthError(AuthError::AlreadyExists)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_login() {
        let service = service_with(Arc::new(InMemoryUserStore::new()));
        let registration = service.register("alice", "a@x.com", "pw123456").await.unwrap();

        let user = service.login("a@x.com", "pw123456").await.unwrap();
        assert_eq!(user.id, registration.user.id);

        let result = service.login("a@x.com", "wrong").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::InvalidCredentials))));

        let result = service.login("nobody@x.com", "pw123456").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::UserNotFound))));
    }

    #[tokio::test]
    async fn test_login_validation() {
        let service = service_with(Arc::new(InMemoryUserStore::new()));

        let result = service.login("", "pw123456").await;
        assert!(matches!(result, Err(AppError::ValidationError(ref m)) if m == "All fields are required"));

        let result = service.login("a@x.com", "").await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_login_with_corrupt_hash() {
        let mut store = MockUserStore::new();
        store.expect_find_by_email().returning(|email| {
            Ok(Some(User::new(NewUser {
                user_name: "alice".into(),
                email: email.to_string(),
                password_hash: "not-a-phc-string".into(),
            })))
        });
        let service = service_with(Arc::new(store));

        let result = service.login("a@x.com", "pw123456").await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::InvalidCredentials))));
    }
}
