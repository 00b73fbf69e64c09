//! # Identity
//!
//! Port to the identity provider (email/password accounts), the in-memory
//! adapter used in development, and the loyalty lookup that depends on who
//! is signed in.
//!
//! ## Sign-up Flow
//! ```text
//! sign_up(email, password)
//!     │
//!     ├── validate email / password
//!     ├── hash password (argon2)
//!     ├── write users/<uid> profile (role: customer) ── refused? ──► Err
//!     └── account stored, identity becomes current
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use frutiandante_core::cart::LoyaltyStatus;
use frutiandante_core::validation::{validate_customer_name, validate_email};
use frutiandante_core::{UserProfile, UserRole, ValidationError};

use crate::backend::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::queries::completed_orders_for_user;
use crate::writes::Writer;

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current(&self) -> Option<Identity>;

    /// Sign-in state changes.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Identity>;

    /// Creates an account and its `users/<uid>` profile, then signs in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> StoreResult<Identity>;

    async fn sign_out(&self) -> StoreResult<()>;
}

// =============================================================================
// Loyalty
// =============================================================================

/// Loyalty status of the current buyer: guests never qualify, signed-in
/// users are counted by their completed orders.
pub async fn loyalty_status(
    store: &dyn RecordStore,
    identity: Option<&Identity>,
) -> StoreResult<LoyaltyStatus> {
    let Some(identity) = identity else {
        return Ok(LoyaltyStatus::guest());
    };

    let snapshot = store.run_query(&completed_orders_for_user(&identity.uid)).await?;
    let completed = u32::try_from(snapshot.len()).unwrap_or(u32::MAX);
    debug!(uid = %identity.uid, completed, "Loyalty status computed");
    Ok(LoyaltyStatus::member(completed))
}

// =============================================================================
// Password Hashing
// =============================================================================

fn hash_password(password: &str) -> StoreResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Unavailable(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Memory Identity Provider
// =============================================================================

struct Account {
    uid: String,
    password_hash: String,
    display_name: Option<String>,
}

/// In-memory identity provider. Accounts are keyed by lowercase email.
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    current: watch::Sender<Option<Identity>>,
    writer: Writer,
}

impl MemoryIdentity {
    pub fn new(writer: Writer) -> Self {
        let (current, _) = watch::channel(None);
        MemoryIdentity {
            accounts: Mutex::new(HashMap::new()),
            current,
            writer,
        }
    }

    pub fn shared(writer: Writer) -> Arc<Self> {
        Arc::new(Self::new(writer))
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Identity> {
        let key = email.trim().to_lowercase();
        let identity = {
            let accounts = self.accounts();
            let account = accounts.get(&key).ok_or(StoreError::InvalidCredentials)?;
            if !verify_password(password, &account.password_hash) {
                return Err(StoreError::InvalidCredentials);
            }
            Identity {
                uid: account.uid.clone(),
                email: key,
                display_name: account.display_name.clone(),
            }
        };

        info!(uid = %identity.uid, "Signed in");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> StoreResult<Identity> {
        let key = email.trim().to_lowercase();
        validate_email(&key)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::TooShort {
                field: "password".to_string(),
                min: MIN_PASSWORD_LENGTH,
            }
            .into());
        }
        let display_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        if let Some(name) = &display_name {
            validate_customer_name(name)?;
        }
        if self.accounts().contains_key(&key) {
            return Err(StoreError::AccountExists(key));
        }

        let uid = Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(password)?;

        let profile = UserProfile {
            id: uid.clone(),
            email: key.clone(),
            display_name: display_name.clone(),
            phone: None,
            role: UserRole::Customer,
            created_at: Some(Utc::now()),
        };
        self.writer.put(&uid, &profile).await?;

        {
            let mut accounts = self.accounts();
            if accounts.contains_key(&key) {
                return Err(StoreError::AccountExists(key));
            }
            accounts.insert(
                key.clone(),
                Account {
                    uid: uid.clone(),
                    password_hash,
                    display_name: display_name.clone(),
                },
            );
        }

        let identity = Identity {
            uid,
            email: key,
            display_name,
        };
        info!(uid = %identity.uid, "Account created");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> StoreResult<()> {
        if let Some(identity) = self.current.send_replace(None) {
            info!(uid = %identity.uid, "Signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::failure::OperationKind;
    use crate::memory::MemoryStore;
    use crate::target::DocumentRef;
    use serde_json::json;

    fn setup() -> (MemoryStore, MemoryIdentity) {
        let store = MemoryStore::new();
        let writer = Writer::new(Arc::new(store.clone()), EventBus::new());
        (store, MemoryIdentity::new(writer))
    }

    #[tokio::test]
    async fn test_sign_up_creates_customer_profile() {
        let (store, identity) = setup();
        let user = identity
            .sign_up("Ana@Example.com", "secreto1", Some("Ana"))
            .await
            .unwrap();

        assert_eq!(user.email, "ana@example.com");
        assert_eq!(identity.current(), Some(user.clone()));
        let profile = store.document(&DocumentRef::new("users", &user.uid)).unwrap();
        assert_eq!(profile["role"], "customer");
        assert_eq!(profile["email"], "ana@example.com");
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let (_store, identity) = setup();
        identity.sign_up("ana@example.com", "secreto1", None).await.unwrap();
        identity.sign_out().await.unwrap();
        assert_eq!(identity.current(), None);

        assert_eq!(
            identity.sign_in("ana@example.com", "otra-clave").await.unwrap_err(),
            StoreError::InvalidCredentials
        );
        let user = identity.sign_in("ANA@example.com", "secreto1").await.unwrap();
        assert_eq!(identity.current(), Some(user));
    }

    #[tokio::test]
    async fn test_duplicate_and_weak_sign_ups_rejected() {
        let (_store, identity) = setup();
        identity.sign_up("ana@example.com", "secreto1", None).await.unwrap();

        assert!(matches!(
            identity.sign_up("ana@example.com", "secreto2", None).await,
            Err(StoreError::AccountExists(_))
        ));
        assert!(matches!(
            identity.sign_up("beto@example.com", "123", None).await,
            Err(StoreError::Core(_))
        ));
    }

    #[tokio::test]
    async fn test_refused_profile_write_creates_no_account() {
        let (store, identity) = setup();
        store.deny("users", OperationKind::Create);

        let err = identity
            .sign_up("ana@example.com", "secreto1", None)
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(identity.current(), None);
        assert!(identity.sign_in("ana@example.com", "secreto1").await.is_err());
    }

    #[tokio::test]
    async fn test_loyalty_status_counts_completed_orders() {
        let store = MemoryStore::new();
        let ana = Identity {
            uid: "u1".into(),
            email: "ana@example.com".into(),
            display_name: None,
        };
        assert_eq!(
            loyalty_status(&store, None).await.unwrap(),
            LoyaltyStatus::guest()
        );
        assert!(!loyalty_status(&store, Some(&ana)).await.unwrap().qualifies());

        store.seed(
            &DocumentRef::new("orders", "o1"),
            json!({"userId": "u1", "status": "completed"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let status = loyalty_status(&store, Some(&ana)).await.unwrap();
        assert_eq!(status, LoyaltyStatus::member(1));
        assert!(status.qualifies());
    }
}
