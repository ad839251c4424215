use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, PasswordHash, Version,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use tracing::{debug, info, instrument};

use super::domain::{validate_password, validate_username, Account};
use super::session::SessionSource;
use crate::errors::ServiceError;
use crate::storage::{JsonDocument, KeyValueStorage};

/// Storage key holding the list of registered accounts.
pub const ACCOUNTS_KEY: &str = "gaming_users";
/// Storage key holding the active session, absent when logged out.
pub const SESSION_KEY: &str = "current_user";

/// Password hashing cost
#[derive(Clone, Debug)]
pub struct AccountConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl AccountConfig {
    fn argon2(&self) -> Result<Argon2<'static>, ServiceError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| ServiceError::Hash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Registered accounts plus the single active session.
pub struct AccountStore {
    accounts: JsonDocument<Vec<Account>>,
    session: JsonDocument<Option<Account>>,
    argon2: Argon2<'static>,
}

impl AccountStore {
    /// Load accounts and restore any persisted session. Sessions do not expire.
    pub async fn open(storage: Arc<dyn KeyValueStorage>, cfg: AccountConfig) -> Result<Arc<Self>, ServiceError> {
        let argon2 = cfg.argon2()?;
        let accounts = JsonDocument::load(storage.clone(), ACCOUNTS_KEY).await?;
        let session = JsonDocument::load(storage, SESSION_KEY).await?;
        let store = Self { accounts, session, argon2 };
        if let Some(user) = store.current_user().await {
            info!(username = %user.username, "session restored");
        }
        Ok(Arc::new(store))
    }

    /// Register a new account with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::account::{AccountConfig, AccountStore};
    /// use service::storage::MemoryStorage;
    /// use std::sync::Arc;
    /// let cfg = AccountConfig { memory_kib: 64, iterations: 1, parallelism: 1 };
    /// let store = tokio_test::block_on(AccountStore::open(Arc::new(MemoryStorage::new()), cfg)).unwrap();
    /// let account = tokio_test::block_on(store.register("bob", "b@x.com", "secret")).unwrap();
    /// assert_eq!(account.username, "bob");
    /// assert_ne!(account.password_hash, "secret");
    /// ```
    #[instrument(skip(self, email, password), fields(username = %username))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Account, ServiceError> {
        validate_username(username)?;
        validate_password(password)?;
        self.accounts.read(|list| check_available(list, username, email)).await?;

        // hash off the runtime and outside the write lock; availability is re-checked under it
        let hash = hash_password(self.argon2.clone(), password.to_owned()).await?;
        let account = self
            .accounts
            .update(|list| {
                check_available(list, username, email)?;
                let account = Account::new(username, email, hash);
                list.push(account.clone());
                Ok(account)
            })
            .await?;

        info!(user_id = %account.id, "account_registered");
        Ok(account)
    }

    /// Authenticate and make the account the active session, replacing any prior one.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Account, ServiceError> {
        let account = self
            .accounts
            .read(|list| list.iter().find(|a| a.username == username).cloned())
            .await
            .ok_or(ServiceError::Unauthorized)?;

        let verified =
            verify_password(self.argon2.clone(), password.to_owned(), account.password_hash.clone()).await?;
        if !verified {
            return Err(ServiceError::Unauthorized);
        }

        let session = account.clone();
        self.session.update(move |s| { *s = Some(session); Ok(()) }).await?;
        info!(user_id = %account.id, "logged_in");
        Ok(account)
    }

    /// End the active session. Calling it while logged out is a no-op.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ServiceError> {
        if self.session.clear().await? {
            info!("logged_out");
        }
        Ok(())
    }

    pub async fn current_user(&self) -> Option<Account> {
        self.session.snapshot().await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.read(|s| s.is_some()).await
    }

    /// Snapshot of all registered accounts in registration order.
    pub async fn accounts(&self) -> Vec<Account> {
        self.accounts.snapshot().await
    }
}

#[async_trait]
impl SessionSource for AccountStore {
    async fn current_user(&self) -> Option<Account> { AccountStore::current_user(self).await }
}

fn check_available(list: &[Account], username: &str, email: &str) -> Result<(), ServiceError> {
    if list.iter().any(|a| a.username == username) {
        debug!("username taken");
        return Err(ServiceError::conflict("username is already taken"));
    }
    if list.iter().any(|a| a.email == email) {
        debug!("email taken");
        return Err(ServiceError::conflict("email is already registered"));
    }
    Ok(())
}

async fn hash_password(argon2: Argon2<'static>, password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| ServiceError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| ServiceError::Hash(e.to_string()))?
}

async fn verify_password(argon2: Argon2<'static>, password: String, hash: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| ServiceError::Hash(e.to_string()))?;
        Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| ServiceError::Hash(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::collections::HashSet;

    fn fast_config() -> AccountConfig {
        AccountConfig { memory_kib: 64, iterations: 1, parallelism: 1 }
    }

    async fn open_store() -> (Arc<MemoryStorage>, Arc<AccountStore>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = AccountStore::open(storage.clone(), fast_config()).await.expect("store init");
        (storage, store)
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_regardless_of_email() {
        let (_, store) = open_store().await;
        store.register("bob", "b@x.com", "secret").await.unwrap();
        let err = store.register("bob", "other@x.com", "secret").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(store.accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (_, store) = open_store().await;
        store.register("bob", "b@x.com", "secret").await.unwrap();
        let err = store.register("alice", "b@x.com", "secret").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m.contains("email")));
    }

    #[tokio::test]
    async fn matching_is_case_sensitive() {
        let (_, store) = open_store().await;
        store.register("bob", "b@x.com", "secret").await.unwrap();
        store.register("Bob", "B@x.com", "secret").await.unwrap();
        assert_eq!(store.accounts().await.len(), 2);
    }

    #[tokio::test]
    async fn username_length_bounds() {
        let (_, store) = open_store().await;
        for bad in ["ab".to_string(), "a".repeat(21)] {
            let err = store.register(&bad, &format!("{bad}@x.com"), "secret").await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{bad}");
        }
        store.register("abc", "abc@x.com", "secret").await.unwrap();
        store.register(&"a".repeat(20), "long@x.com", "secret").await.unwrap();
        assert_eq!(store.accounts().await.len(), 2);
    }

    #[tokio::test]
    async fn short_password_rejected() {
        let (_, store) = open_store().await;
        let err = store.register("bob", "b@x.com", "12345").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.accounts().await.is_empty());
    }

    #[tokio::test]
    async fn registrations_grow_list_by_one_without_duplicates() {
        let (_, store) = open_store().await;
        let attempts = [
            ("alice", "a@x.com"),
            ("bob", "b@x.com"),
            ("alice", "c@x.com"),
            ("carol", "b@x.com"),
            ("dave", "d@x.com"),
        ];
        for (username, email) in attempts {
            let before = store.accounts().await.len();
            let ok = store.register(username, email, "secret").await.is_ok();
            let after = store.accounts().await.len();
            assert_eq!(after, if ok { before + 1 } else { before });
        }
        let accounts = store.accounts().await;
        assert_eq!(accounts.len(), 3);
        let usernames: HashSet<_> = accounts.iter().map(|a| a.username.as_str()).collect();
        let emails: HashSet<_> = accounts.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(usernames.len(), accounts.len());
        assert_eq!(emails.len(), accounts.len());
    }

    #[tokio::test]
    async fn password_is_stored_hashed() -> Result<(), anyhow::Error> {
        let (storage, store) = open_store().await;
        let account = store.register("bob", "b@x.com", "secret").await?;
        assert_ne!(account.password_hash, "secret");
        assert!(account.password_hash.starts_with("$argon2id$"));
        let raw = storage.get_item(ACCOUNTS_KEY).await?.unwrap();
        assert!(!raw.contains("\"secret\""));
        Ok(())
    }

    #[tokio::test]
    async fn login_and_logout_lifecycle() -> Result<(), anyhow::Error> {
        let (_, store) = open_store().await;
        store.register("bob", "b@x.com", "secret").await?;
        assert!(!store.is_logged_in().await);

        let account = store.login("bob", "secret").await?;
        assert_eq!(account.username, "bob");
        assert!(store.is_logged_in().await);
        assert_eq!(store.current_user().await.map(|a| a.username), Some("bob".to_string()));

        store.logout().await?;
        assert!(store.current_user().await.is_none());
        assert!(!store.is_logged_in().await);

        // idempotent
        store.logout().await?;
        assert!(!store.is_logged_in().await);
        Ok(())
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() -> Result<(), anyhow::Error> {
        let (_, store) = open_store().await;
        store.register("bob", "b@x.com", "secret").await?;
        assert!(matches!(store.login("bob", "wrong!").await, Err(ServiceError::Unauthorized)));
        assert!(matches!(store.login("nobody", "secret").await, Err(ServiceError::Unauthorized)));
        assert!(!store.is_logged_in().await);
        Ok(())
    }

    #[tokio::test]
    async fn login_replaces_previous_session() -> Result<(), anyhow::Error> {
        let (_, store) = open_store().await;
        store.register("alice", "a@x.com", "secret").await?;
        store.register("bob", "b@x.com", "secret").await?;
        store.login("alice", "secret").await?;
        store.login("bob", "secret").await?;
        assert_eq!(store.current_user().await.map(|a| a.username), Some("bob".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn session_is_restored_on_reopen() -> Result<(), anyhow::Error> {
        let (storage, store) = open_store().await;
        store.register("bob", "b@x.com", "secret").await?;
        store.login("bob", "secret").await?;

        let reopened = AccountStore::open(storage.clone(), fast_config()).await?;
        assert!(reopened.is_logged_in().await);
        assert_eq!(reopened.accounts().await.len(), 1);

        reopened.logout().await?;
        assert_eq!(storage.get_item(SESSION_KEY).await?, None);
        let again = AccountStore::open(storage, fast_config()).await?;
        assert!(!again.is_logged_in().await);
        Ok(())
    }

    #[tokio::test]
    async fn failed_persist_leaves_accounts_untouched() -> Result<(), anyhow::Error> {
        let (storage, store) = open_store().await;
        store.register("alice", "a@x.com", "secret").await?;
        storage.fail_writes(true);
        let err = store.register("bob", "b@x.com", "secret").await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(store.accounts().await.len(), 1);

        // login cannot persist the session either, so it stays logged out
        assert!(store.login("alice", "secret").await.is_err());
        assert!(!store.is_logged_in().await);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_registrations_of_one_name_admit_one() -> Result<(), anyhow::Error> {
        let (_, store) = open_store().await;
        let (a, b) = tokio::join!(
            store.register("bob", "b1@x.com", "secret"),
            store.register("bob", "b2@x.com", "secret"),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert!(matches!(a.err().or(b.err()), Some(ServiceError::Conflict(_))));
        assert_eq!(store.accounts().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_account_list_blocks_open_and_survives() -> Result<(), anyhow::Error> {
        let storage = Arc::new(MemoryStorage::new());
        // an earlier layout with a plain-text password and string id
        let legacy = r#"[{"id":"1700000000000","username":"alice","email":"a@x.com","password":"secret","createdAt":"2024-01-01T00:00:00.000Z"}]"#;
        storage.set_item(ACCOUNTS_KEY, legacy.into()).await?;

        let opened = AccountStore::open(storage.clone(), fast_config()).await;
        assert!(matches!(opened, Err(ServiceError::Storage(_))));
        assert_eq!(storage.get_item(ACCOUNTS_KEY).await?.as_deref(), Some(legacy));
        Ok(())
    }

    #[tokio::test]
    async fn serves_as_session_source() -> Result<(), anyhow::Error> {
        let (_, store) = open_store().await;
        store.register("bob", "b@x.com", "secret").await?;
        store.login("bob", "secret").await?;
        let source: Arc<dyn SessionSource> = store.clone();
        assert_eq!(source.current_user().await.map(|a| a.username), Some("bob".to_string()));
        Ok(())
    }
}
