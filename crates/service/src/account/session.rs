use async_trait::async_trait;

use super::domain::Account;

/// Who is logged in right now. Consumers that act on behalf of the current
/// user (the rating store) depend on this instead of the whole account store.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn current_user(&self) -> Option<Account>;
}

/// Fixed session for tests and doc examples
pub mod mock {
    use super::*;

    #[derive(Default)]
    pub struct FixedSession(pub Option<Account>);

    #[async_trait]
    impl SessionSource for FixedSession {
        async fn current_user(&self) -> Option<Account> { self.0.clone() }
    }
}
