//! Account store: registration, login and the single active session.

pub mod domain;
pub mod service;
pub mod session;

pub use domain::{Account, AccountView, LoginInput, RegisterInput};
pub use service::{AccountConfig, AccountStore, ACCOUNTS_KEY, SESSION_KEY};
pub use session::SessionSource;
