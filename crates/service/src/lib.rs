//! Service layer for the game review site: accounts, sessions and ratings.
//! - Stores mirror their state to a key-value storage as whole JSON documents.
//! - Business rules live here; the HTTP crate only adapts forms and notices.

pub mod account;
pub mod errors;
pub mod notice;
pub mod rating;
pub mod runtime;
pub mod storage;
