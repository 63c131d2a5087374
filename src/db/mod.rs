//! Database module for the coffee auth server
//!
//! This module holds the user record, the credential store contract and
//! its Postgres and in-memory implementations.

pub mod models;
pub mod operations;

pub use models::{NewUser, User};
pub use operations::{DbOperations, InMemoryUserStore, UserStore};
