//! Authentication module for the coffee auth server
//!
//! This module handles password hashing, session token issuance,
//! the register/login flows and their HTTP handlers.

pub mod handlers;
mod password;
mod service;
mod token;

pub use password::PasswordHasher;
pub use service::{AuthService, Registration};
pub use token::{Claims, TokenIssuer, TokenKind};
