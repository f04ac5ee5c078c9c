//! Credential handling for coterie: argon2 password hashing and the
//! HS256 access/refresh token service.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKind, TokenService};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("wrong token type")]
    WrongKind,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token encoding failed: {0}")]
    Encode(String),
}
