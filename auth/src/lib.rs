//! Stateless token authentication primitives.
//!
//! Provides the pieces a service needs to authenticate requests without a
//! session store:
//! - Password hashing and verification (Argon2id)
//! - Signed token issuance and verification (HS256, millisecond timestamps)
//! - The authentication decision tying both together
//!
//! Nothing in this crate performs I/O. Loading the stored identity behind a
//! subject is left to the calling service.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordVerifier;
//!
//! let verifier = PasswordVerifier::new();
//! let hash = verifier.hash("my_password").unwrap();
//! assert!(verifier.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{Principal, TokenCodec};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!", Duration::hours(1)).unwrap();
//! let principal = Principal::new(7, "alice@example.com", "$argon2id$...");
//! let token = codec.issue(&principal).unwrap();
//!
//! assert!(codec.verify(&token));
//! assert_eq!(codec.extract_subject(&token).unwrap(), "alice@example.com");
//! ```
//!
//! ## Complete Authentication Flow
//! ```
//! use auth::{Authenticator, Principal, TokenCodec};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!", Duration::hours(1)).unwrap();
//! let auth = Authenticator::new(codec);
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify against the stored principal and issue a token
//! let principal = Principal::new(1, "alice@example.com", hash);
//! let result = auth.authenticate("password123", Some(principal)).unwrap();
//!
//! // Later requests
//! assert!(auth.verify_token(&result.access_token));
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod principal;

// Re-export commonly used items
pub use authenticator::Authentication;
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::TokenCodec;
pub use password::PasswordError;
pub use password::PasswordVerifier;
pub use principal::Principal;
