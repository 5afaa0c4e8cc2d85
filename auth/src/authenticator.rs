use std::sync::OnceLock;

use crate::jwt::JwtError;
use crate::jwt::TokenCodec;
use crate::password::PasswordError;
use crate::password::PasswordVerifier;
use crate::principal::Principal;

/// Plaintext hashed when the subject is unknown, so that path costs one
/// Argon2 verification like every other login attempt.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-subjects";

/// Authentication decision: password comparison followed by token issuance.
///
/// Also fronts the token codec for per-request verification, so a service
/// only needs to share one `Authenticator`.
pub struct Authenticator {
    password_verifier: PasswordVerifier,
    token_codec: TokenCodec,
    decoy_hash: OnceLock<String>,
}

/// Result of successful authentication.
#[derive(Debug, Clone)]
pub struct Authentication {
    /// Principal the token was issued for
    pub principal: Principal,
    /// Signed access token
    pub access_token: String,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// Unknown subject, wrong password or disabled principal. Never says which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    pub fn new(token_codec: TokenCodec) -> Self {
        Self {
            password_verifier: PasswordVerifier::new(),
            token_codec,
            decoy_hash: OnceLock::new(),
        }
    }

    pub fn token_codec(&self) -> &TokenCodec {
        &self.token_codec
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_verifier.hash(password)
    }

    /// Verify credentials and issue a token.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `candidate` - Principal stored under the presented subject, if any
    ///
    /// # Returns
    /// Authentication with the principal and its access token
    ///
    /// # Errors
    /// * `InvalidCredentials` - No candidate, wrong password or disabled principal
    /// * `PasswordError` - Password verification failed
    /// * `JwtError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        candidate: Option<Principal>,
    ) -> Result<Authentication, AuthenticationError> {
        let Some(principal) = candidate else {
            self.verify_decoy(password)?;
            return Err(AuthenticationError::InvalidCredentials);
        };

        let is_valid = self
            .password_verifier
            .verify(password, &principal.password_hash)?;

        if !is_valid || !principal.enabled {
            return Err(AuthenticationError::InvalidCredentials);
        }

        let access_token = self.token_codec.issue(&principal)?;

        Ok(Authentication {
            principal,
            access_token,
        })
    }

    /// Issue a token without password verification.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_token(&self, principal: &Principal) -> Result<String, JwtError> {
        self.token_codec.issue(principal)
    }

    /// Check a presented token. Never fails.
    pub fn verify_token(&self, token: &str) -> bool {
        self.token_codec.verify(token)
    }

    /// Subject of a token that already passed [`verify_token`](Self::verify_token).
    ///
    /// # Errors
    /// * `JwtError` - Token could not be decoded
    pub fn extract_subject(&self, token: &str) -> Result<String, JwtError> {
        self.token_codec.extract_subject(token)
    }

    fn verify_decoy(&self, password: &str) -> Result<(), PasswordError> {
        let hash = match self.decoy_hash.get() {
            Some(hash) => hash,
            None => {
                let hash = self.password_verifier.hash(DECOY_PASSWORD)?;
                self.decoy_hash.get_or_init(|| hash)
            }
        };

        self.password_verifier.verify(password, hash).map(|_| ())
    }
}
