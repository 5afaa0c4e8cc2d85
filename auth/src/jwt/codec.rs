use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::JwtError;
use crate::principal::Principal;

/// Issues and verifies signed bearer tokens.
///
/// Tokens are `base64url(header).base64url(claims).base64url(signature)`,
/// signed with HS256 over a process-wide secret. The codec is immutable after
/// construction and can be shared freely between concurrent requests.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    lifetime: Duration,
}

impl TokenCodec {
    /// Minimum secret length for HS256 (256 bits).
    pub const MIN_SECRET_BYTES: usize = 32;

    /// Longest accepted token lifetime (100 years).
    pub const MAX_LIFETIME_DAYS: i64 = 36_500;

    /// Create a codec from a signing secret and a token lifetime.
    ///
    /// # Arguments
    /// * `secret` - HMAC secret, at least 32 bytes
    /// * `lifetime` - Duration between `iat` and `exp`
    ///
    /// # Errors
    /// * `WeakSecret` - Secret shorter than 32 bytes
    /// * `InvalidLifetime` - Lifetime is zero, negative or over 100 years
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, JwtError> {
        if secret.len() < Self::MIN_SECRET_BYTES {
            return Err(JwtError::WeakSecret {
                min: Self::MIN_SECRET_BYTES,
                actual: secret.len(),
            });
        }

        if lifetime <= Duration::zero() || lifetime > Duration::days(Self::MAX_LIFETIME_DAYS) {
            return Err(JwtError::InvalidLifetime(lifetime.num_milliseconds()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for a principal, stamped with the current time.
    ///
    /// # Errors
    /// * `EncodingFailed` - Signing failed
    pub fn issue(&self, principal: &Principal) -> Result<String, JwtError> {
        self.issue_at(principal, Utc::now())
    }

    /// Issue a token with an explicit issue instant.
    ///
    /// # Errors
    /// * `EncodingFailed` - Signing failed
    pub fn issue_at(
        &self,
        principal: &Principal,
        issued_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims::for_principal(principal, issued_at, self.lifetime);

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Check structure, algorithm, signature and expiry.
    ///
    /// Never fails: every decoding or cryptographic error maps to `false`.
    pub fn verify(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    /// Return the subject of a token.
    ///
    /// Runs the same parse and signature check as [`verify`](Self::verify)
    /// but does not look at expiry; callers verify first.
    ///
    /// # Errors
    /// * `Malformed` / `SignatureInvalid` / `UnsupportedAlgorithm`
    pub fn extract_subject(&self, token: &str) -> Result<String, JwtError> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// Decode a token and reject it if expired.
    ///
    /// # Errors
    /// * `TokenExpired` - `exp` is at or before the current time
    /// * any error from [`decode`](Self::decode)
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.decode(token)?;

        if claims.is_expired(Utc::now().timestamp_millis()) {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }

    /// Parse a token and check its algorithm and signature.
    ///
    /// # Errors
    /// * `Malformed` - Not three base64url segments of the expected JSON
    /// * `SignatureInvalid` - Signature does not match the secret
    /// * `UnsupportedAlgorithm` - Header names an algorithm other than HS256
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        // exp is in milliseconds and checked in `validate`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => JwtError::SignatureInvalid,
                ErrorKind::InvalidAlgorithm => JwtError::UnsupportedAlgorithm,
                _ => JwtError::Malformed(e.to_string()),
            })
    }
}
