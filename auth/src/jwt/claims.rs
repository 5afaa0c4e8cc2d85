use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::principal::Principal;

/// Claim set embedded in every issued token.
///
/// `iat` and `exp` are Unix epoch milliseconds. `sub` carries the identity's
/// email and is the only claim the service relies on after verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (identity email)
    pub sub: String,

    /// Role labels at issue time
    pub roles: BTreeSet<String>,

    /// Identity id
    #[serde(rename = "userId")]
    pub user_id: i64,

    /// Issued at (epoch ms)
    pub iat: i64,

    /// Expires at (epoch ms)
    pub exp: i64,
}

impl Claims {
    /// Build the claims for a principal.
    ///
    /// # Arguments
    /// * `principal` - Authenticated principal
    /// * `issued_at` - Issue instant
    /// * `lifetime` - Token lifetime; `exp = iat + lifetime`
    pub fn for_principal(
        principal: &Principal,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        let iat = issued_at.timestamp_millis();

        Self {
            sub: principal.subject.clone(),
            roles: principal.roles.clone(),
            user_id: principal.id,
            iat,
            exp: iat.saturating_add(lifetime.num_milliseconds()),
        }
    }

    /// Check if the token is expired at `now_ms`.
    ///
    /// A token is no longer valid at the exact instant it expires.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.exp <= now_ms
    }
}
