use std::collections::BTreeSet;
use std::fmt;

/// The authenticated subject as seen by the authentication decision.
///
/// A plain record: the identity id, the subject (the identity's email), the
/// stored password hash and the current role labels. Always built from the
/// stored identity, never from token claims.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub subject: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
    pub enabled: bool,
}

impl Principal {
    /// Create an enabled principal without roles.
    pub fn new(id: i64, subject: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id,
            subject: subject.into(),
            password_hash: password_hash.into(),
            roles: BTreeSet::new(),
            enabled: true,
        }
    }

    /// Replace the role labels.
    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

// The password hash never reaches logs.
impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .field("password_hash", &"<redacted>")
            .field("roles", &self.roles)
            .field("enabled", &self.enabled)
            .finish()
    }
}
