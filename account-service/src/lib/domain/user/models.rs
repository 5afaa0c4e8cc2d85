use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use auth::Principal;
use chrono::DateTime;
use chrono::Utc;

use crate::user::errors::EmailError;
use crate::user::errors::NameError;
use crate::user::errors::UsernameError;

/// User aggregate entity.
///
/// Created once at registration. Only the password hash and the role set
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub username: Username,
    pub email: EmailAddress,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build the principal used for authentication decisions.
    ///
    /// The email is the subject.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id.0, self.email.as_str(), self.password_hash.as_str())
            .with_roles(self.roles.iter().cloned())
            .with_enabled(self.enabled)
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Non-blank, at most 64 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MAX_LENGTH: usize = 64;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `Blank` - Empty or whitespace only
    /// * `TooLong` - Longer than 64 characters
    pub fn new(username: String) -> Result<Self, UsernameError> {
        if username.trim().is_empty() {
            return Err(UsernameError::Blank);
        }

        let length = username.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        Ok(Self(username))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// First or last name of a user. Non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    /// # Errors
    /// * `Blank` - Empty or whitespace only; `field` names the offending input
    pub fn new(field: &'static str, name: String) -> Result<Self, NameError> {
        if name.trim().is_empty() {
            return Err(NameError::Blank { field });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser. The email is the
/// subject of every token issued to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// User record to persist. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub username: Username,
    pub email: EmailAddress,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
}

/// Command to register a new user with domain types
#[derive(Debug)]
pub struct RegisterCommand {
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub username: Username,
    pub email: EmailAddress,
    pub password: String,
}

/// Command to log in with email and password
#[derive(Debug)]
pub struct LoginCommand {
    pub email: EmailAddress,
    pub password: String,
}

/// Successful login: the principal it was decided for and its token.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(Username::new("alice".to_string()).is_ok());
        assert_eq!(Username::new("   ".to_string()), Err(UsernameError::Blank));
        assert_eq!(
            Username::new("a".repeat(65)),
            Err(UsernameError::TooLong {
                max: 64,
                actual: 65
            })
        );
    }

    #[test]
    fn test_person_name_rejects_blank() {
        assert_eq!(
            PersonName::new("firstName", "".to_string()),
            Err(NameError::Blank { field: "firstName" })
        );
        assert_eq!(
            PersonName::new("lastName", "Lovelace".to_string())
                .unwrap()
                .as_str(),
            "Lovelace"
        );
    }

    #[test]
    fn test_email_validation() {
        assert!(EmailAddress::new("alice@example.com".to_string()).is_ok());
        assert!(EmailAddress::new("not-an-email".to_string()).is_err());
        assert!(EmailAddress::new("".to_string()).is_err());
    }

    #[test]
    fn test_principal_uses_email_as_subject() {
        let now = Utc::now();
        let user = User {
            id: UserId(9),
            first_name: PersonName::new("firstName", "Ada".to_string()).unwrap(),
            last_name: PersonName::new("lastName", "Lovelace".to_string()).unwrap(),
            username: Username::new("ada".to_string()).unwrap(),
            email: EmailAddress::new("ada@example.com".to_string()).unwrap(),
            password_hash: "$argon2id$hash".to_string(),
            roles: BTreeSet::from(["TRADER".to_string()]),
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        let principal = user.principal();
        assert_eq!(principal.id, 9);
        assert_eq!(principal.subject, "ada@example.com");
        assert_eq!(principal.password_hash, "$argon2id$hash");
        assert!(principal.has_role("TRADER"));
        assert!(principal.enabled);
    }
}
