use std::collections::BTreeSet;

use async_trait::async_trait;
use auth::Principal;

use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginOutcome;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;

/// Port for login, registration and current-identity operations.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Register a new user and log them in.
    ///
    /// Email availability is checked before username availability; the first
    /// conflict is reported and nothing is persisted.
    ///
    /// # Arguments
    /// * `command` - Validated registration fields and plaintext password
    ///
    /// # Returns
    /// Login outcome for the newly created user
    ///
    /// # Errors
    /// * `IdentityExists` - Email or username already taken
    /// * `Password` - Password hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<LoginOutcome, UserError>;

    /// Verify email and password and issue a token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email, wrong password or disabled user
    /// * `Password` / `Token` - Hashing or signing failed
    /// * `DatabaseError` - Database operation failed
    async fn authenticate(&self, command: LoginCommand) -> Result<LoginOutcome, UserError>;

    /// Load the stored user behind an authenticated subject.
    ///
    /// # Errors
    /// * `IdentityNotFound` - No user with this email
    /// * `DatabaseError` - Database operation failed
    async fn current_user(&self, subject: &str) -> Result<User, UserError>;
}

/// Loads the current identity behind a verified token subject.
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    /// # Errors
    /// * `IdentityNotFound` - No user with this subject
    /// * `DatabaseError` - Database operation failed
    async fn load_principal(&self, subject: &str) -> Result<Principal, UserError>;
}

/// Credential store operations for the user aggregate.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Returns
    /// Stored user with its assigned id and timestamps
    ///
    /// # Errors
    /// * `IdentityExists` - Email or username already taken
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: NewUser) -> Result<User, UserError>;

    /// Retrieve user by email address.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn exists_by_email(&self, email: &str) -> Result<bool, UserError>;

    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn exists_by_username(&self, username: &str) -> Result<bool, UserError>;

    /// Replace a user's role set.
    ///
    /// # Errors
    /// * `IdentityNotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn update_roles(&self, id: &UserId, roles: BTreeSet<String>) -> Result<User, UserError>;
}
