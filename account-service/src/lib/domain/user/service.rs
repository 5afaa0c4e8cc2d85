use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use auth::Principal;

use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginOutcome;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::user::errors::ConflictField;
use crate::user::errors::UserError;
use crate::user::ports::IdentityResolver;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Domain service implementation for account operations.
///
/// Orchestrates the credential store and the authenticator. Also serves as
/// the identity resolver for the authentication pipeline.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Credential store implementation
    /// * `authenticator` - Password verification and token issuance
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    async fn ensure_available(&self, command: &RegisterCommand) -> Result<(), UserError> {
        if self.repository.exists_by_email(command.email.as_str()).await? {
            return Err(UserError::IdentityExists {
                field: ConflictField::Email,
            });
        }

        if self
            .repository
            .exists_by_username(command.username.as_str())
            .await?
        {
            return Err(UserError::IdentityExists {
                field: ConflictField::Username,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl<UR> UserServicePort for UserService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<LoginOutcome, UserError> {
        if let Err(e) = self.ensure_available(&command).await {
            tracing::info!(error = %e, "Registration rejected");
            return Err(e);
        }

        let password_hash = self
            .authenticator
            .hash_password(&command.password)
            .map_err(|e| UserError::Password(e.to_string()))?;

        let created_user = self
            .repository
            .create(NewUser {
                first_name: command.first_name,
                last_name: command.last_name,
                username: command.username,
                email: command.email,
                password_hash,
                roles: BTreeSet::new(),
            })
            .await?;

        tracing::info!(user_id = %created_user.id, "User registered");

        self.authenticate(LoginCommand {
            email: created_user.email,
            password: command.password,
        })
        .await
    }

    async fn authenticate(&self, command: LoginCommand) -> Result<LoginOutcome, UserError> {
        let candidate = self
            .repository
            .find_by_email(command.email.as_str())
            .await?
            .map(|user| user.principal());

        let authentication = self
            .authenticator
            .authenticate(&command.password, candidate)
            .map_err(|e| {
                tracing::debug!(error = %e, "Login rejected");
                UserError::from(e)
            })?;

        tracing::debug!(user_id = authentication.principal.id, "Token issued");

        Ok(LoginOutcome {
            principal: authentication.principal,
            token: authentication.access_token,
        })
    }

    async fn current_user(&self, subject: &str) -> Result<User, UserError> {
        self.repository
            .find_by_email(subject)
            .await?
            .ok_or_else(|| UserError::IdentityNotFound(subject.to_string()))
    }
}

#[async_trait]
impl<UR> IdentityResolver for UserService<UR>
where
    UR: UserRepository,
{
    async fn load_principal(&self, subject: &str) -> Result<Principal, UserError> {
        self.current_user(subject).await.map(|user| user.principal())
    }
}
