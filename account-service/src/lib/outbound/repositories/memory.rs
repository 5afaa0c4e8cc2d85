use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::ConflictField;
use crate::user::errors::UserError;

/// Process-local credential store.
///
/// Used when no database is configured and by the API tests. Uniqueness of
/// email and username is enforced under the write lock.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    last_id: i64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(UserError::IdentityExists {
                field: ConflictField::Email,
            });
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(UserError::IdentityExists {
                field: ConflictField::Username,
            });
        }

        state.last_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId(state.last_id),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.as_str() == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, UserError> {
        let state = self.state.read().await;
        Ok(state.users.values().any(|u| u.email.as_str() == email))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, UserError> {
        let state = self.state.read().await;
        Ok(state.users.values().any(|u| u.username.as_str() == username))
    }

    async fn update_roles(&self, id: &UserId, roles: BTreeSet<String>) -> Result<User, UserError> {
        let mut state = self.state.write().await;

        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| UserError::IdentityNotFound(id.to_string()))?;
        user.roles = roles;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}
