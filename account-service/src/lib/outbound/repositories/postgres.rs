use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::PersonName;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::ConflictField;
use crate::user::errors::UserError;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_roles(&self, id: i64) -> Result<BTreeSet<String>, UserError> {
        let roles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role
            FROM user_roles
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(roles.into_iter().collect())
    }

    async fn hydrate(&self, row: UserRow) -> Result<User, UserError> {
        let roles = self.find_roles(row.id).await?;
        row.into_user(roles)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    password_hash: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, roles: BTreeSet<String>) -> Result<User, UserError> {
        Ok(User {
            id: UserId(self.id),
            first_name: PersonName::new("firstName", self.first_name)?,
            last_name: PersonName::new("lastName", self.last_name)?,
            username: Username::new(self.username)?,
            email: EmailAddress::new(self.email)?,
            password_hash: self.password_hash,
            roles,
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn database_error(e: sqlx::Error) -> UserError {
    UserError::DatabaseError(e.to_string())
}

fn unique_violation(e: sqlx::Error) -> UserError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            if db_err.constraint() == Some("users_email_key") {
                return UserError::IdentityExists {
                    field: ConflictField::Email,
                };
            }
            if db_err.constraint() == Some("users_username_key") {
                return UserError::IdentityExists {
                    field: ConflictField::Username,
                };
            }
        }
    }
    database_error(e)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let (id, created_at, updated_at) =
            sqlx::query_as::<_, (i64, DateTime<Utc>, DateTime<Utc>)>(
                r#"
                INSERT INTO users (first_name, last_name, username, email, password_hash)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, created_at, updated_at
                "#,
            )
            .bind(user.first_name.as_str())
            .bind(user.last_name.as_str())
            .bind(user.username.as_str())
            .bind(user.email.as_str())
            .bind(user.password_hash.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(unique_violation)?;

        for role in &user.roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
                .bind(id)
                .bind(role.as_str())
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;

        Ok(User {
            id: UserId(id),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            enabled: true,
            created_at,
            updated_at,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, username, email, password_hash,
                   enabled, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(r) => self.hydrate(r).await.map(Some),
            None => Ok(None),
        }
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, UserError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, UserError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn update_roles(&self, id: &UserId, roles: BTreeSet<String>) -> Result<User, UserError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET updated_at = NOW()
            WHERE id = $1
            RETURNING id, first_name, last_name, username, email, password_hash,
                      enabled, created_at, updated_at
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?
        .ok_or_else(|| UserError::IdentityNotFound(id.to_string()))?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        for role in &roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
                .bind(id.0)
                .bind(role.as_str())
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;

        row.into_user(roles)
    }
}
