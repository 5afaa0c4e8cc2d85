use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::AuthResponseData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::inbound::http::middleware::AuthenticatedIdentity;
use crate::inbound::http::middleware::IdentityContext;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;

/// Exchange email and password for a token.
///
/// The decided principal is attached to the response extensions so outer
/// layers see the identity the login established.
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(body): Json<LoginRequestBody>,
) -> Result<(Extension<IdentityContext>, ApiSuccess<AuthResponseData>), ApiError> {
    let outcome = state
        .user_service
        .authenticate(body.try_into_command()?)
        .await?;

    tracing::info!(user_id = outcome.principal.id, "User logged in");

    let context = IdentityContext::authenticated(AuthenticatedIdentity {
        principal: outcome.principal,
        remote_addr: connect_info.map(|ConnectInfo(addr)| addr),
    });

    Ok((
        Extension(context),
        ApiSuccess::new(
            StatusCode::OK,
            AuthResponseData {
                token: outcome.token,
            },
        ),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    email: String,
    password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseLoginRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("password must not be blank")]
    BlankPassword,
}

impl LoginRequestBody {
    fn try_into_command(self) -> Result<LoginCommand, ParseLoginRequestError> {
        let email = EmailAddress::new(self.email)?;
        if self.password.trim().is_empty() {
            return Err(ParseLoginRequestError::BlankPassword);
        }
        Ok(LoginCommand {
            email,
            password: self.password,
        })
    }
}

impl From<ParseLoginRequestError> for ApiError {
    fn from(err: ParseLoginRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}
