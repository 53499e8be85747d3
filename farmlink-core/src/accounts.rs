use std::sync::Arc;

use farmlink_shared::Masked;
use tracing::info;
use uuid::Uuid;

use crate::identity::Role;
use crate::password::{hash_password, verify_password};
use crate::repository::{StoreError, UserRepository};
use crate::token::TokenService;
use crate::users::User;
use crate::CoreError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub phone: String,
    pub name: String,
    pub password: Masked<String>,
    pub role: Role,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Registration, login and profile lookup.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, account: NewAccount) -> Result<AuthSession, AccountError> {
        let phone = account.phone.trim();
        let name = account.name.trim();

        if phone.is_empty() || name.is_empty() {
            return Err(AccountError::Validation("Phone and name are required".into()));
        }
        if account.password.expose().len() < MIN_PASSWORD_LEN {
            return Err(AccountError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if account.role == Role::Admin {
            return Err(AccountError::Validation("Role must be farmer or buyer".into()));
        }

        if self.users.find_user_by_phone(phone).await?.is_some() {
            return Err(AccountError::Conflict("Phone number already registered".into()));
        }

        let hash = hash_password(account.password.expose())?;
        let user = User::new(phone.to_string(), name.to_string(), hash, account.role);

        self.users.create_user(&user).await.map_err(|e| match e {
            // Lost a race with a concurrent registration of the same phone
            StoreError::Conflict(_) => AccountError::Conflict("Phone number already registered".into()),
            other => AccountError::Storage(other),
        })?;

        info!("Registered {} account {}", user.role, user.id);
        self.session_for(user)
    }

    /// Unknown phone and wrong password are reported identically.
    pub async fn login(&self, phone: &str, password: &Masked<String>) -> Result<AuthSession, AccountError> {
        let user = self
            .users
            .find_user_by_phone(phone.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password.expose(), user.password_hash.expose()) {
            return Err(AccountError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AccountError::Deactivated);
        }

        self.session_for(user)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<User, AccountError> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".into()))
    }

    fn session_for(&self, user: User) -> Result<AuthSession, AccountError> {
        let token = self.tokens.issue(user.id, user.role)?;
        Ok(AuthSession { token, user })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid phone or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    Deactivated,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
