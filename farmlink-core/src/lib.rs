pub mod identity;
pub mod users;
pub mod repository;
pub mod password;
pub mod token;
pub mod accounts;

pub use identity::{Caller, Role};
pub use repository::{RepoResult, StoreError, UserRepository};
pub use token::{AuthConfig, Claims, TokenService};
pub use accounts::{AccountError, AccountService, AuthSession, NewAccount};
pub use users::User;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Identity verification failed: {0}")]
    IdentityError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
