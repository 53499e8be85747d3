use async_trait::async_trait;
use uuid::Uuid;

use crate::users::User;

/// Failure reported by a durable-store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Conflict(String),

    #[error("Stored record could not be decoded: {0}")]
    Decode(String),

    #[error("Storage backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

pub type RepoResult<T> = Result<T, StoreError>;

/// Repository trait for account data access
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `StoreError::Conflict` when the phone number is taken.
    async fn create_user(&self, user: &User) -> RepoResult<()>;

    async fn find_user_by_phone(&self, phone: &str) -> RepoResult<Option<User>>;

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>>;
}
