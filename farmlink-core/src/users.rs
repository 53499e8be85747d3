use chrono::{DateTime, Utc};
use farmlink_shared::Masked;
use uuid::Uuid;

use crate::identity::Role;

/// A marketplace account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub name: String,
    pub password_hash: Masked<String>,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Repositories never return rows where this is set.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(phone: String, name: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phone,
            name,
            password_hash: Masked::new(password_hash),
            role,
            is_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
