use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farmlink_core::{RepoResult, Role, User, UserRepository};
use farmlink_shared::Masked;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{decode_err, store_err};

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, phone, name, password_hash, role, is_verified, is_active, created_at, updated_at, deleted_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    phone: String,
    name: String,
    password_hash: String,
    role: String,
    is_verified: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = farmlink_core::StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|_| decode_err("users.role", &row.role))?;
        Ok(User {
            id: row.id,
            phone: row.phone,
            name: row.name,
            password_hash: Masked::new(row.password_hash),
            role,
            is_verified: row.is_verified,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, phone, name, password_hash, role, is_verified, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.phone)
        .bind(&user.name)
        .bind(user.password_hash.expose())
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn find_user_by_phone(&self, phone: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE phone = $1 AND deleted_at IS NULL", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(User::try_from)
            .transpose()
    }
}
