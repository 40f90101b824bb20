//! Postgres-backed refresh credential store.
//!
//! Schema lives in `migrations/0001_refresh_credentials.sql` and can be applied
//! with [`PostgresRefreshCredentialStore::ensure_schema`].
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | PoolTimedOut | N/A | `Timeout` |
//! | Other | N/A | `Backend` |
//!
//! ## Concurrency
//!
//! Revocation is a single conditional `UPDATE … WHERE revoked = FALSE`; the
//! affected-row count tells the caller whether it won. Postgres row locking
//! makes a second concurrent update re-evaluate the predicate after the first
//! commits, so it affects zero rows.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use tenantguard_core::{CredentialId, IdentityId};

use super::r#trait::{RefreshCredential, RefreshCredentialStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_refresh_credentials.sql");

#[derive(Debug, Clone)]
pub struct PostgresRefreshCredentialStore {
    pool: PgPool,
}

impl PostgresRefreshCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[derive(Debug)]
struct RefreshCredentialRow {
    id: Uuid,
    identity_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for RefreshCredentialRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RefreshCredentialRow {
            id: row.try_get("id")?,
            identity_id: row.try_get("identity_id")?,
            token_hash: row.try_get("token_hash")?,
            expires_at: row.try_get("expires_at")?,
            revoked: row.try_get("revoked")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<RefreshCredentialRow> for RefreshCredential {
    fn from(row: RefreshCredentialRow) -> Self {
        Self {
            id: CredentialId::from_uuid(row.id),
            identity_id: IdentityId::from_uuid(row.identity_id),
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            revoked: row.revoked,
            created_at: row.created_at,
        }
    }
}

#[async_trait::async_trait]
impl RefreshCredentialStore for PostgresRefreshCredentialStore {
    #[instrument(skip(self, credential), fields(credential_id = %credential.id, identity_id = %credential.identity_id), err)]
    async fn insert(&self, credential: &RefreshCredential) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_credentials (
                id,
                identity_id,
                token_hash,
                expires_at,
                revoked,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(credential.id.as_uuid())
        .bind(credential.identity_id.as_uuid())
        .bind(&credential.token_hash)
        .bind(credential.expires_at)
        .bind(credential.revoked)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(())
    }

    #[instrument(skip_all, err)]
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<RefreshCredential>, StoreError> {
        let row = sqlx::query_as::<_, RefreshCredentialRow>(
            r#"
            SELECT
                id,
                identity_id,
                token_hash,
                expires_at,
                revoked,
                created_at
            FROM refresh_credentials
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_token_hash", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), fields(credential_id = %id), err)]
    async fn revoke_if_active(&self, id: CredentialId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_credentials
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_if_active", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    async fn revoke_all_for_identity(&self, identity_id: IdentityId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_credentials
            SET revoked = TRUE
            WHERE identity_id = $1 AND revoked = FALSE
            "#,
        )
        .bind(identity_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_all_for_identity", e))?;

        Ok(result.rows_affected())
    }
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut => StoreError::Timeout(operation),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
