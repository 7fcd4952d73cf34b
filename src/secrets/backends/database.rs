//! PostgreSQL secret backend
//!
//! Stores one row per secret in the `secrets` table. The value column only
//! ever holds the encoded ciphertext handed over by the manager. Every
//! statement filters on `tenant_id`.

use super::backend::SecretBackend;
use crate::domain::{Secret, SecretId, SecretType, TenantId};
use crate::errors::{ErrorMessage, Result, SecretManagementError};
use crate::secrets::SecretString;
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::{debug, error, instrument};

const SELECT_COLUMNS: &str =
    "SELECT id, secret_type, name, value, description, tenant_domain, created_at, last_modified \
     FROM secrets";

/// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    id: String,
    secret_type: String,
    name: String,
    value: String,
    description: Option<String>,
    tenant_domain: String,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl From<SecretRow> for Secret {
    fn from(row: SecretRow) -> Self {
        Secret {
            secret_id: Some(SecretId::from_string(row.id)),
            secret_name: row.name,
            secret_type: row.secret_type,
            secret_value: SecretString::new(row.value),
            description: row.description,
            tenant_domain: row.tenant_domain,
            created: Some(row.created_at),
            last_modified: Some(row.last_modified),
        }
    }
}

/// Database secret backend
#[derive(Debug, Clone)]
pub struct DatabaseSecretBackend {
    pool: DbPool,
}

impl DatabaseSecretBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn require_id(secret: &Secret) -> Result<&SecretId> {
        secret
            .secret_id
            .as_ref()
            .filter(|id| !id.is_blank())
            .ok_or_else(|| SecretManagementError::client(ErrorMessage::InvalidSecretId, None))
    }

    async fn fetch_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<Option<Secret>> {
        let row = sqlx::query_as::<_, SecretRow>(&format!(
            "{} WHERE id = $1 AND tenant_id = $2",
            SELECT_COLUMNS
        ))
        .bind(id.as_str())
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(secret_id = %id, tenant_id, error = %e, "Database query failed");
            SecretManagementError::backend("fetch secret by id", e)
        })?;

        Ok(row.map(Secret::from))
    }

    async fn fetch_existing(&self, id: &SecretId, tenant_id: TenantId) -> Result<Secret> {
        self.fetch_by_id(id, tenant_id).await?.ok_or_else(|| {
            SecretManagementError::client(ErrorMessage::SecretIdDoesNotExist, Some(id.as_str()))
        })
    }
}

#[async_trait]
impl SecretBackend for DatabaseSecretBackend {
    fn name(&self) -> &'static str {
        "database"
    }

    #[instrument(skip(self, secret), fields(secret_name = %secret.secret_name))]
    async fn add(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        let id = Self::require_id(secret)?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO secrets \
             (id, tenant_id, tenant_domain, secret_type, name, value, description, created_at, last_modified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
        )
        .bind(id.as_str())
        .bind(tenant_id)
        .bind(&secret.tenant_domain)
        .bind(&secret.secret_type)
        .bind(&secret.secret_name)
        .bind(secret.secret_value.expose_secret())
        .bind(secret.description.as_deref())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                SecretManagementError::client(
                    ErrorMessage::SecretAlreadyExists,
                    Some(&secret.secret_name),
                )
            }
            _ => {
                error!(tenant_id, error = %e, "Failed to insert secret");
                SecretManagementError::backend("insert secret", e)
            }
        })?;

        debug!(tenant_id, secret_id = %id, "Inserted secret");
        Ok(())
    }

    async fn get_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Secret>> {
        let row = sqlx::query_as::<_, SecretRow>(&format!(
            "{} WHERE name = $1 AND secret_type = $2 AND tenant_id = $3",
            SELECT_COLUMNS
        ))
        .bind(name)
        .bind(secret_type.name())
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(secret_name = %name, tenant_id, error = %e, "Database query failed");
            SecretManagementError::backend("fetch secret by name", e)
        })?;

        Ok(row.map(Secret::from))
    }

    async fn get_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<Option<Secret>> {
        self.fetch_by_id(id, tenant_id).await
    }

    async fn get_list(
        &self,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Vec<Secret>>> {
        let rows = sqlx::query_as::<_, SecretRow>(&format!(
            "{} WHERE secret_type = $1 AND tenant_id = $2 ORDER BY created_at, name",
            SELECT_COLUMNS
        ))
        .bind(secret_type.name())
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(secret_type = %secret_type, tenant_id, error = %e, "Database query failed");
            SecretManagementError::backend("list secrets", e)
        })?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.into_iter().map(Secret::from).collect()))
    }

    async fn delete_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM secrets WHERE name = $1 AND secret_type = $2 AND tenant_id = $3",
        )
        .bind(name)
        .bind(secret_type.name())
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SecretManagementError::backend("delete secret by name", e))?;

        debug!(tenant_id, rows = result.rows_affected(), "Deleted secret by name");
        Ok(())
    }

    async fn delete_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<()> {
        let result = sqlx::query("DELETE FROM secrets WHERE id = $1 AND tenant_id = $2")
            .bind(id.as_str())
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(|e| SecretManagementError::backend("delete secret by id", e))?;

        debug!(tenant_id, rows = result.rows_affected(), "Deleted secret by id");
        Ok(())
    }

    #[instrument(skip(self, secret), fields(secret_id = secret.id_str()))]
    async fn replace(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        let id = Self::require_id(secret)?;

        let result = sqlx::query(
            "UPDATE secrets SET name = $1, secret_type = $2, value = $3, description = $4, \
             last_modified = $5 WHERE id = $6 AND tenant_id = $7",
        )
        .bind(&secret.secret_name)
        .bind(&secret.secret_type)
        .bind(secret.secret_value.expose_secret())
        .bind(secret.description.as_deref())
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                SecretManagementError::client(
                    ErrorMessage::SecretAlreadyExists,
                    Some(&secret.secret_name),
                )
            }
            _ => {
                error!(tenant_id, error = %e, "Failed to replace secret");
                SecretManagementError::backend("replace secret", e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(SecretManagementError::client(
                ErrorMessage::SecretIdDoesNotExist,
                Some(id.as_str()),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, secret, ciphertext), fields(secret_id = secret.id_str()))]
    async fn update_value(
        &self,
        secret: &Secret,
        ciphertext: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        let id = Self::require_id(secret)?;

        sqlx::query(
            "UPDATE secrets SET value = $1, last_modified = $2 WHERE id = $3 AND tenant_id = $4",
        )
        .bind(ciphertext)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SecretManagementError::backend("update secret value", e))?;

        self.fetch_existing(id, tenant_id).await
    }

    #[instrument(skip(self, secret, description), fields(secret_id = secret.id_str()))]
    async fn update_description(
        &self,
        secret: &Secret,
        description: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        let id = Self::require_id(secret)?;

        sqlx::query(
            "UPDATE secrets SET description = $1, last_modified = $2 \
             WHERE id = $3 AND tenant_id = $4",
        )
        .bind(description)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SecretManagementError::backend("update secret description", e))?;

        self.fetch_existing(id, tenant_id).await
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| SecretManagementError::backend("database health check", e))?;
        Ok(())
    }
}
