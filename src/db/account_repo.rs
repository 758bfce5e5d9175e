// src/db/account_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::account::Account};

/// Consulta de contas usada pelo gate de tenant dos adaptadores de
/// importação. CRUD de contas e cobrança ficam fora deste serviço.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, AppError>;
}

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, name, email, created_at FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}
