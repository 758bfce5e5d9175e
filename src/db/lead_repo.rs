// src/db/lead_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{Lead, LeadEvent, MergedFields, NewLead},
};

const LEAD_COLUMNS: &str =
    "id, account_id, name, email, phone, cnpj, source, stage, score, data, created_at, updated_at";

/// Capacidade de acesso ao armazenamento de leads. O LeadService só conhece
/// este trait; a implementação Postgres fica logo abaixo e os testes usam
/// uma versão em memória.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn find_by_email(&self, account_id: Uuid, email: &str)
        -> Result<Option<Lead>, AppError>;

    async fn find_by_phone(&self, account_id: Uuid, phone: &str)
        -> Result<Option<Lead>, AppError>;

    async fn find_by_cnpj(&self, account_id: Uuid, cnpj: &str)
        -> Result<Option<Lead>, AppError>;

    /// Regra 4 do resolver: nome + telefone, limitado por data de criação.
    async fn find_by_name_and_phone_since(
        &self,
        account_id: Uuid,
        name: &str,
        phone: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Lead>, AppError>;

    async fn create(&self, new_lead: NewLead) -> Result<Lead, AppError>;

    /// UPDATE único e atômico com o resultado do merge.
    async fn apply_merge(&self, lead_id: Uuid, fields: MergedFields)
        -> Result<Lead, AppError>;

    async fn insert_event(
        &self,
        lead_id: Uuid,
        event_type: &str,
        payload: Option<Value>,
    ) -> Result<(), AppError>;

    async fn count_by_account(&self, account_id: Uuid) -> Result<i64, AppError>;

    async fn list_page(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Lead>, AppError>;

    async fn find_by_id(&self, account_id: Uuid, lead_id: Uuid)
        -> Result<Option<Lead>, AppError>;

    /// Trilha de auditoria do lead, em ordem cronológica.
    async fn list_events(&self, lead_id: Uuid) -> Result<Vec<LeadEvent>, AppError>;
}

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        where_clause: &str,
        account_id: Uuid,
        value: &str,
    ) -> Result<Option<Lead>, AppError> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE account_id = $1 AND {where_clause} LIMIT 1"
        );
        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(account_id)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }
}

#[async_trait]
impl LeadStore for LeadRepository {
    async fn find_by_email(
        &self,
        account_id: Uuid,
        email: &str,
    ) -> Result<Option<Lead>, AppError> {
        self.find_one("email = $2", account_id, email).await
    }

    async fn find_by_phone(
        &self,
        account_id: Uuid,
        phone: &str,
    ) -> Result<Option<Lead>, AppError> {
        self.find_one("phone = $2", account_id, phone).await
    }

    async fn find_by_cnpj(&self, account_id: Uuid, cnpj: &str) -> Result<Option<Lead>, AppError> {
        self.find_one("cnpj = $2", account_id, cnpj).await
    }

    async fn find_by_name_and_phone_since(
        &self,
        account_id: Uuid,
        name: &str,
        phone: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Lead>, AppError> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads \
             WHERE account_id = $1 AND name = $2 AND phone = $3 AND created_at >= $4 \
             LIMIT 1"
        );
        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(account_id)
            .bind(name)
            .bind(phone)
            .bind(since)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    async fn create(&self, new_lead: NewLead) -> Result<Lead, AppError> {
        let sql = format!(
            "INSERT INTO leads (account_id, name, email, phone, cnpj, source, stage, score, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {LEAD_COLUMNS}"
        );
        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(new_lead.account_id)
            .bind(new_lead.name)
            .bind(new_lead.email)
            .bind(new_lead.phone)
            .bind(new_lead.cnpj)
            .bind(new_lead.source)
            .bind(new_lead.stage)
            .bind(new_lead.score)
            .bind(new_lead.data)
            .fetch_one(&self.pool)
            .await?;
        Ok(lead)
    }

    async fn apply_merge(
        &self,
        lead_id: Uuid,
        fields: MergedFields,
    ) -> Result<Lead, AppError> {
        let sql = format!(
            "UPDATE leads SET \
                name = $2, email = $3, phone = $4, cnpj = $5, \
                source = $6, stage = $7, score = $8, data = $9, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {LEAD_COLUMNS}"
        );
        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(lead_id)
            .bind(fields.name)
            .bind(fields.email)
            .bind(fields.phone)
            .bind(fields.cnpj)
            .bind(fields.source)
            .bind(fields.stage)
            .bind(fields.score)
            .bind(fields.data)
            .fetch_optional(&self.pool)
            .await?;

        lead.ok_or(AppError::LeadNotFound)
    }

    async fn insert_event(
        &self,
        lead_id: Uuid,
        event_type: &str,
        payload: Option<Value>,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO lead_events (lead_id, event_type, payload) VALUES ($1, $2, $3)")
            .bind(lead_id)
            .bind(event_type)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_by_account(&self, account_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM leads WHERE account_id = $1")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn list_page(
        &self,
        account_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Lead>, AppError> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads \
             WHERE account_id = $1 \
             ORDER BY created_at DESC \
             OFFSET $2 LIMIT $3"
        );
        let leads = sqlx::query_as::<_, Lead>(&sql)
            .bind(account_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(leads)
    }

    async fn find_by_id(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
    ) -> Result<Option<Lead>, AppError> {
        let sql =
            format!("SELECT {LEAD_COLUMNS} FROM leads WHERE account_id = $1 AND id = $2");
        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(account_id)
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    async fn list_events(&self, lead_id: Uuid) -> Result<Vec<LeadEvent>, AppError> {
        let events = sqlx::query_as::<_, LeadEvent>(
            "SELECT id, lead_id, event_type, payload, created_at \
             FROM lead_events WHERE lead_id = $1 \
             ORDER BY created_at ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
