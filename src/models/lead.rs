// src/models/lead.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// --- LEAD ---

/// Um contato/prospect dentro de uma conta (tenant).
/// Os campos de identidade (email, phone, cnpj) são guardados já
/// normalizados; a unicidade por conta é garantida pelo resolver.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub account_id: Uuid,

    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cnpj: Option<String>,

    // De onde o lead veio: "manual_import", "google_maps", "cnpj_api"...
    pub source: String,

    // Etapa do funil. Nunca regride num merge.
    pub stage: String,
    pub score: i32,

    // Extras semi-estruturados (categoria, tags, endereco, dados_extras).
    // JSONB no banco, objeto JSON livre aqui.
    pub data: Option<Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- EVENTOS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadEventType {
    Created,
    Merged,
}

impl LeadEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadEventType::Created => "created",
            LeadEventType::Merged => "merged",
        }
    }
}

/// Registro de auditoria, um por criação ou merge. Só escrita, nunca lido
/// pelas regras de dedupe.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub event_type: String,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

// --- ENTRADA DO ORQUESTRADOR ---

/// Dados necessários para criar/atualizar um Lead. Todas as rotas que criam
/// lead enviam algo neste formato (ainda cru; a normalização acontece no
/// LeadService).
#[derive(Debug, Clone, Default)]
pub struct CreateLeadInput {
    pub account_id: Uuid,

    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cnpj: Option<String>,

    pub source: String,
    pub stage: Option<String>,
    pub score: Option<i32>,

    pub data: Option<Value>,
}

/// Resultado de createOrMerge.
/// was_merged = true  → lead já existia, foi atualizado.
/// was_merged = false → lead novo foi criado.
#[derive(Debug, Clone)]
pub struct CreateOrMergeResult {
    pub lead: Lead,
    pub was_merged: bool,
    pub event_type: LeadEventType,
}

/// Linha pronta para INSERT: campos já normalizados pelo LeadService.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub account_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cnpj: Option<String>,
    pub source: String,
    pub stage: String,
    pub score: i32,
    pub data: Option<Value>,
}

/// Campos resultantes do merge, aplicados num único UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cnpj: Option<String>,
    pub source: String,
    pub stage: String,
    pub score: i32,
    pub data: Option<Value>,
}
