// src/models/import.rs
//
// DTOs do pipeline de importação em lote. Todos os adaptadores (manual,
// webhook de formulário, Instagram, Google Maps, API de CNPJ) convergem
// para o mesmo formato de resposta: status + summary + itens + erros.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::models::lead::{CreateLeadInput, Lead, LeadEventType};

// --- OPÇÕES DO LOTE ---

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BatchOptions {
    /// false → pula o resolver e sempre cria um lead novo.
    #[serde(default = "default_true")]
    pub dedupe: bool,

    /// true → só sonda duplicados, nada é gravado.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { dedupe: true, dry_run: false }
    }
}

// --- ITEM MAPEADO ---

/// Um item do lote já traduzido do formato da fonte para o formato comum,
/// mas ainda cru (a normalização final acontece no LeadService).
#[derive(Debug, Clone, Default)]
pub struct LeadDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cnpj: Option<String>,

    pub source: String,
    pub stage: Option<String>,
    pub score: Option<i32>,

    pub categoria: Option<String>,
    pub tags: Vec<String>,
    pub endereco: Option<Value>,
    pub dados_extras: Option<Value>,

    /// Resumo identificável do item original, usado nas listas de erro.
    pub label: Value,
}

impl LeadDraft {
    /// Monta o objeto `data` com os extras, omitindo o que estiver vazio.
    pub fn into_input(self, account_id: Uuid) -> CreateLeadInput {
        let mut data = serde_json::Map::new();
        if let Some(categoria) = &self.categoria {
            data.insert("categoria".into(), Value::String(categoria.clone()));
        }
        if !self.tags.is_empty() {
            data.insert(
                "tags".into(),
                Value::Array(self.tags.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(endereco) = &self.endereco {
            data.insert("endereco".into(), endereco.clone());
        }
        if let Some(extras) = &self.dados_extras {
            data.insert("dados_extras".into(), extras.clone());
        }

        CreateLeadInput {
            account_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            cnpj: self.cnpj,
            source: self.source,
            stage: self.stage,
            score: self.score,
            data: if data.is_empty() { None } else { Some(Value::Object(data)) },
        }
    }

    /// Gate mínimo de validade: tem algum identificador utilizável?
    pub fn has_contact(&self) -> bool {
        has_text(&self.email) || has_text(&self.phone)
    }

    pub fn has_any_identity(&self) -> bool {
        self.has_contact() || has_text(&self.cnpj)
    }
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().map_or(false, |s| !s.trim().is_empty())
}

// --- RESULTADO AGREGADO ---

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub account_id: Uuid,
    pub source_type: String,
    pub context: Value,
    pub total_received: usize,
    pub total_valid: usize,
    pub total_imported: usize,
    pub total_merged: usize,
    pub total_duplicates: usize,
    pub total_invalid: usize,
    pub dry_run: bool,
}

/// Item importado (ou que seria importado, no dry_run — aí `lead_id` é null).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedLead {
    pub lead_id: Option<Uuid>,
    pub was_merged: bool,
    pub event_type: Option<LeadEventType>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ImportedLead {
    pub fn from_lead(lead: &Lead, was_merged: bool, event_type: LeadEventType) -> Self {
        Self {
            lead_id: Some(lead.id),
            was_merged,
            event_type: Some(event_type),
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemError {
    pub index: usize,
    pub item: Value,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub summary: ImportSummary,
    pub leads_imported: Vec<ImportedLead>,
    pub errors: Vec<ItemError>,
}

// --- PAYLOADS DAS ROTAS ---

/// Lote genérico: `items` (aceita o nome legado `leads`) + contexto livre.
#[derive(Debug, Deserialize, Validate)]
pub struct ManualImportPayload {
    pub account_id: Uuid,
    pub source_type: Option<String>,
    #[serde(alias = "leads")]
    #[validate(length(min = 1, message = "Envie pelo menos um item."))]
    pub items: Vec<Value>,
    #[serde(default)]
    pub options: BatchOptions,
}

#[derive(Debug, Deserialize)]
pub struct FormWebhookPayload {
    pub account_id: Uuid,
    pub source_type: Option<String>,
    pub lead: Value,
    #[serde(default)]
    pub options: BatchOptions,
}

#[derive(Debug, Deserialize, Default)]
pub struct InstagramContext {
    pub mode: Option<String>,
    pub source_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstagramImportPayload {
    pub account_id: Uuid,
    pub source_type: Option<String>,
    #[serde(default)]
    pub context: InstagramContext,
    #[serde(alias = "items")]
    pub profiles: Vec<InstagramProfile>,
    #[serde(default)]
    pub options: BatchOptions,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InstagramProfile {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub raw: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MapsContext {
    pub query: Option<String>,
    pub location: Option<String>,
    pub radius_meters: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MapsImportPayload {
    pub account_id: Uuid,
    pub source_type: Option<String>,
    #[serde(default)]
    pub context: MapsContext,
    #[serde(alias = "items")]
    pub places: Vec<MapsPlace>,
    #[serde(default)]
    pub options: BatchOptions,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MapsAddress {
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub full: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MapsPlace {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub international_phone: Option<String>,
    pub phone: Option<String>,
    pub formatted_phone: Option<String>,
    pub email: Option<String>,
    pub category: Option<String>,
    pub address: Option<MapsAddress>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i64>,
    pub maps_url: Option<String>,
    pub raw: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CnpjContext {
    pub api_name: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CnpjImportPayload {
    pub account_id: Uuid,
    pub source_type: Option<String>,
    #[serde(default)]
    pub context: CnpjContext,
    #[serde(alias = "items")]
    pub companies: Vec<CnpjCompany>,
    #[serde(default)]
    pub options: BatchOptions,
}

/// Empresa vinda de API de CNPJ. As APIs brasileiras variam entre snake_case
/// e camelCase; os `alias` cobrem as duas grafias.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CnpjCompany {
    pub cnpj: Option<String>,
    #[serde(alias = "razaoSocial")]
    pub razao_social: Option<String>,
    #[serde(alias = "nomeFantasia")]
    pub nome_fantasia: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub telefone1: Option<String>,
    pub telefone2: Option<String>,
    pub uf: Option<String>,
    pub estado: Option<String>,
    #[serde(alias = "cnaePrincipal")]
    pub cnae_principal: Option<String>,
    pub atividade_principal: Option<Value>,
    #[serde(alias = "atividadesSecundarias", default)]
    pub atividades_secundarias: Vec<Value>,
    #[serde(alias = "situacaoCadastral")]
    pub situacao_cadastral: Option<String>,
    #[serde(alias = "dataAbertura")]
    pub data_abertura: Option<String>,
    #[serde(alias = "capitalSocial")]
    pub capital_social: Option<Value>,
    #[serde(default)]
    pub socios: Vec<Value>,
    pub endereco: Option<Value>,
    pub raw: Option<Value>,
}
