// src/services/lead_service.rs
//
// Centraliza a lógica de:
//  - normalizar dados
//  - encontrar lead existente (dedupe)
//  - criar ou fazer merge
//  - registrar LeadEvent

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        normalization::{
            merge_extras, normalize_cnpj, normalize_email, normalize_name, normalize_phone,
        },
    },
    db::LeadStore,
    models::lead::{
        CreateLeadInput, CreateOrMergeResult, Lead, LeadEventType, MergedFields, NewLead,
    },
};

// Janela da regra 4 do resolver (nome + telefone).
const NAME_PHONE_WINDOW_DAYS: i64 = 30;

/// Campos do input já passados pelas funções de normalização.
#[derive(Debug, Clone)]
struct NormalizedInput {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    cnpj: Option<String>,
    source: String,
    stage: Option<String>,
    score: Option<i32>,
    data: Option<serde_json::Value>,
}

impl NormalizedInput {
    fn from_input(input: CreateLeadInput) -> Self {
        Self {
            name: normalize_name(input.name.as_deref()),
            email: normalize_email(input.email.as_deref()),
            phone: normalize_phone(input.phone.as_deref()),
            cnpj: normalize_cnpj(input.cnpj.as_deref()),
            source: input.source,
            stage: input.stage,
            score: input.score,
            data: input.data,
        }
    }
}

#[derive(Clone)]
pub struct LeadService {
    store: Arc<dyn LeadStore>,
}

impl LeadService {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    /// Cria ou faz merge de um lead com base nas regras:
    ///
    /// 1) email
    /// 2) phone
    /// 3) cnpj
    /// 4) name + phone (últimos 30 dias)
    pub async fn create_or_merge(
        &self,
        input: CreateLeadInput,
    ) -> Result<CreateOrMergeResult, AppError> {
        let account_id = input.account_id;
        let normalized = NormalizedInput::from_input(input);

        let existing = self.find_existing(account_id, &normalized).await?;

        match existing {
            None => {
                let lead = self.create_lead(account_id, normalized).await?;
                Ok(CreateOrMergeResult {
                    lead,
                    was_merged: false,
                    event_type: LeadEventType::Created,
                })
            }
            Some(existing) => {
                let source = normalized.source.clone();
                let merged = self.merge_lead(&existing, normalized).await?;

                self.store
                    .insert_event(
                        merged.id,
                        LeadEventType::Merged.as_str(),
                        Some(json!({
                            "source": source,
                            "mergedFrom": { "id": existing.id },
                        })),
                    )
                    .await?;

                Ok(CreateOrMergeResult {
                    lead: merged,
                    was_merged: true,
                    event_type: LeadEventType::Merged,
                })
            }
        }
    }

    /// Criação direta, sem passar pelo resolver (options.dedupe = false).
    pub async fn create_unchecked(
        &self,
        input: CreateLeadInput,
    ) -> Result<CreateOrMergeResult, AppError> {
        let account_id = input.account_id;
        let normalized = NormalizedInput::from_input(input);
        let lead = self.create_lead(account_id, normalized).await?;
        Ok(CreateOrMergeResult {
            lead,
            was_merged: false,
            event_type: LeadEventType::Created,
        })
    }

    /// Listagem paginada dos leads da conta, mais recentes primeiro.
    pub async fn list(
        &self,
        account_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<(i64, Vec<Lead>), AppError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let total = self.store.count_by_account(account_id).await?;
        let leads = self
            .store
            .list_page(account_id, (page - 1) * per_page, per_page)
            .await?;
        Ok((total, leads))
    }

    /// Trilha de eventos de um lead, validando que ele pertence à conta.
    pub async fn events(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
    ) -> Result<Vec<crate::models::lead::LeadEvent>, AppError> {
        self.store
            .find_by_id(account_id, lead_id)
            .await?
            .ok_or(AppError::LeadNotFound)?;
        self.store.list_events(lead_id).await
    }

    /// Sonda de dry_run: normaliza e roda a cascata de dedupe, sem gravar
    /// nada. Retorna o lead existente, se houver.
    pub async fn probe_duplicate(&self, input: CreateLeadInput) -> Result<Option<Lead>, AppError> {
        let account_id = input.account_id;
        let normalized = NormalizedInput::from_input(input);
        self.find_existing(account_id, &normalized).await
    }

    /// Cascata de deduplicação, sempre dentro da conta; o primeiro acerto
    /// vence. Email antes de phone antes de cnpj: identificadores com menos
    /// colisão têm precedência. A regra nome+telefone é limitada a 30 dias
    /// para não virar chave de identidade permanente.
    async fn find_existing(
        &self,
        account_id: Uuid,
        normalized: &NormalizedInput,
    ) -> Result<Option<Lead>, AppError> {
        if let Some(email) = &normalized.email {
            if let Some(lead) = self.store.find_by_email(account_id, email).await? {
                return Ok(Some(lead));
            }
        }

        if let Some(phone) = &normalized.phone {
            if let Some(lead) = self.store.find_by_phone(account_id, phone).await? {
                return Ok(Some(lead));
            }
        }

        if let Some(cnpj) = &normalized.cnpj {
            if let Some(lead) = self.store.find_by_cnpj(account_id, cnpj).await? {
                return Ok(Some(lead));
            }
        }

        if let (Some(name), Some(phone)) = (&normalized.name, &normalized.phone) {
            let since = Utc::now() - Duration::days(NAME_PHONE_WINDOW_DAYS);
            if let Some(lead) = self
                .store
                .find_by_name_and_phone_since(account_id, name, phone, since)
                .await?
            {
                return Ok(Some(lead));
            }
        }

        Ok(None)
    }

    async fn create_lead(
        &self,
        account_id: Uuid,
        normalized: NormalizedInput,
    ) -> Result<Lead, AppError> {
        let source = normalized.source.clone();
        let lead = self
            .store
            .create(NewLead {
                account_id,
                name: normalized.name,
                email: normalized.email,
                phone: normalized.phone,
                cnpj: normalized.cnpj,
                source: normalized.source,
                stage: normalized.stage.unwrap_or_else(|| "new".to_string()),
                score: normalized.score.unwrap_or(0),
                data: normalized.data,
            })
            .await?;

        self.store
            .insert_event(
                lead.id,
                LeadEventType::Created.as_str(),
                Some(json!({
                    "source": source,
                    "dedupeStrategy": "none",
                })),
            )
            .await?;

        Ok(lead)
    }

    /// Aplica a precedência campo a campo e grava num único UPDATE.
    async fn merge_lead(
        &self,
        existing: &Lead,
        incoming: NormalizedInput,
    ) -> Result<Lead, AppError> {
        let fields = merged_fields(existing, incoming);
        self.store.apply_merge(existing.id, fields).await
    }
}

/// Precedência do merge, campo a campo:
/// - campo antigo preenchido → mantém o antigo;
/// - campo antigo vazio → adota o novo.
/// Exceções: `score` zero conta como vazio, e os extras (`data`) fazem
/// união de chaves com prioridade do ENTRANTE.
fn merged_fields(existing: &Lead, incoming: NormalizedInput) -> MergedFields {
    MergedFields {
        name: existing.name.clone().or(incoming.name),
        email: existing.email.clone().or(incoming.email),
        phone: existing.phone.clone().or(incoming.phone),
        cnpj: existing.cnpj.clone().or(incoming.cnpj),
        source: if existing.source.is_empty() {
            incoming.source
        } else {
            existing.source.clone()
        },
        stage: if !existing.stage.is_empty() {
            existing.stage.clone()
        } else {
            incoming.stage.unwrap_or_else(|| "new".to_string())
        },
        score: if existing.score != 0 {
            existing.score
        } else {
            incoming.score.unwrap_or(0)
        },
        data: merge_extras(existing.data.as_ref(), incoming.data.as_ref()),
    }
}
