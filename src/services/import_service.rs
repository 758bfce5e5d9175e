// src/services/import_service.rs
//
// Harness compartilhado de importação em lote. Cada adaptador (manual,
// formulário, Instagram, Google Maps, CNPJ) só traduz o formato da fonte
// para um LeadDraft; o processamento do lote — gate de conta, dry_run,
// dedupe, contadores — é idêntico para todos e mora aqui.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AccountStore,
    models::import::{
        BatchOptions, BatchResponse, CnpjCompany, CnpjContext, ImportSummary, ImportedLead,
        InstagramContext, InstagramProfile, ItemError, LeadDraft, MapsContext, MapsPlace,
    },
    services::lead_service::LeadService,
};

/// Tabela de aliases da importação manual: chave canônica → nomes aceitos,
/// em ordem de prioridade. Planilhas chegam metade em inglês, metade em
/// português.
const MANUAL_ALIASES: &[(&str, &[&str])] = &[
    ("name", &["name", "nome"]),
    ("email", &["email"]),
    ("phone", &["phone", "telefone", "telefone1"]),
    ("cnpj", &["cnpj"]),
    ("source", &["source", "origem"]),
    ("stage", &["stage"]),
    ("categoria", &["categoria", "category"]),
];

/// Busca o primeiro alias presente e não-vazio no objeto cru.
fn pick_aliased(item: &Value, canonical: &str) -> Option<String> {
    let (_, aliases) = MANUAL_ALIASES.iter().find(|(key, _)| *key == canonical)?;
    for alias in *aliases {
        if let Some(text) = item.get(*alias).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

/// União de tags com deduplicação; a ordem não é significativa.
fn tag_set(base: &[&str], extra: Vec<Option<String>>) -> Vec<String> {
    let mut set: BTreeSet<String> = base.iter().map(|t| t.to_string()).collect();
    for tag in extra.into_iter().flatten() {
        if !tag.trim().is_empty() {
            set.insert(tag);
        }
    }
    set.into_iter().collect()
}

#[derive(Clone)]
pub struct ImportService {
    accounts: Arc<dyn AccountStore>,
    leads: LeadService,
}

impl ImportService {
    pub fn new(accounts: Arc<dyn AccountStore>, leads: LeadService) -> Self {
        Self { accounts, leads }
    }

    /// Processa um lote já mapeado. Itens inválidos chegam como `Err` e
    /// nunca tocam o resolver. O laço é estritamente sequencial: o item N
    /// enxerga o lead que o item N-1 acabou de criar, então duplicados
    /// dentro do próprio lote colapsam.
    pub async fn process(
        &self,
        account_id: Uuid,
        source_type: String,
        context: Value,
        options: BatchOptions,
        mapped: Vec<Result<LeadDraft, ItemError>>,
    ) -> Result<BatchResponse, AppError> {
        // Gate do lote inteiro: a conta precisa existir.
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        let total_received = mapped.len();
        let mut total_invalid = 0usize;
        let mut total_imported = 0usize;
        let mut total_merged = 0usize;
        let mut total_duplicates = 0usize;

        let mut leads_imported: Vec<ImportedLead> = Vec::new();
        let mut errors: Vec<ItemError> = Vec::new();

        for (index, entry) in mapped.into_iter().enumerate() {
            let draft = match entry {
                Ok(draft) => draft,
                Err(item_error) => {
                    total_invalid += 1;
                    errors.push(item_error);
                    continue;
                }
            };

            let label = draft.label.clone();
            let input = draft.into_input(account_id);

            if options.dry_run {
                // Só sonda: nada é gravado.
                if options.dedupe && self.leads.probe_duplicate(input.clone()).await?.is_some() {
                    total_duplicates += 1;
                    errors.push(ItemError {
                        index,
                        item: label,
                        message: "Lead duplicado (email/telefone já existente)".to_string(),
                    });
                } else {
                    total_imported += 1;
                    leads_imported.push(ImportedLead {
                        lead_id: None,
                        was_merged: false,
                        event_type: None,
                        name: input.name.clone(),
                        email: input.email.clone(),
                        phone: input.phone.clone(),
                    });
                }
                continue;
            }

            let result = if options.dedupe {
                self.leads.create_or_merge(input).await?
            } else {
                self.leads.create_unchecked(input).await?
            };

            if result.was_merged {
                total_merged += 1;
            } else {
                total_imported += 1;
            }
            leads_imported.push(ImportedLead::from_lead(
                &result.lead,
                result.was_merged,
                result.event_type,
            ));
        }

        Ok(BatchResponse {
            status: "success",
            summary: ImportSummary {
                account_id,
                source_type,
                context,
                total_received,
                total_valid: total_received - total_invalid,
                total_imported,
                total_merged,
                total_duplicates,
                total_invalid,
                dry_run: options.dry_run,
            },
            leads_imported,
            errors,
        })
    }

    // =========================================================================
    //  MAPEADORES POR FONTE
    // =========================================================================

    /// Linha da importação manual/CSV: objeto cru com nomes de campo
    /// flexíveis, resolvidos pela tabela de aliases.
    pub fn map_manual_item(index: usize, item: &Value) -> Result<LeadDraft, ItemError> {
        let name = pick_aliased(item, "name");
        let email = pick_aliased(item, "email");
        let phone = pick_aliased(item, "phone");
        let cnpj = pick_aliased(item, "cnpj");

        let tags = match item.get("tags") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(tag)) if !tag.trim().is_empty() => vec![tag.clone()],
            _ => Vec::new(),
        };

        let draft = LeadDraft {
            name: name.clone(),
            email: email.clone(),
            phone,
            cnpj,
            source: pick_aliased(item, "source").unwrap_or_else(|| "manual_import".to_string()),
            stage: pick_aliased(item, "stage"),
            score: item.get("score").and_then(Value::as_i64).map(|s| s as i32),
            categoria: pick_aliased(item, "categoria"),
            tags,
            endereco: item.get("endereco").cloned(),
            dados_extras: item.get("dadosExtras").or_else(|| item.get("dados_extras")).cloned(),
            label: json!({ "name": name, "email": email }),
        };

        if !draft.has_any_identity() {
            return Err(ItemError {
                index,
                item: draft.label,
                message: "Registro sem email, telefone e CNPJ. Ignorado.".to_string(),
            });
        }
        Ok(draft)
    }

    /// Perfil scrapado do Instagram → lead.
    pub fn map_instagram_profile(
        index: usize,
        ctx: &InstagramContext,
        profile: &InstagramProfile,
    ) -> Result<LeadDraft, ItemError> {
        let mode = ctx.mode.clone().unwrap_or_else(|| "unknown".to_string());

        // Nome: full_name ou username. Telefone: prioriza whatsapp.
        let name = non_empty(profile.full_name.clone())
            .or_else(|| non_empty(profile.username.clone()));
        let phone =
            non_empty(profile.whatsapp.clone()).or_else(|| non_empty(profile.phone.clone()));
        let email = non_empty(profile.email.clone());

        let label = json!({
            "username": profile.username,
            "full_name": profile.full_name,
        });

        let draft = LeadDraft {
            name,
            email,
            phone,
            cnpj: None,
            source: format!("instagram_{mode}"),
            stage: None,
            score: None,
            categoria: Some("social_instagram".to_string()),
            tags: tag_set(&["instagram"], vec![Some(mode.clone()), ctx.source_value.clone()]),
            endereco: Some(json!({
                "cidade": profile.city.clone().unwrap_or_default(),
                "estado": profile.state.clone().unwrap_or_default(),
            })),
            dados_extras: Some(json!({
                "username": profile.username.clone().unwrap_or_default(),
                "full_name": profile.full_name.clone().unwrap_or_default(),
                "website": profile.website.clone().unwrap_or_default(),
                "bio": profile.bio.clone().unwrap_or_default(),
                "country": profile.country.clone().unwrap_or_default(),
                "context_mode": mode,
                "context_source": ctx.source_value.clone().unwrap_or_default(),
                "raw": profile.raw.clone().unwrap_or(json!({})),
            })),
            label,
        };

        // Sem email NEM telefone não há como contatar: ignora.
        if !draft.has_contact() {
            return Err(ItemError {
                index,
                item: draft.label,
                message: "Perfil sem email e sem telefone. Ignorado.".to_string(),
            });
        }
        Ok(draft)
    }

    /// Lugar do Google Maps → lead.
    pub fn map_maps_place(
        index: usize,
        ctx: &MapsContext,
        place: &MapsPlace,
    ) -> Result<LeadDraft, ItemError> {
        // Telefone: international_phone > phone > formatted_phone.
        let phone = non_empty(place.international_phone.clone())
            .or_else(|| non_empty(place.phone.clone()))
            .or_else(|| non_empty(place.formatted_phone.clone()));
        let email = non_empty(place.email.clone());

        let address = place.address.clone().unwrap_or_default();
        let label = json!({ "place_id": place.place_id, "name": place.name });

        let draft = LeadDraft {
            name: non_empty(place.name.clone()),
            email,
            phone,
            cnpj: None,
            source: "google_maps".to_string(),
            stage: None,
            score: None,
            categoria: Some("maps_google".to_string()),
            tags: tag_set(
                &["google_maps"],
                vec![
                    ctx.query.clone(),
                    ctx.location.clone(),
                    ctx.category.clone(),
                    place.category.clone(),
                ],
            ),
            endereco: Some(json!({
                "logradouro": address.street.clone().unwrap_or_default(),
                "numero": address.number.clone().unwrap_or_default(),
                "bairro": address.neighborhood.clone().unwrap_or_default(),
                "cidade": address.city.clone().unwrap_or_default(),
                "estado": address.state.clone().unwrap_or_default(),
                "cep": address.postal_code.clone().unwrap_or_default(),
            })),
            dados_extras: Some(json!({
                "place_id": place.place_id.clone().unwrap_or_default(),
                "website": place.website.clone().unwrap_or_default(),
                "full_address": address.full.clone().unwrap_or_default(),
                "rating": place.rating,
                "user_ratings_total": place.user_ratings_total,
                "maps_url": place.maps_url.clone().unwrap_or_default(),
                "context_query": ctx.query.clone().unwrap_or_default(),
                "context_location": ctx.location.clone().unwrap_or_default(),
                "context_category": ctx.category.clone().unwrap_or_default(),
                "raw": place.raw.clone().unwrap_or(json!({})),
            })),
            label,
        };

        if !draft.has_contact() {
            return Err(ItemError {
                index,
                item: draft.label,
                message: "Place sem email e sem telefone. Ignorado.".to_string(),
            });
        }
        Ok(draft)
    }

    /// Empresa vinda de API de CNPJ → lead.
    pub fn map_cnpj_company(
        index: usize,
        ctx: &CnpjContext,
        company: &CnpjCompany,
    ) -> Result<LeadDraft, ItemError> {
        let name = non_empty(company.nome_fantasia.clone())
            .or_else(|| non_empty(company.razao_social.clone()));
        let phone = non_empty(company.telefone.clone())
            .or_else(|| non_empty(company.telefone1.clone()))
            .or_else(|| non_empty(company.telefone2.clone()));
        let email = non_empty(company.email.clone());
        let cnpj = non_empty(company.cnpj.clone());

        let endereco = company.endereco.clone().unwrap_or(json!({}));
        let uf = endereco
            .get("estado")
            .or_else(|| endereco.get("uf"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| non_empty(company.uf.clone()))
            .or_else(|| non_empty(company.estado.clone()));

        let cnae = non_empty(company.cnae_principal.clone()).or_else(|| {
            company
                .atividade_principal
                .as_ref()
                .and_then(|a| a.get("code"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        let label = json!({
            "razao_social": company.razao_social,
            "nome_fantasia": company.nome_fantasia,
        });

        let draft = LeadDraft {
            name,
            email,
            phone,
            cnpj,
            source: "cnpj_api".to_string(),
            stage: None,
            score: None,
            categoria: Some("api_cnpj".to_string()),
            tags: tag_set(&["cnpj_api"], vec![cnae.clone(), uf.clone()]),
            endereco: Some(json!({
                "logradouro": endereco.get("logradouro").and_then(Value::as_str).unwrap_or(""),
                "numero": endereco.get("numero").and_then(Value::as_str).unwrap_or(""),
                "bairro": endereco.get("bairro").and_then(Value::as_str).unwrap_or(""),
                "cidade": endereco.get("cidade").and_then(Value::as_str).unwrap_or(""),
                "estado": uf.clone().unwrap_or_default(),
                "cep": endereco.get("cep").and_then(Value::as_str).unwrap_or(""),
            })),
            dados_extras: Some(json!({
                "cnpj": company.cnpj.clone().unwrap_or_default(),
                "razao_social": company.razao_social.clone().unwrap_or_default(),
                "nome_fantasia": company.nome_fantasia.clone().unwrap_or_default(),
                "cnae_principal": cnae.unwrap_or_default(),
                "atividade_principal": company.atividade_principal.clone().unwrap_or(json!("")),
                "atividades_secundarias": company.atividades_secundarias.clone(),
                "situacao_cadastral": company.situacao_cadastral.clone().unwrap_or_default(),
                "data_abertura": company.data_abertura.clone().unwrap_or_default(),
                "capital_social": company.capital_social.clone(),
                "socios": company.socios.clone(),
                "context_api_name": ctx.api_name.clone().unwrap_or_default(),
                "context_filter": ctx.filter.clone().unwrap_or_default(),
                "raw": company.raw.clone().unwrap_or(json!({})),
            })),
            label,
        };

        // Gate mais frouxo que o dos outros adaptadores: CNPJ sozinho serve.
        if !draft.has_any_identity() {
            return Err(ItemError {
                index,
                item: draft.label,
                message: "Empresa sem CNPJ, email e telefone. Ignorada.".to_string(),
            });
        }
        Ok(draft)
    }

    /// Lead único do webhook genérico de formulário (lote de um).
    pub fn map_form_lead(source_type: Option<&str>, lead: &Value) -> Result<LeadDraft, ItemError> {
        let get = |key: &str| {
            lead.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };

        let name = get("nome").or_else(|| get("name"));
        let email = get("email");
        let phone = get("telefone").or_else(|| get("phone"));

        let tags = match lead.get("tags") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let draft = LeadDraft {
            name: name.clone(),
            email: email.clone(),
            phone,
            cnpj: None,
            source: get("origem")
                .or_else(|| source_type.map(str::to_string))
                .unwrap_or_else(|| "form_webhook".to_string()),
            stage: None,
            score: None,
            categoria: get("categoria"),
            tags,
            endereco: lead.get("endereco").cloned(),
            dados_extras: lead.get("dados_extras").cloned(),
            label: json!({ "name": name, "email": email }),
        };

        if !draft.has_contact() {
            return Err(ItemError {
                index: 0,
                item: draft.label,
                message: "Lead sem email e sem telefone. Ignorado.".to_string(),
            });
        }
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Account;
    use crate::services::lead_service::tests::MemLeadStore;
    use async_trait::async_trait;
    use chrono::Utc;

    struct MemAccountStore {
        account_id: Uuid,
    }

    #[async_trait]
    impl AccountStore for MemAccountStore {
        async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
            if account_id == self.account_id {
                Ok(Some(Account {
                    id: account_id,
                    name: "Conta de Teste".to_string(),
                    email: None,
                    created_at: Utc::now(),
                }))
            } else {
                Ok(None)
            }
        }
    }

    fn harness(account_id: Uuid) -> (Arc<MemLeadStore>, ImportService) {
        let store = Arc::new(MemLeadStore::default());
        let leads = LeadService::new(store.clone());
        let accounts = Arc::new(MemAccountStore { account_id });
        (store, ImportService::new(accounts, leads))
    }

    fn manual_items(raw: Value) -> Vec<Result<LeadDraft, ItemError>> {
        raw.as_array()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, item)| ImportService::map_manual_item(i, item))
            .collect()
    }

    #[tokio::test]
    async fn lote_manual_colapsa_duplicados_internos() {
        let account = Uuid::new_v4();
        let (store, service) = harness(account);

        let mapped = manual_items(json!([
            { "nome": "Ana", "email": "ana@x.com" },
            { "nome": "Ana Paula", "email": "ana@x.com" },
        ]));

        let response = service
            .process(account, "manual".into(), json!({}), BatchOptions::default(), mapped)
            .await
            .unwrap();

        assert_eq!(response.summary.total_received, 2);
        assert_eq!(response.summary.total_imported, 1);
        assert_eq!(response.summary.total_merged, 1);
        assert_eq!(store.len(), 1);

        // Primeiro valor vence: o nome gravado continua "Ana".
        let lead_id = response.leads_imported[0].lead_id.unwrap();
        assert_eq!(store.lead(lead_id).name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn conta_inexistente_rejeita_o_lote_inteiro() {
        let account = Uuid::new_v4();
        let (store, service) = harness(account);

        let mapped = manual_items(json!([{ "nome": "Ana", "email": "ana@x.com" }]));
        let err = service
            .process(Uuid::new_v4(), "manual".into(), json!({}), BatchOptions::default(), mapped)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AccountNotFound));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn item_invalido_conta_e_nao_aborta_o_lote() {
        let account = Uuid::new_v4();
        let (store, service) = harness(account);

        let mapped = manual_items(json!([
            { "nome": "Sem Contato" },
            { "nome": "Ana", "telefone": "(11) 99999-8888" },
        ]));

        let response = service
            .process(account, "manual".into(), json!({}), BatchOptions::default(), mapped)
            .await
            .unwrap();

        assert_eq!(response.summary.total_invalid, 1);
        assert_eq!(response.summary.total_valid, 1);
        assert_eq!(response.summary.total_imported, 1);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_marca_duplicado_e_nao_grava() {
        let account = Uuid::new_v4();
        let (store, service) = harness(account);

        // Lead existente por telefone.
        let mut existing = crate::services::lead_service::tests::seeded_lead(account);
        existing.phone = Some("11999998888".to_string());
        let existing_id = existing.id;
        store.seed(existing);

        let mapped = manual_items(json!([
            { "nome": "Dup", "telefone": "(11) 99999-8888" },
            { "nome": "Nova", "email": "nova@x.com" },
        ]));

        let options = BatchOptions { dedupe: true, dry_run: true };
        let response = service
            .process(account, "manual".into(), json!({}), options, mapped)
            .await
            .unwrap();

        assert!(response.summary.dry_run);
        assert_eq!(response.summary.total_duplicates, 1);
        assert_eq!(response.summary.total_imported, 1);
        assert!(response.leads_imported[0].lead_id.is_none());

        // Nenhuma mutação: só o lead semeado existe, intacto.
        assert_eq!(store.len(), 1);
        let untouched = store.lead(existing_id);
        assert_eq!(untouched.name, None);
    }

    #[tokio::test]
    async fn dedupe_desligado_sempre_cria() {
        let account = Uuid::new_v4();
        let (store, service) = harness(account);

        let mapped = manual_items(json!([
            { "email": "ana@x.com" },
            { "email": "ana@x.com" },
        ]));

        let options = BatchOptions { dedupe: false, dry_run: false };
        let response = service
            .process(account, "manual".into(), json!({}), options, mapped)
            .await
            .unwrap();

        assert_eq!(response.summary.total_imported, 2);
        assert_eq!(response.summary.total_merged, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn aliases_da_importacao_manual() {
        let draft = ImportService::map_manual_item(
            0,
            &json!({
                "nome": "Ana",
                "telefone1": "(11) 99999-8888",
                "origem": "planilha",
                "categoria": "cliente potencial",
                "tags": ["planilha", "manual"],
            }),
        )
        .unwrap();

        assert_eq!(draft.name.as_deref(), Some("Ana"));
        assert_eq!(draft.phone.as_deref(), Some("(11) 99999-8888"));
        assert_eq!(draft.source, "planilha");
        assert_eq!(draft.categoria.as_deref(), Some("cliente potencial"));
        assert_eq!(draft.tags, vec!["planilha", "manual"]);
    }

    #[test]
    fn instagram_prioriza_whatsapp_e_deduplica_tags() {
        let ctx = InstagramContext {
            mode: Some("hashtag".to_string()),
            source_value: Some("hashtag".to_string()), // colide com a tag do modo
        };
        let profile = InstagramProfile {
            username: Some("ana.store".to_string()),
            whatsapp: Some("(11) 99999-8888".to_string()),
            phone: Some("(11) 11111-1111".to_string()),
            ..Default::default()
        };

        let draft = ImportService::map_instagram_profile(0, &ctx, &profile).unwrap();
        assert_eq!(draft.name.as_deref(), Some("ana.store"));
        assert_eq!(draft.phone.as_deref(), Some("(11) 99999-8888"));
        assert_eq!(draft.source, "instagram_hashtag");
        // União como conjunto: "hashtag" aparece uma vez só.
        assert_eq!(draft.tags.iter().filter(|t| *t == "hashtag").count(), 1);
        assert!(draft.tags.contains(&"instagram".to_string()));
    }

    #[test]
    fn instagram_sem_contato_e_invalido() {
        let profile = InstagramProfile {
            username: Some("sem.contato".to_string()),
            ..Default::default()
        };
        let err =
            ImportService::map_instagram_profile(3, &InstagramContext::default(), &profile)
                .unwrap_err();
        assert_eq!(err.index, 3);
    }

    #[test]
    fn cnpj_aceita_empresa_so_com_cnpj() {
        let company = CnpjCompany {
            cnpj: Some("12.345.678/0001-90".to_string()),
            razao_social: Some("ACME LTDA".to_string()),
            ..Default::default()
        };
        let draft =
            ImportService::map_cnpj_company(0, &CnpjContext::default(), &company).unwrap();
        assert_eq!(draft.name.as_deref(), Some("ACME LTDA"));
        assert_eq!(draft.cnpj.as_deref(), Some("12.345.678/0001-90"));
        assert_eq!(draft.source, "cnpj_api");
        assert!(draft.tags.contains(&"cnpj_api".to_string()));
    }

    #[test]
    fn maps_prioridade_de_telefones() {
        let place = MapsPlace {
            name: Some("Padaria Central".to_string()),
            phone: Some("(11) 2222-3333".to_string()),
            formatted_phone: Some("(11) 4444-5555".to_string()),
            ..Default::default()
        };
        let draft = ImportService::map_maps_place(0, &MapsContext::default(), &place).unwrap();
        // Sem international_phone, o campo `phone` vence o formatado.
        assert_eq!(draft.phone.as_deref(), Some("(11) 2222-3333"));
        assert_eq!(draft.source, "google_maps");
    }
}
