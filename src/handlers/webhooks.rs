// src/handlers/webhooks.rs
//
// Superfícies de ingestão por webhook: formulário genérico, scrape de
// Instagram, scrape de Google Maps e API de CNPJ. Todas respondem no mesmo
// formato (status + summary + itens + erros) do harness de importação.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};
use validator::ValidateEmail;

use crate::{
    common::error::AppError,
    config::AppState,
    models::import::{
        CnpjImportPayload, FormWebhookPayload, InstagramImportPayload, MapsImportPayload,
    },
    services::ImportService,
};

// POST /api/webhooks/forms/generic
// Recebe 1 lead no padrão oficial e processa como lote de um item.
pub async fn form_generic(
    State(app_state): State<AppState>,
    Json(payload): Json<FormWebhookPayload>,
) -> Result<impl IntoResponse, AppError> {
    if !payload.lead.is_object() {
        return Err(AppError::InvalidPayload(
            "Campo 'lead' é obrigatório e deve ser um objeto.".to_string(),
        ));
    }

    // Validação de formato antes de entrar no pipeline.
    if let Some(email) = payload.lead.get("email").and_then(Value::as_str) {
        if !email.trim().is_empty() && !email.validate_email() {
            return Err(AppError::InvalidPayload("E-mail inválido.".to_string()));
        }
    }

    let mapped = vec![ImportService::map_form_lead(
        payload.source_type.as_deref(),
        &payload.lead,
    )];

    let response = app_state
        .import_service
        .process(
            payload.account_id,
            payload.source_type.unwrap_or_else(|| "form".to_string()),
            json!({}),
            payload.options,
            mapped,
        )
        .await?;

    Ok(Json(response))
}

// POST /api/social/instagram/import
// Recebe perfis scrapados do Instagram e converte em leads.
pub async fn instagram_import(
    State(app_state): State<AppState>,
    Json(payload): Json<InstagramImportPayload>,
) -> Result<impl IntoResponse, AppError> {
    let context = json!({
        "mode": payload.context.mode.clone().unwrap_or_else(|| "unknown".to_string()),
        "source_value": payload.context.source_value.clone().unwrap_or_default(),
    });

    let mapped = payload
        .profiles
        .iter()
        .enumerate()
        .map(|(index, profile)| {
            ImportService::map_instagram_profile(index, &payload.context, profile)
        })
        .collect();

    let response = app_state
        .import_service
        .process(
            payload.account_id,
            payload.source_type.unwrap_or_else(|| "instagram".to_string()),
            context,
            payload.options,
            mapped,
        )
        .await?;

    Ok(Json(response))
}

// POST /api/maps/google/import
// Recebe lugares do Google Maps via scrap externo e converte em leads.
pub async fn maps_import(
    State(app_state): State<AppState>,
    Json(payload): Json<MapsImportPayload>,
) -> Result<impl IntoResponse, AppError> {
    let context = json!({
        "query": payload.context.query.clone().unwrap_or_default(),
        "location": payload.context.location.clone().unwrap_or_default(),
        "radius_meters": payload.context.radius_meters,
        "category": payload.context.category.clone().unwrap_or_default(),
    });

    let mapped = payload
        .places
        .iter()
        .enumerate()
        .map(|(index, place)| ImportService::map_maps_place(index, &payload.context, place))
        .collect();

    let response = app_state
        .import_service
        .process(
            payload.account_id,
            payload.source_type.unwrap_or_else(|| "google_maps".to_string()),
            context,
            payload.options,
            mapped,
        )
        .await?;

    Ok(Json(response))
}

// POST /api/corp/cnpj/import
// Recebe empresas vindas de API de CNPJ e converte em leads.
pub async fn cnpj_import(
    State(app_state): State<AppState>,
    Json(payload): Json<CnpjImportPayload>,
) -> Result<impl IntoResponse, AppError> {
    let context = json!({
        "api_name": payload.context.api_name.clone().unwrap_or_default(),
        "filter": payload.context.filter.clone().unwrap_or_default(),
    });

    let mapped = payload
        .companies
        .iter()
        .enumerate()
        .map(|(index, company)| ImportService::map_cnpj_company(index, &payload.context, company))
        .collect();

    let response = app_state
        .import_service
        .process(
            payload.account_id,
            payload.source_type.unwrap_or_else(|| "cnpj_api".to_string()),
            context,
            payload.options,
            mapped,
        )
        .await?;

    Ok(Json(response))
}
