// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const ACCOUNT_ID_HEADER: &str = "x-account-id";

// Extrator com o UUID da conta que o chamador quer acessar. As rotas de
// leitura usam este cabeçalho; os lotes de importação carregam o
// account_id no próprio corpo.
#[derive(Debug, Clone)]
pub struct AccountContext(pub Uuid);

impl<S> FromRequestParts<S> for AccountContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts.headers.get(ACCOUNT_ID_HEADER);

        match header_value {
            Some(value) => {
                let value_str = value.to_str().map_err(|_| {
                    AppError::InvalidPayload(
                        "Cabeçalho X-Account-ID contém caracteres inválidos.".to_string(),
                    )
                })?;

                let account_id = Uuid::parse_str(value_str).map_err(|_| {
                    AppError::InvalidPayload(
                        "Cabeçalho X-Account-ID inválido (não é um UUID).".to_string(),
                    )
                })?;

                Ok(AccountContext(account_id))
            }
            None => Err(AppError::InvalidPayload(
                "O cabeçalho X-Account-ID é obrigatório.".to_string(),
            )),
        }
    }
}
