// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{AccountRepository, LeadRepository},
    services::{ImportService, LeadService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub lead_service: LeadService,
    pub import_service: ImportService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        // Os repositórios Postgres entram nos serviços como capacidades
        // injetadas; nada de singleton global de cliente de banco.
        let lead_repo = Arc::new(LeadRepository::new(db_pool.clone()));
        let account_repo = Arc::new(AccountRepository::new(db_pool.clone()));

        let lead_service = LeadService::new(lead_repo);
        let import_service = ImportService::new(account_repo, lead_service.clone());

        Ok(Self {
            db_pool,
            lead_service,
            import_service,
        })
    }
}
