//src/main.rs

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de leads (listagem + importação manual)
    let lead_routes = Router::new()
        .route("/", get(handlers::leads::list_leads))
        .route("/import/manual", post(handlers::leads::import_manual))
        .route("/{id}/events", get(handlers::leads::list_lead_events));

    // Superfícies de ingestão por webhook
    let webhook_routes = Router::new()
        .route("/forms/generic", post(handlers::webhooks::form_generic));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/leads", lead_routes)
        .nest("/api/webhooks", webhook_routes)
        .route(
            "/api/social/instagram/import",
            post(handlers::webhooks::instagram_import),
        )
        .route(
            "/api/maps/google/import",
            post(handlers::webhooks::maps_import),
        )
        .route(
            "/api/corp/cnpj/import",
            post(handlers::webhooks::cnpj_import),
        )
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
