// Módulos de la aplicación
mod api;
mod app_state;
mod catalog;
mod config;
mod dashboard;
mod esg;
mod llm;
mod models;
mod ocr;
mod receipt;
mod scratch;
mod utility;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::catalog::OpenFoodFactsCatalog;
use crate::ocr::{DisabledTextDetector, HttpTextDetector, TextDetector};
use crate::scratch::ScratchStore;
use crate::utility::UtilityLedger;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Clientes externos: un único cliente HTTP compartido
    let http = reqwest::Client::builder()
        .timeout(cfg.http_timeout)
        .build()
        .context("Error creando el cliente HTTP")?;

    let ocr: Arc<dyn TextDetector> = match &cfg.ocr_endpoint {
        Some(endpoint) => Arc::new(HttpTextDetector::new(http.clone(), endpoint)?),
        None => {
            warn!("OCR_ENDPOINT no definido: el análisis de recibos devolverá listas vacías.");
            Arc::new(DisabledTextDetector)
        }
    };
    let catalog = Arc::new(OpenFoodFactsCatalog::new(http, &cfg.catalog_base_url)?);

    // 4. Inicializar gestor de LLMs
    let llm_manager =
        llm::LlmManager::from_config(&cfg).context("Error inicializando LLM Manager")?;

    // Facturas iniciales; si no hay CSV se arranca con el histórico vacío.
    let mut ledger = UtilityLedger::default();
    match utility::load_utility_csv(&cfg.utility_csv) {
        Ok(records) => ledger.append(records),
        Err(e) => warn!("No se cargó el histórico de suministros: {:#}", e),
    }

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // 5. Crear estado compartido de la aplicación
    let app_state = AppState {
        scratch: ScratchStore::new(cfg.scratch_dir.clone()),
        config: cfg,
        ocr,
        catalog,
        llm_manager,
        utilities: Arc::new(Mutex::new(ledger)),
        shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
    };

    // 6. Configurar el router de la API y el servicio de ficheros estáticos
    let server_addr = app_state.config.server_addr.clone();
    let app = Router::new()
        .merge(api::create_router(app_state))
        .fallback_service(ServeDir::new("frontend"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 7. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    let server_url = format!("http://{}", server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    // Abrir el frontend en el navegador por defecto
    if webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error en el servidor HTTP")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
