use std::path::PathBuf;
use std::sync::MutexGuard;

use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    dashboard::{self, Dashboard, SpendingOverview, Transaction},
    esg,
    llm,
    models::{EsgLookupResult, TextFragment, UtilityRecord},
    ocr::{self, ImageLocation},
    receipt,
    scratch::{ScratchStore, DEFAULT_OCR_FILE},
    utility::{self, UtilityChart, UtilityLedger},
};

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Un cuerpo JSON que no encaja con el payload se responde con 400 y `{"error"}`.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!("Cuerpo de petición rechazado: {}", rejection.body_text());
        api_error(StatusCode::BAD_REQUEST, rejection.body_text())
    })
}

/// Lectura o escritura de ficheros fuera de los hilos del runtime.
async fn blocking_io<T, F>(task: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("La tarea de E/S terminó de forma inesperada")?
}

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct ReceiptImagePayload {
    bucket: Option<String>,
    #[serde(default)]
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReceiptResponse {
    text_detections: Vec<TextFragment>,
}

#[derive(Serialize)]
pub struct ReceiptProductsResponse {
    products: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveJsonPayload {
    json_content: Option<Value>,
    file_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterJsonPayload {
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterJsonResponse {
    filtered_data: Vec<String>,
}

#[derive(Deserialize)]
pub struct FetchEsgPayload {
    #[serde(default)]
    products: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct FetchEsgResponse {
    results: Vec<EsgLookupResult>,
    /// Letra media (`"A"`..`"D"`), o `null` si no hay nota disponible.
    average: Option<String>,
}

#[derive(Deserialize)]
pub struct LoadUtilitiesPayload {
    #[serde(default)]
    file: Option<String>,
}

#[derive(Serialize)]
pub struct LoadUtilitiesResponse {
    loaded: usize,
    records: Vec<UtilityRecord>,
}

#[derive(Deserialize)]
pub struct UtilitiesQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    answer: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/spending", get(spending_handler))
        .route("/api/transactions", get(transactions_handler))
        .route("/api/analyze-receipt", post(analyze_receipt_handler))
        .route("/api/receipt-products", post(receipt_products_handler))
        .route("/api/save-json", post(save_json_handler))
        .route("/api/filter-json", post(filter_json_handler))
        .route("/api/fetch-esg", post(fetch_esg_handler))
        .route("/api/utilities", get(list_utilities_handler))
        .route("/api/utilities/load", post(load_utilities_handler))
        .route("/api/utilities/chart", get(utilities_chart_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers del panel ---

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn dashboard_handler() -> Json<Dashboard> {
    Json(dashboard::dashboard())
}

async fn spending_handler() -> Json<SpendingOverview> {
    Json(dashboard::spending_overview())
}

async fn transactions_handler() -> Json<Vec<Transaction>> {
    Json(dashboard::recent_transactions())
}

// --- Recibos: OCR y filtrado ---

fn image_location(state: &AppState, payload: ReceiptImagePayload) -> Result<ImageLocation, ApiError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Falta el nombre de la imagen."));
    }
    let bucket = payload
        .bucket
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| state.config.ocr_bucket.clone());
    Ok(ImageLocation { bucket, name })
}

#[axum::debug_handler]
async fn analyze_receipt_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReceiptImagePayload>, JsonRejection>,
) -> Result<Json<AnalyzeReceiptResponse>, ApiError> {
    let payload = json_body(payload)?;
    let image = image_location(&state, payload)?;
    let text_detections = ocr::detect_text_or_empty(state.ocr.as_ref(), &image).await;
    Ok(Json(AnalyzeReceiptResponse { text_detections }))
}

#[axum::debug_handler]
async fn receipt_products_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReceiptImagePayload>, JsonRejection>,
) -> Result<Json<ReceiptProductsResponse>, ApiError> {
    let payload = json_body(payload)?;
    let image = image_location(&state, payload)?;
    let fragments = ocr::detect_text_or_empty(state.ocr.as_ref(), &image).await;
    let products = receipt::extract_product_names(&fragments);
    info!("{} productos extraídos de {}", products.len(), image.name);
    Ok(Json(ReceiptProductsResponse { products }))
}

#[axum::debug_handler]
async fn save_json_handler(
    State(state): State<AppState>,
    payload: Result<Json<SaveJsonPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let (content, file_name) = match (payload.json_content, payload.file_name) {
        (Some(content), Some(name)) if !content.is_null() && !name.is_empty() => (content, name),
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Missing jsonContent or fileName",
            ))
        }
    };

    if !ScratchStore::is_valid_name(&file_name) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Nombre de fichero no válido."));
    }

    let scratch = state.scratch.clone();
    match blocking_io(move || scratch.save(&file_name, &content)).await {
        Ok(path) => Ok((
            StatusCode::OK,
            Json(json!({
                "message": "File saved successfully",
                "filePath": path.display().to_string(),
            })),
        )),
        Err(e) => {
            error!("Error guardando JSON: {:#}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save JSON file",
            ))
        }
    }
}

#[axum::debug_handler]
async fn filter_json_handler(
    State(state): State<AppState>,
    payload: Result<Json<FilterJsonPayload>, JsonRejection>,
) -> Result<Json<FilterJsonResponse>, ApiError> {
    let payload = json_body(payload)?;
    let file_name = payload
        .file_name
        .unwrap_or_else(|| DEFAULT_OCR_FILE.to_string());

    if !ScratchStore::is_valid_name(&file_name) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Nombre de fichero no válido."));
    }

    let scratch = state.scratch.clone();
    let target = file_name.clone();
    let loaded = blocking_io(move || scratch.load(&target))
        .await
        .and_then(|found| found.map(receipt::fragments_from_detect_text).transpose());

    match loaded {
        Ok(Some(fragments)) => Ok(Json(FilterJsonResponse {
            filtered_data: receipt::extract_product_names(&fragments),
        })),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("File '{file_name}' not found."),
        )),
        Err(e) => {
            error!("Error filtrando el JSON {}: {:#}", file_name, e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to filter JSON file.",
            ))
        }
    }
}

// --- Notas ESG ---

#[axum::debug_handler]
async fn fetch_esg_handler(
    State(state): State<AppState>,
    payload: Result<Json<FetchEsgPayload>, JsonRejection>,
) -> Result<Json<FetchEsgResponse>, ApiError> {
    let payload = json_body(payload)?;
    let products = match payload.products {
        Some(products) if !products.is_empty() => products,
        _ => return Err(api_error(StatusCode::BAD_REQUEST, "No products provided.")),
    };

    let report = esg::assess_products(
        state.catalog.as_ref(),
        &products,
        state.config.lookup_concurrency,
    )
    .await;

    Ok(Json(FetchEsgResponse {
        results: report.results,
        average: report.average.map(|grade| grade.to_string()),
    }))
}

// --- Suministros ---

fn ledger(state: &AppState) -> MutexGuard<'_, UtilityLedger> {
    state
        .utilities
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// CSV por defecto, o uno con nombre simple junto a él.
fn utility_csv_path(state: &AppState, file: Option<String>) -> Result<PathBuf, ApiError> {
    let default = state.config.utility_csv.clone();
    match file {
        None => Ok(default),
        Some(name) if ScratchStore::is_valid_name(&name) => Ok(default
            .parent()
            .map(|dir| dir.join(&name))
            .unwrap_or_else(|| PathBuf::from(&name))),
        Some(_) => Err(api_error(StatusCode::BAD_REQUEST, "Nombre de fichero no válido.")),
    }
}

#[axum::debug_handler]
async fn load_utilities_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoadUtilitiesPayload>, JsonRejection>,
) -> Result<Json<LoadUtilitiesResponse>, ApiError> {
    let payload = json_body(payload)?;
    let path = utility_csv_path(&state, payload.file)?;
    if !path.is_file() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No existe el CSV {}", path.display()),
        ));
    }

    match blocking_io(move || utility::load_utility_csv(&path)).await {
        Ok(records) => {
            ledger(&state).append(records.iter().cloned());
            Ok(Json(LoadUtilitiesResponse {
                loaded: records.len(),
                records,
            }))
        }
        Err(e) => {
            error!("Error cargando facturas: {:#}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error al leer el CSV: {}", e),
            ))
        }
    }
}

async fn list_utilities_handler(
    State(state): State<AppState>,
    Query(params): Query<UtilitiesQuery>,
) -> Json<Vec<UtilityRecord>> {
    let ledger = ledger(&state);
    let records = match params.limit {
        Some(limit) => ledger.recent(limit),
        None => ledger.records(),
    };
    Json(records.to_vec())
}

async fn utilities_chart_handler(State(state): State<AppState>) -> Json<UtilityChart> {
    Json(ledger(&state).chart())
}

// --- Asistente ---

#[axum::debug_handler]
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let payload = json_body(payload)?;
    let question = payload.question.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "La pregunta está vacía."));
    }

    let utility_csv = state.config.utility_csv.clone();
    let esg_csv = state.config.esg_csv.clone();
    let (utilities, esg_table) = blocking_io(move || {
        Ok((
            llm::read_csv_table_or_empty(&utility_csv),
            llm::read_csv_table_or_empty(&esg_csv),
        ))
    })
    .await
    .map_err(|e| {
        error!("Error leyendo los CSV del asistente: {:#}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
    })?;

    match state
        .llm_manager
        .answer_about_data(question, &utilities, &esg_table)
        .await
    {
        Ok(answer) => Ok(Json(ChatResponse { answer })),
        Err(e) => {
            warn!("Error del asistente: {:#}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: {}", e),
            ))
        }
    }
}

// --- Handler de Apagado ---

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    let sender = state
        .shutdown_sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(());
    }
    StatusCode::OK
}
