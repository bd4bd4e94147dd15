use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{
    catalog::ProductCatalog, config::AppConfig, llm::LlmManager, ocr::TextDetector,
    scratch::ScratchStore, utility::UtilityLedger,
};

/// Estado compartido: los clientes se construyen una vez en `main` y se pasan aquí.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub ocr: Arc<dyn TextDetector>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub llm_manager: LlmManager,
    pub scratch: ScratchStore,
    pub utilities: Arc<Mutex<UtilityLedger>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}
