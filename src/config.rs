//! Carga y gestión de configuración de la aplicación (servicios externos + LLM).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,

    /// Servicio OCR (forma DetectText). Sin él, el OCR devuelve listas vacías.
    pub ocr_endpoint: Option<String>,
    pub ocr_bucket: String,

    pub catalog_base_url: String,
    pub lookup_concurrency: usize,
    pub http_timeout: Duration,

    pub scratch_dir: PathBuf,
    pub utility_csv: PathBuf,
    pub esg_csv: PathBuf,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,
    pub openai_api_key: Option<String>,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de consulta de claves.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let server_addr = var_or("SERVER_ADDR", "127.0.0.1:3322");

        let ocr_endpoint = lookup("OCR_ENDPOINT").filter(|v| !v.trim().is_empty());
        let ocr_bucket = var_or("OCR_BUCKET", "ecosaver-receipts");

        let catalog_base_url = var_or("CATALOG_BASE_URL", "https://world.openfoodfacts.org");

        let lookup_concurrency: usize = var_or("LOOKUP_CONCURRENCY", "4")
            .parse()
            .context("LOOKUP_CONCURRENCY debe ser un entero")?;
        if lookup_concurrency == 0 {
            return Err(anyhow!("LOOKUP_CONCURRENCY debe ser al menos 1"));
        }

        let timeout_secs: u64 = var_or("HTTP_TIMEOUT_SECS", "15")
            .parse()
            .context("HTTP_TIMEOUT_SECS debe ser un entero")?;

        let scratch_dir = PathBuf::from(var_or("SCRATCH_DIR", "."));
        let utility_csv = PathBuf::from(var_or("UTILITY_CSV", "frontend/chatbot/utilitiesFinal.csv"));
        let esg_csv = PathBuf::from(var_or("ESG_CSV", "frontend/chatbot/ESG.csv"));

        let llm_provider = LlmProvider::from_str(&var_or("LLM_PROVIDER", "openai"))?;
        let llm_chat_model = var_or("LLM_CHAT_MODEL", "gpt-3.5-turbo");
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty());

        Ok(Self {
            server_addr,
            ocr_endpoint,
            ocr_bucket,
            catalog_base_url,
            lookup_concurrency,
            http_timeout: Duration::from_secs(timeout_secs),
            scratch_dir,
            utility_csv,
            esg_csv,
            llm_provider,
            llm_chat_model,
            openai_api_key,
        })
    }
}
