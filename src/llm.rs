//! Asistente de chat sobre los CSV de suministros y de notas ESG, usando Rig.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el futuro.

use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rig::completion::Prompt;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::config::{AppConfig, LlmProvider};
use crate::models::CsvTable;

/// Filas y columnas de cada CSV que se envían como contexto.
const CONTEXT_ROWS: usize = 10;
const CONTEXT_COLUMNS: usize = 3;

const SYSTEM_PROMPT: &str = r#"
You are analyzing two CSV files related to energy consumption projections.
The first CSV looks at utilities across time and some other factors, whereas the second CSV gives an ESG score for different products.
You are a financial and environmental expert who is ready to answer questions about this product.
"#;

/// Lee un CSV genérico con cabecera.
pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    let file = File::open(path)
        .with_context(|| format!("No se pudo abrir el CSV {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for row in rdr.records() {
        rows.push(row?.iter().map(str::to_string).collect());
    }
    Ok(CsvTable { headers, rows })
}

/// Como `read_csv_table`, pero un fallo deja la tabla vacía.
pub fn read_csv_table_or_empty(path: &Path) -> CsvTable {
    read_csv_table(path).unwrap_or_else(|e| {
        error!("Error leyendo CSV {}: {:#}", path.display(), e);
        CsvTable::default()
    })
}

/// Primeras `max_rows` filas, limitadas a las tres primeras columnas.
pub fn select_relevant_rows(table: &CsvTable, max_rows: usize) -> Vec<Map<String, Value>> {
    let columns: Vec<&String> = table.headers.iter().take(CONTEXT_COLUMNS).collect();

    table
        .rows
        .iter()
        .take(max_rows)
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let cell = row.get(idx).cloned().unwrap_or_default();
                    ((*col).clone(), Value::String(cell))
                })
                .collect()
        })
        .collect()
}

/// Mensaje de usuario: la pregunta seguida de los datos de ambos CSV.
pub fn build_user_message(question: &str, utilities: &CsvTable, esg: &CsvTable) -> Result<String> {
    let first = serde_json::to_string(&select_relevant_rows(utilities, CONTEXT_ROWS))?;
    let second = serde_json::to_string(&select_relevant_rows(esg, CONTEXT_ROWS))?;
    Ok(format!(
        "{question}\n\nData from first CSV:\n{first}\n\nData from second CSV:\n{second}"
    ))
}

/// Gestor del modelo de chat.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
    pub openai_api_key: Option<String>,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            provider: cfg.llm_provider.clone(),
            chat_model: cfg.llm_chat_model.clone(),
            openai_api_key: cfg.openai_api_key.clone(),
        })
    }

    /// Responde una pregunta usando como contexto los CSV de suministros y ESG.
    pub async fn answer_about_data(
        &self,
        question: &str,
        utilities: &CsvTable,
        esg: &CsvTable,
    ) -> Result<String> {
        let message = build_user_message(question, utilities, esg)?;
        match self.provider {
            LlmProvider::OpenAI => self.answer_with_openai(&message).await,
            ref other => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para chat",
                other
            )),
        }
    }

    async fn answer_with_openai(&self, message: &str) -> Result<String> {
        use rig::providers::openai;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        // Sin clave se devuelve error en lugar de construir el cliente.
        let api_key = self
            .openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY no está definida")?;
        let client = openai::Client::new(api_key);

        // Modelo de chat por defecto si no se ha configurado otro
        let model_name = if self.chat_model.is_empty() {
            "gpt-3.5-turbo"
        } else {
            self.chat_model.as_str()
        };

        let agent = client
            .agent(model_name)
            .preamble(SYSTEM_PROMPT)
            .temperature(0.7)
            .max_tokens(300)
            .build();

        let answer = agent.prompt(message).await?;
        info!("Respuesta del asistente generada ({} caracteres)", answer.len());

        if answer.trim().is_empty() {
            return Ok("No detailed response available".to_string());
        }
        Ok(answer)
    }
}
