//! Modelos de dominio (fragmentos OCR, resultados ESG y facturas de suministros).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Un fragmento de texto detectado por el OCR.
/// Se serializa con los nombres de campo del proveedor (`DetectedText`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    #[serde(rename = "DetectedText", default)]
    pub text: String,
    #[serde(rename = "Confidence", default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            kind: None,
        }
    }
}

/// Nota ESG de un producto. Sólo `A`..`D` participan en la media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsgGrade {
    A,
    B,
    C,
    D,
    Unknown,
    Error,
}

impl EsgGrade {
    /// Interpreta la nota tal como la devuelve el catálogo (`"a"`, `"B"`, `"unknown"`...).
    pub fn from_catalog(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "a" => Self::A,
            "b" => Self::B,
            "c" => Self::C,
            "d" => Self::D,
            _ => Self::Unknown,
        }
    }

    /// Escala ordinal `a→4, b→3, c→2, d→1`.
    pub fn ordinal(self) -> Option<u8> {
        match self {
            Self::A => Some(4),
            Self::B => Some(3),
            Self::C => Some(2),
            Self::D => Some(1),
            Self::Unknown | Self::Error => None,
        }
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            4 => Some(Self::A),
            3 => Some(Self::B),
            2 => Some(Self::C),
            1 => Some(Self::D),
            _ => None,
        }
    }
}

impl fmt::Display for EsgGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::Unknown => "unknown",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Resultado de consultar un producto en el catálogo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EsgLookupResult {
    pub name: String,
    pub grade: EsgGrade,
    /// Nota tal cual la dio el catálogo, si la hubo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_grade: Option<String>,
    /// Datos de impacto (`ecoscore_data`); objeto vacío si no hay.
    pub impact: Value,
}

impl EsgLookupResult {
    pub fn without_match(name: String, grade: EsgGrade) -> Self {
        Self {
            name,
            grade,
            raw_grade: None,
            impact: Value::Object(Default::default()),
        }
    }
}

/// Una fila del CSV de facturas de suministros, con su puntuación calculada.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilityRecord {
    #[serde(rename = "dateDue")]
    pub date_due: String,
    #[serde(rename = "kWhUsed")]
    pub kwh_used: f64,
    #[serde(rename = "co2Avoided")]
    pub co2_avoided: f64,
    #[serde(rename = "amountDue")]
    pub amount_due: f64,
    #[serde(rename = "eScore")]
    pub e_score: u8,
}

/// Tabla CSV genérica (cabeceras + filas) usada como contexto del asistente.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
