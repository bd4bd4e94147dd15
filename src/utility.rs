//! Facturas de suministros: lectura del CSV, puntuación ambiental y series para gráficas.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::info;

use crate::models::UtilityRecord;

pub const DATE_DUE: &str = "Date Due";
pub const KWH_USED: &str = "kWh Electricity Used";
// El fichero de origen trae la errata "Emmisions" en la cabecera.
pub const CO2_AVOIDED: &str = "CO2 Emmisions Avoided";
pub const AMOUNT_DUE: &str = "Amount Due";

const KWH_WEIGHT: f64 = 0.6;
const CO2_WEIGHT: f64 = 0.4;
const MAX_SCORE: f64 = 100.0;
const NORMALIZATION_BASE: f64 = 1000.0;

/// Puntuación 0..=100: menos consumo y más CO2 evitado suben la nota.
pub fn environmental_score(kwh: f64, co2_avoided: f64) -> u8 {
    let normalized_kwh = (1.0 - kwh / NORMALIZATION_BASE).clamp(0.0, 1.0);
    let normalized_co2 = (co2_avoided / NORMALIZATION_BASE).clamp(0.0, 1.0);

    ((normalized_kwh * KWH_WEIGHT + normalized_co2 * CO2_WEIGHT) * MAX_SCORE).round() as u8
}

/// Celdas vacías o no numéricas valen 0.
fn coerce_number(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Lee las facturas de un CSV con cabecera. Las columnas extra se ignoran.
pub fn parse_utility_csv<R: Read>(reader: R) -> Result<Vec<UtilityRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("No se pudo leer la cabecera del CSV")?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("Falta la columna '{name}' en el CSV"))
    };
    let date_idx = column(DATE_DUE)?;
    let kwh_idx = column(KWH_USED)?;
    let co2_idx = column(CO2_AVOIDED)?;
    let amount_idx = column(AMOUNT_DUE)?;

    let mut records = Vec::new();
    for (line, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("Fila {} del CSV no válida", line + 2))?;
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let cell = |idx: usize| row.get(idx).unwrap_or("");
        let kwh_used = coerce_number(cell(kwh_idx));
        let co2_avoided = coerce_number(cell(co2_idx));

        records.push(UtilityRecord {
            date_due: cell(date_idx).to_string(),
            kwh_used,
            co2_avoided,
            amount_due: coerce_number(cell(amount_idx)),
            e_score: environmental_score(kwh_used, co2_avoided),
        });
    }

    Ok(records)
}

pub fn load_utility_csv(path: &Path) -> Result<Vec<UtilityRecord>> {
    let file = File::open(path)
        .with_context(|| format!("No se pudo abrir el CSV {}", path.display()))?;
    let records = parse_utility_csv(file)
        .with_context(|| format!("CSV de suministros no válido: {}", path.display()))?;
    info!("Cargadas {} facturas desde {}", records.len(), path.display());
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub data: Vec<f64>,
}

/// Datos de la gráfica de tendencias: fechas y dos series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilityChart {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartSeries>,
}

/// Facturas cargadas durante la sesión. Cada CSV nuevo se añade al final.
#[derive(Debug, Default)]
pub struct UtilityLedger {
    records: Vec<UtilityRecord>,
}

impl UtilityLedger {
    pub fn append(&mut self, records: impl IntoIterator<Item = UtilityRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[UtilityRecord] {
        &self.records
    }

    /// Las primeras `limit` facturas (vista "ver más / ver menos").
    pub fn recent(&self, limit: usize) -> &[UtilityRecord] {
        &self.records[..limit.min(self.records.len())]
    }

    pub fn chart(&self) -> UtilityChart {
        UtilityChart {
            labels: self.records.iter().map(|r| r.date_due.clone()).collect(),
            datasets: vec![
                ChartSeries {
                    label: KWH_USED.to_string(),
                    data: self.records.iter().map(|r| r.kwh_used).collect(),
                },
                ChartSeries {
                    label: "CO2 Emissions Avoided".to_string(),
                    data: self.records.iter().map(|r| r.co2_avoided).collect(),
                },
            ],
        }
    }
}
