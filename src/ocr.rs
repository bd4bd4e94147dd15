//! Detección de texto en imágenes de recibos mediante un servicio OCR externo.
//!
//! El servicio recibe la ubicación de la imagen (bucket + nombre) y responde
//! con el formato DetectText (`TextDetections`). Un fallo del OCR nunca llega
//! al extractor: se registra y se trata como lista vacía.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};
use url::Url;

use crate::models::TextFragment;
use crate::receipt;

/// Ubicación de una imagen en el almacenamiento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLocation {
    pub bucket: String,
    pub name: String,
}

#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect_text(&self, image: &ImageLocation) -> Result<Vec<TextFragment>>;
}

/// Cliente HTTP del servicio OCR.
#[derive(Debug, Clone)]
pub struct HttpTextDetector {
    client: Client,
    endpoint: Url,
}

impl HttpTextDetector {
    pub fn new(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("OCR_ENDPOINT no válido: {endpoint}"))?;
        Ok(Self { client, endpoint })
    }
}

fn detect_text_request(image: &ImageLocation) -> Value {
    json!({
        "Image": {
            "S3Object": {
                "Bucket": image.bucket,
                "Name": image.name,
            }
        }
    })
}

#[async_trait]
impl TextDetector for HttpTextDetector {
    async fn detect_text(&self, image: &ImageLocation) -> Result<Vec<TextFragment>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&detect_text_request(image))
            .send()
            .await
            .context("Fallo de red llamando al servicio OCR")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("El servicio OCR respondió {status}"));
        }

        let body: Value = response
            .json()
            .await
            .context("Respuesta del servicio OCR no es JSON")?;
        receipt::fragments_from_detect_text(body)
    }
}

/// Detector usado cuando no hay `OCR_ENDPOINT` configurado.
#[derive(Debug, Clone, Default)]
pub struct DisabledTextDetector;

#[async_trait]
impl TextDetector for DisabledTextDetector {
    async fn detect_text(&self, _image: &ImageLocation) -> Result<Vec<TextFragment>> {
        Err(anyhow!("No hay servicio OCR configurado (OCR_ENDPOINT)"))
    }
}

/// Ejecuta el OCR y degrada cualquier error a una lista vacía.
pub async fn detect_text_or_empty(
    detector: &dyn TextDetector,
    image: &ImageLocation,
) -> Vec<TextFragment> {
    match detector.detect_text(image).await {
        Ok(fragments) => {
            info!(
                "OCR de {}/{}: {} fragmentos",
                image.bucket,
                image.name,
                fragments.len()
            );
            fragments
        }
        Err(err) => {
            error!(
                "Error detectando texto en {}/{}: {:#}",
                image.bucket, image.name, err
            );
            Vec::new()
        }
    }
}
