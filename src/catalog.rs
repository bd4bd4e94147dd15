//! Catálogo de productos (Open Food Facts) para obtener la nota ecológica.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Primer producto devuelto por una búsqueda en el catálogo.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogProduct {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub ecoscore_grade: Option<String>,
    #[serde(default)]
    pub ecoscore_data: Option<Value>,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Búsqueda difusa por nombre; devuelve la mejor coincidencia, si existe.
    async fn search(&self, name: &str) -> Result<Option<CatalogProduct>>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<CatalogProduct>,
}

/// Cliente de la API pública de Open Food Facts.
#[derive(Debug, Clone)]
pub struct OpenFoodFactsCatalog {
    client: Client,
    base_url: Url,
}

impl OpenFoodFactsCatalog {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .with_context(|| format!("URL del catálogo no válida: {base_url}"))?;
        Ok(Self { client, base_url })
    }

    fn search_url(&self, name: &str) -> Result<Url> {
        let mut url = self.base_url.join("cgi/search.pl")?;
        url.query_pairs_mut()
            .append_pair("search_terms", name)
            .append_pair("search_simple", "1")
            .append_pair("action", "process")
            .append_pair("json", "1");
        Ok(url)
    }
}

#[async_trait]
impl ProductCatalog for OpenFoodFactsCatalog {
    async fn search(&self, name: &str) -> Result<Option<CatalogProduct>> {
        let url = self.search_url(name)?;
        debug!("Consultando catálogo: {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Fallo de red consultando '{name}'"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("El catálogo respondió {status} para '{name}'"));
        }

        let body: SearchResponse = response
            .json()
            .await
            .with_context(|| format!("Respuesta del catálogo no válida para '{name}'"))?;

        Ok(body.products.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::{
        extract::Query,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    async fn fake_search(Query(params): Query<HashMap<String, String>>) -> Response {
        if params.get("json").map(String::as_str) != Some("1") {
            return StatusCode::BAD_REQUEST.into_response();
        }
        match params.get("search_terms").map(String::as_str) {
            Some("DOWN") => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            Some("EMPTY") => Json(json!({ "count": 0, "products": [] })).into_response(),
            Some(term) => Json(json!({
                "count": 2,
                "products": [
                    {
                        "product_name": term.to_lowercase(),
                        "ecoscore_grade": "b",
                        "ecoscore_data": { "score": 62 }
                    },
                    { "product_name": "otro", "ecoscore_grade": "e" }
                ]
            }))
            .into_response(),
            None => StatusCode::BAD_REQUEST.into_response(),
        }
    }

    /// Catálogo local en un puerto libre; devuelve su URL base.
    async fn spawn_fake_catalog() -> String {
        let app = Router::new().route("/off/cgi/search.pl", get(fake_search));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/off")
    }

    async fn local_catalog() -> OpenFoodFactsCatalog {
        let client = Client::builder().no_proxy().build().unwrap();
        OpenFoodFactsCatalog::new(client, &spawn_fake_catalog().await).unwrap()
    }

    #[tokio::test]
    async fn search_takes_the_first_product() {
        let catalog = local_catalog().await;
        let product = catalog.search("GV MILK").await.unwrap().unwrap();

        assert_eq!(product.product_name.as_deref(), Some("gv milk"));
        assert_eq!(product.ecoscore_grade.as_deref(), Some("b"));
        assert_eq!(product.ecoscore_data, Some(json!({ "score": 62 })));
    }

    #[tokio::test]
    async fn search_without_products_is_none() {
        let catalog = local_catalog().await;
        assert!(catalog.search("EMPTY").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let catalog = local_catalog().await;
        let err = catalog.search("DOWN").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn search_url_encodes_product_name() {
        let catalog =
            OpenFoodFactsCatalog::new(Client::new(), "https://world.openfoodfacts.org").unwrap();
        let url = catalog.search_url("GV MILK & EGGS").unwrap();

        assert_eq!(url.path(), "/cgi/search.pl");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("search_terms".to_string(), "GV MILK & EGGS".to_string()),
                ("search_simple".to_string(), "1".to_string()),
                ("action".to_string(), "process".to_string()),
                ("json".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_with_path_keeps_its_prefix() {
        let catalog = OpenFoodFactsCatalog::new(Client::new(), "http://localhost:9000/off").unwrap();
        let url = catalog.search_url("TEA").unwrap();
        assert_eq!(url.path(), "/off/cgi/search.pl");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(OpenFoodFactsCatalog::new(Client::new(), "no es una url").is_err());
    }

    #[test]
    fn search_response_takes_missing_fields_as_none() {
        let body: SearchResponse = serde_json::from_value(serde_json::json!({
            "count": 2,
            "products": [
                { "product_name": "Milk", "ecoscore_grade": "b" },
                { "product_name": "Other" }
            ]
        }))
        .unwrap();
        let first = body.products.into_iter().next().unwrap();
        assert_eq!(first.ecoscore_grade.as_deref(), Some("b"));
        assert!(first.ecoscore_data.is_none());

        let empty: SearchResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.products.is_empty());
    }
}
