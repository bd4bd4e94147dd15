//! Agregación ESG: una consulta al catálogo por producto y media de las notas.
//!
//! Las consultas se lanzan en paralelo (con un límite) pero el resultado
//! conserva el orden de los nombres de entrada.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogProduct, ProductCatalog};
use crate::models::{EsgGrade, EsgLookupResult};

/// Resultado de evaluar un lote de productos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsgReport {
    pub results: Vec<EsgLookupResult>,
    /// `None` cuando ningún producto tiene nota conocida.
    pub average: Option<EsgGrade>,
}

/// Consulta cada producto y calcula la nota media.
pub async fn assess_products(
    catalog: &dyn ProductCatalog,
    names: &[String],
    concurrency: usize,
) -> EsgReport {
    let results = lookup_products(catalog, names, concurrency).await;
    let average = average_grade(results.iter().map(|r| r.grade));

    info!(
        "Evaluados {} productos, nota media: {}",
        results.len(),
        average.map_or_else(|| "sin nota".to_string(), |g| g.to_string())
    );

    EsgReport { results, average }
}

/// Una consulta por nombre, sin caché ni deduplicación. Un fallo sólo afecta a su producto.
pub async fn lookup_products(
    catalog: &dyn ProductCatalog,
    names: &[String],
    concurrency: usize,
) -> Vec<EsgLookupResult> {
    stream::iter(names.iter().cloned())
        .map(|name| lookup_one(catalog, name))
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
}

async fn lookup_one(catalog: &dyn ProductCatalog, name: String) -> EsgLookupResult {
    match catalog.search(&name).await {
        Ok(Some(product)) => result_from_product(name, product),
        Ok(None) => EsgLookupResult::without_match(name, EsgGrade::Unknown),
        Err(err) => {
            warn!("Error consultando la nota ESG de '{}': {:#}", name, err);
            EsgLookupResult::without_match(name, EsgGrade::Error)
        }
    }
}

fn result_from_product(name: String, product: CatalogProduct) -> EsgLookupResult {
    debug!(
        "'{}' coincide con '{}'",
        name,
        product.product_name.as_deref().unwrap_or("?")
    );
    let grade = product
        .ecoscore_grade
        .as_deref()
        .map_or(EsgGrade::Unknown, EsgGrade::from_catalog);

    EsgLookupResult {
        name,
        grade,
        raw_grade: product.ecoscore_grade,
        impact: product
            .ecoscore_data
            .unwrap_or_else(|| Value::Object(Default::default())),
    }
}

/// Media de las notas `A`..`D` redondeada hacia arriba en el .5.
/// `Unknown` y `Error` no cuentan; si no queda ninguna nota, `None`.
pub fn average_grade<I>(grades: I) -> Option<EsgGrade>
where
    I: IntoIterator<Item = EsgGrade>,
{
    let ordinals: Vec<u8> = grades.into_iter().filter_map(EsgGrade::ordinal).collect();
    if ordinals.is_empty() {
        return None;
    }

    let sum: u32 = ordinals.iter().map(|&o| u32::from(o)).sum();
    let mean = f64::from(sum) / ordinals.len() as f64;
    let rounded = (mean + 0.5).floor() as u8;
    EsgGrade::from_ordinal(rounded.clamp(1, 4))
}
