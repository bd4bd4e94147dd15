//! Extracción de nombres de producto a partir de los fragmentos OCR de un recibo.
//!
//! Los fragmentos llegan en orden de lectura. Se recorren una sola vez con
//! un indicador de parada: a partir de la línea "SUBTOTAL" no se emite nada.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::models::TextFragment;

/// Marcas de la caja registradora que aparecen solas en una línea.
const IGNORED_TOKENS: [&str; 4] = ["1", "F", "T", "FW"];

// Dígitos y límites de palabra sólo ASCII: "MILK ٣" se conserva y "CAFÉ5" no.
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)[0-9]+(\.[0-9]+)?(?-u:\b)").expect("regex de números válida")
});
static FW_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bFW\b").expect("regex FW válida"));

/// Respuesta DetectText: el objeto completo o sólo la lista de detecciones.
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectTextPayload {
    Detections(Vec<TextFragment>),
    Response {
        #[serde(rename = "TextDetections", default)]
        text_detections: Vec<TextFragment>,
    },
}

/// Convierte una respuesta del OCR en fragmentos. Sin `TextDetections` → lista vacía.
pub fn fragments_from_detect_text(value: Value) -> Result<Vec<TextFragment>> {
    let payload: DetectTextPayload =
        serde_json::from_value(value).context("Respuesta OCR con formato inesperado")?;
    Ok(match payload {
        DetectTextPayload::Detections(list) => list,
        DetectTextPayload::Response { text_detections } => text_detections,
    })
}

/// Devuelve los nombres de producto probables, en el orden original y sin deduplicar.
pub fn extract_product_names(fragments: &[TextFragment]) -> Vec<String> {
    let (_, names) = fragments.iter().fold(
        (false, Vec::new()),
        |(stopped, mut names), fragment| {
            let text = fragment.text.trim();
            if text.is_empty() {
                return (stopped, names);
            }

            let stopped = stopped || text.to_uppercase().contains("SUBTOTAL");
            if !stopped {
                if let Some(name) = clean_line(text) {
                    names.push(name);
                }
            }
            (stopped, names)
        },
    );
    names
}

fn clean_line(text: &str) -> Option<String> {
    if IGNORED_TOKENS.contains(&text) || NUMBER.is_match(text) {
        return None;
    }

    let cleaned = FW_WORD.replace(text, "");
    let cleaned = cleaned.trim();

    let has_letter = cleaned.chars().any(|c| c.is_ascii_uppercase());
    if has_letter && cleaned == cleaned.to_uppercase() && !cleaned.starts_with("TOTAL") {
        Some(cleaned.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragments(lines: &[&str]) -> Vec<TextFragment> {
        lines.iter().map(|l| TextFragment::new(*l)).collect()
    }

    #[test]
    fn stops_at_subtotal_and_drops_prices() {
        let input = fragments(&["MILK", "2.50", "BREAD", "SUBTOTAL", "5.00", "TAX"]);
        assert_eq!(extract_product_names(&input), vec!["MILK", "BREAD"]);
    }

    #[test]
    fn number_filter_is_ascii_only() {
        let input = fragments(&["CAFÉ5", "MILK ٣", "2PK EGGS", "FW MILK FW"]);
        assert_eq!(extract_product_names(&input), vec!["MILK ٣", "2PK EGGS", "MILK FW"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(extract_product_names(&[]).is_empty());
    }

    #[test]
    fn subtotal_stop_is_case_insensitive_and_permanent() {
        let input = fragments(&["EGGS", "Subtotal", "CHEESE", "", "APPLES"]);
        assert_eq!(extract_product_names(&input), vec!["EGGS"]);

        let input = fragments(&["EGGS", "SUBTOTALS DUE", "CHEESE"]);
        assert_eq!(extract_product_names(&input), vec!["EGGS"]);
    }

    #[test]
    fn register_marks_are_never_emitted() {
        let input = fragments(&["1", "F", " T ", "FW", "RICE"]);
        assert_eq!(extract_product_names(&input), vec!["RICE"]);
    }

    #[test]
    fn lines_with_standalone_numbers_are_skipped() {
        let input = fragments(&["GV MILK 2", "3 PACK SODA", "12.99", "BANANAS"]);
        assert_eq!(extract_product_names(&input), vec!["BANANAS"]);
    }

    #[test]
    fn digits_glued_to_letters_are_not_standalone_numbers() {
        let input = fragments(&["2PK TOWELS"]);
        assert_eq!(extract_product_names(&input), vec!["2PK TOWELS"]);
    }

    #[test]
    fn fw_word_is_removed_but_not_inside_words() {
        let input = fragments(&["FW ORANGE JUICE", "FWD CHIPS"]);
        assert_eq!(
            extract_product_names(&input),
            vec!["ORANGE JUICE", "FWD CHIPS"]
        );
    }

    #[test]
    fn lowercase_and_total_lines_are_rejected() {
        let input = fragments(&["Thank you", "TOTAL DUE", "TOTALS", "***", "YOGURT"]);
        assert_eq!(extract_product_names(&input), vec!["YOGURT"]);
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let input = fragments(&["APPLE", "PEAR", "APPLE"]);
        assert_eq!(extract_product_names(&input), vec!["APPLE", "PEAR", "APPLE"]);
    }

    #[test]
    fn output_is_uppercase_with_a_letter() {
        let input = fragments(&["MILK", "--", "Bread", "É", "CAFÉ", "SUBTOTAL", "NOPE"]);
        let names = extract_product_names(&input);
        assert_eq!(names, vec!["MILK", "CAFÉ"]);
        for name in names {
            assert_eq!(name, name.to_uppercase());
            assert!(name.chars().any(|c| c.is_ascii_uppercase()));
            assert!(!name.starts_with("TOTAL"));
        }
    }

    #[test]
    fn parses_full_detect_text_response() {
        let value = json!({
            "TextDetections": [
                { "DetectedText": "MILK", "Confidence": 98.5, "Type": "LINE", "Id": 0 },
                { "DetectedText": "2.50", "Confidence": 97.0, "Type": "LINE", "Id": 1 }
            ],
            "TextModelVersion": "3.0"
        });
        let list = fragments_from_detect_text(value).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text, "MILK");
        assert_eq!(list[0].confidence, Some(98.5));
    }

    #[test]
    fn missing_detections_key_is_empty() {
        assert!(fragments_from_detect_text(json!({})).unwrap().is_empty());
    }

    #[test]
    fn bare_detection_list_is_accepted() {
        let list = fragments_from_detect_text(json!([{ "DetectedText": "TEA" }])).unwrap();
        assert_eq!(list, vec![TextFragment::new("TEA")]);
    }

    #[test]
    fn malformed_response_is_an_error() {
        assert!(fragments_from_detect_text(json!("texto")).is_err());
    }
}
