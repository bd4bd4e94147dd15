//! Ficheros JSON temporales entre el OCR y el filtrado (se escriben una vez y se leen una vez).

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::info;

/// Nombre por defecto de la respuesta OCR guardada.
pub const DEFAULT_OCR_FILE: &str = "rekognitionResult.json";

#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
}

impl ScratchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sólo se admiten nombres simples, sin directorios ni `..`.
    pub fn is_valid_name(file_name: &str) -> bool {
        let mut components = Path::new(file_name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !file_name.contains(&['/', '\\'][..])
    }

    fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        if !Self::is_valid_name(file_name) {
            return Err(anyhow!("Nombre de fichero no válido: '{file_name}'"));
        }
        Ok(self.dir.join(file_name))
    }

    /// Escribe el JSON con formato legible y devuelve la ruta.
    pub fn save(&self, file_name: &str, content: &Value) -> Result<PathBuf> {
        let path = self.resolve(file_name)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("No se pudo crear {}", self.dir.display()))?;
        let text = serde_json::to_string_pretty(content)?;
        fs::write(&path, text).with_context(|| format!("No se pudo escribir {}", path.display()))?;
        info!("JSON guardado en {}", path.display());
        Ok(path)
    }

    /// `Ok(None)` si el fichero no existe; error si no es JSON válido.
    pub fn load(&self, file_name: &str) -> Result<Option<Value>> {
        let path = self.resolve(file_name)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("No se pudo leer {}", path.display()))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("JSON no válido en {}", path.display()))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = ScratchStore::new(dir.path());
        let content = json!({ "TextDetections": [{ "DetectedText": "MILK" }] });

        let path = store.save(DEFAULT_OCR_FILE, &content).unwrap();
        assert_eq!(path, dir.path().join(DEFAULT_OCR_FILE));
        assert_eq!(store.load(DEFAULT_OCR_FILE).unwrap(), Some(content));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempdir().unwrap();
        let store = ScratchStore::new(dir.path());
        assert_eq!(store.load("nada.json").unwrap(), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("roto.json"), "{ no json").unwrap();
        let store = ScratchStore::new(dir.path());
        assert!(store.load("roto.json").is_err());
    }

    #[test]
    fn names_must_stay_inside_the_directory() {
        assert!(ScratchStore::is_valid_name("receipt.json"));
        assert!(!ScratchStore::is_valid_name(""));
        assert!(!ScratchStore::is_valid_name(".."));
        assert!(!ScratchStore::is_valid_name("../secret.json"));
        assert!(!ScratchStore::is_valid_name("/etc/passwd"));
        assert!(!ScratchStore::is_valid_name("a/b.json"));
        assert!(!ScratchStore::is_valid_name("a\\b.json"));

        let dir = tempdir().unwrap();
        let store = ScratchStore::new(dir.path());
        assert!(store.save("../fuera.json", &json!({})).is_err());
    }

    #[test]
    fn save_creates_the_directory() {
        let dir = tempdir().unwrap();
        let store = ScratchStore::new(dir.path().join("scratch"));
        store.save("x.json", &json!([1, 2])).unwrap();
        assert!(dir.path().join("scratch").join("x.json").exists());
    }
}
