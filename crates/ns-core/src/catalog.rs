//! Catalog of fetchable content
//!
//! The catalog is an ordered, fixed list of entries loaded once from a JSON
//! document and read-only afterwards:
//!
//! ```json
//! { "xkcd-list": [ { "ep": 614, "name": "Designated Drivers", "cid": "Qm..." } ] }
//! ```

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::types::ContentId;

/// Key holding the entry list in a catalog document
const CATALOG_LIST_KEY: &str = "xkcd-list";

/// A single fetchable entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Episode number
    #[serde(rename = "ep")]
    pub episode: u32,
    /// Display name
    pub name: String,
    /// Content identifier on the node
    #[serde(rename = "cid")]
    pub content_id: ContentId,
}

impl CatalogEntry {
    pub fn new(episode: u32, name: impl Into<String>, content_id: impl Into<ContentId>) -> Self {
        Self {
            episode,
            name: name.into(),
            content_id: content_id.into(),
        }
    }

    /// Display title, e.g. `614. Designated Drivers`
    pub fn title(&self) -> String {
        format!("{}. {}", self.episode, self.name)
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(rename = "xkcd-list")]
    entries: Vec<CatalogEntry>,
}

/// Immutable, cheaply cloneable list of catalog entries
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Arc<[CatalogEntry]>,
}

impl Catalog {
    /// Create a catalog from pre-parsed entries
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Parse a catalog document
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        tracing::debug!(
            "Parsed {} entries from '{}'",
            document.entries.len(),
            CATALOG_LIST_KEY
        );
        Ok(Self::new(document.entries))
    }

    /// Load a catalog document from a file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        tracing::info!("Loaded {} catalog entries from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// All entries in catalog order
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entry at a given position
    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    /// Pick one entry uniformly at random; `None` if the catalog is empty.
    ///
    /// No memory of earlier picks is kept, so repeats are possible.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&CatalogEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.entries.len());
        self.entries.get(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<CatalogEntry>> for Catalog {
    fn from(entries: Vec<CatalogEntry>) -> Self {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "xkcd-list": [
            { "ep": 614, "name": "Designated Drivers", "cid": "QmXYZ" },
            { "ep": 327, "name": "Exploits of a Mom", "cid": "QmABC" }
        ]
    }"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        let first = catalog.get(0).unwrap();
        assert_eq!(first.episode, 614);
        assert_eq!(first.content_id.as_str(), "QmXYZ");
        assert_eq!(first.title(), "614. Designated Drivers");
    }

    #[test]
    fn test_parse_catalog_missing_list() {
        let err = Catalog::from_json(r#"{"comics": []}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_parse_empty_catalog() {
        let catalog = Catalog::from_json(r#"{"xkcd-list": []}"#).unwrap();
        assert!(catalog.is_empty());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(catalog.choose(&mut rng).is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_choose_is_uniform() {
        let entries = (0..5)
            .map(|i| CatalogEntry::new(i, format!("entry {}", i), format!("Qm{}", i)))
            .collect();
        let catalog = Catalog::new(entries);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 5];

        let draws = 50_000;
        for _ in 0..draws {
            let entry = catalog.choose(&mut rng).unwrap();
            counts[entry.episode as usize] += 1;
        }

        let expected = draws as f64 / 5.0;
        for count in counts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "count {} deviates from {}", count, expected);
        }
    }
}
