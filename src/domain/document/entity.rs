//! Document and chunk entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Topical domain assigned to a document at ingestion time.
///
/// The label set is closed. Declaration order doubles as the classification
/// tie-break priority: `juridique > rh > economique`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentDomain {
    /// Legal content (laws, decrees, contracts, liability)
    Juridique,
    /// Human resources content (employment, training, labor)
    Rh,
    /// Economic content (finance, subsidies, taxation)
    Economique,
    /// No keyword matched, or the text was empty
    Unknown,
}

impl DocumentDomain {
    /// All classifiable labels, in tie-break priority order. `Unknown` is the
    /// fallback and never competes.
    pub const CLASSIFIABLE: [DocumentDomain; 3] = [
        DocumentDomain::Juridique,
        DocumentDomain::Rh,
        DocumentDomain::Economique,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Juridique => "juridique",
            Self::Rh => "rh",
            Self::Economique => "economique",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DocumentDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "juridique" => Ok(Self::Juridique),
            "rh" => Ok(Self::Rh),
            "economique" => Ok(Self::Economique),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown document domain '{}'", other)),
        }
    }
}

/// A document as delivered by the external fetcher collaborator.
///
/// The fetcher supplies `(title, source_url, raw_text)` triples; fetch
/// failures simply never reach the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub title: String,
    pub source_url: String,
    pub raw_text: String,
}

impl FetchedDocument {
    pub fn new(
        title: impl Into<String>,
        source_url: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// A document ready to be upserted into the vector store.
///
/// Identity for idempotent re-ingestion is `source_url`: upserting the same
/// URL replaces the stored document instead of duplicating it.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub source_url: String,
    pub content: String,
    pub domain: DocumentDomain,
}

impl NewDocument {
    pub fn new(
        title: impl Into<String>,
        source_url: impl Into<String>,
        content: impl Into<String>,
        domain: DocumentDomain,
    ) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            content: content.into(),
            domain,
        }
    }
}

/// A document row as persisted by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub title: String,
    pub source_url: String,
    pub content: String,
    pub domain: DocumentDomain,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chunk row as persisted by the vector store.
///
/// Chunks are owned by exactly one document; deleting the document cascades
/// to its chunks. `chunk_index` values for one document form the contiguous
/// range `[0, N)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: i64,
    pub document_id: i64,
    pub chunk_text: String,
    pub chunk_index: i64,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_round_trip() {
        for domain in [
            DocumentDomain::Juridique,
            DocumentDomain::Rh,
            DocumentDomain::Economique,
            DocumentDomain::Unknown,
        ] {
            let parsed: DocumentDomain = domain.as_str().parse().unwrap();
            assert_eq!(parsed, domain);
        }
    }

    #[test]
    fn test_domain_parse_invalid() {
        assert!("autre".parse::<DocumentDomain>().is_err());
        assert!("".parse::<DocumentDomain>().is_err());
    }

    #[test]
    fn test_classifiable_priority_order() {
        assert_eq!(
            DocumentDomain::CLASSIFIABLE,
            [
                DocumentDomain::Juridique,
                DocumentDomain::Rh,
                DocumentDomain::Economique
            ]
        );
    }

    #[test]
    fn test_domain_serde_snake_case() {
        let json = serde_json::to_string(&DocumentDomain::Economique).unwrap();
        assert_eq!(json, "\"economique\"");

        let parsed: DocumentDomain = serde_json::from_str("\"rh\"").unwrap();
        assert_eq!(parsed, DocumentDomain::Rh);
    }

    #[test]
    fn test_fetched_document() {
        let doc = FetchedDocument::new(
            "Contrat de travail",
            "https://example.fr/fiche/F1234",
            "Le contrat de travail est...",
        );

        assert_eq!(doc.title, "Contrat de travail");
        assert_eq!(doc.source_url, "https://example.fr/fiche/F1234");
    }
}
