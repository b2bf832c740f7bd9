//! Keyword-table domain classifier

use crate::domain::classifier::DomainClassifier;
use crate::domain::document::DocumentDomain;

/// Classifier scoring a static keyword table against the text.
///
/// Each label's score is the number of case-insensitive occurrences of its
/// keywords in the text. The highest score wins; ties break by table
/// declaration order; zero hits everywhere yields `Unknown`.
///
/// This is deliberately coarse - a scoring function over a fixed table, not
/// a learned model. The table is configuration, so a deployment can replace
/// the label vocabulary without code changes.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    /// (label, lowercased keywords), in tie-break priority order
    table: Vec<(DocumentDomain, Vec<String>)>,
}

impl KeywordClassifier {
    /// Create a classifier from a keyword table. Keywords are lowercased
    /// once here; matching at classification time is substring-based.
    pub fn new(table: Vec<(DocumentDomain, Vec<String>)>) -> Self {
        let table = table
            .into_iter()
            .map(|(label, keywords)| {
                (
                    label,
                    keywords
                        .into_iter()
                        .map(|keyword| keyword.to_lowercase())
                        .collect(),
                )
            })
            .collect();

        Self { table }
    }

    /// The keyword table used for French administrative documents
    pub fn french_administrative() -> Self {
        Self::new(vec![
            (
                DocumentDomain::Juridique,
                vec![
                    "droit".into(),
                    "loi".into(),
                    "code".into(),
                    "juridique".into(),
                    "tribunal".into(),
                    "justice".into(),
                    "contrat".into(),
                    "responsabilité".into(),
                ],
            ),
            (
                DocumentDomain::Rh,
                vec![
                    "salarié".into(),
                    "emploi".into(),
                    "recrutement".into(),
                    "formation".into(),
                    "ressources humaines".into(),
                    "travail".into(),
                ],
            ),
            (
                DocumentDomain::Economique,
                vec![
                    "économie".into(),
                    "finance".into(),
                    "aide".into(),
                    "subvention".into(),
                    "crédit".into(),
                    "impôt".into(),
                    "fiscal".into(),
                ],
            ),
        ])
    }

    fn score(&self, text_lower: &str, keywords: &[String]) -> usize {
        keywords
            .iter()
            .map(|keyword| count_occurrences(text_lower, keyword))
            .sum()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::french_administrative()
    }
}

impl DomainClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> DocumentDomain {
        if text.trim().is_empty() {
            return DocumentDomain::Unknown;
        }

        let text_lower = text.to_lowercase();

        let mut best: Option<(DocumentDomain, usize)> = None;
        for (label, keywords) in &self.table {
            let score = self.score(&text_lower, keywords);
            // strictly-greater keeps the earlier (higher-priority) label on ties
            if score > 0 && best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((*label, score));
            }
        }

        best.map_or(DocumentDomain::Unknown, |(label, _)| label)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Count non-overlapping occurrences of `needle` in `haystack`
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut position = 0;
    while let Some(found) = haystack[position..].find(needle) {
        count += 1;
        position += found + needle.len();
    }
    count
}
