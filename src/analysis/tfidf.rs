use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::stopwords::is_stop_word;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorizerConfig {
    pub max_features: usize,
    /// Minimum number of documents a term must occur in.
    pub min_df: usize,
    /// Longest n-gram, in tokens.
    pub ngram_max: usize,
}

impl VectorizerConfig {
    pub const PRIMARY: Self = Self {
        max_features: 100,
        min_df: 2,
        ngram_max: 2,
    };

    pub const RELAXED: Self = Self {
        max_features: 50,
        min_df: 1,
        ngram_max: 1,
    };
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VectorizeError {
    #[error("empty vocabulary; documents only contain stop words")]
    EmptyVocabulary,

    #[error("no terms remain after pruning with min_df={0}")]
    NoTermsAfterPruning(usize),
}

/// Document-term matrix with one L2-normalised row per input document.
/// Columns follow `terms`, which is sorted alphabetically.
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    pub terms: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

pub fn vectorize(
    documents: &[String],
    config: VectorizerConfig,
) -> Result<TfidfMatrix, VectorizeError> {
    let counts: Vec<HashMap<String, usize>> = documents
        .iter()
        .map(|doc| count_terms(doc, config.ngram_max))
        .collect();

    let terms = select_terms(&counts, config)?;
    let columns: HashMap<&str, usize> = terms
        .iter()
        .enumerate()
        .map(|(i, term)| (term.as_str(), i))
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let n_docs = documents.len() as f64;
    let idf: Vec<f64> = terms
        .iter()
        .map(|term| {
            let df = counts.iter().filter(|c| c.contains_key(term)).count();
            #[allow(clippy::cast_precision_loss)]
            let df = df as f64;
            ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
        })
        .collect();

    let rows = counts
        .iter()
        .map(|doc_counts| {
            let mut row = vec![0.0; terms.len()];
            for (term, &count) in doc_counts {
                if let Some(&col) = columns.get(term.as_str()) {
                    #[allow(clippy::cast_precision_loss)]
                    let tf = count as f64;
                    row[col] = tf * idf[col];
                }
            }
            normalize(&mut row);
            row
        })
        .collect();

    Ok(TfidfMatrix { terms, rows })
}

fn tokenize(document: &str) -> Vec<String> {
    let lowered = document.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

fn count_terms(document: &str, ngram_max: usize) -> HashMap<String, usize> {
    let tokens = tokenize(document);
    let mut counts = HashMap::new();

    for n in 1..=ngram_max.max(1) {
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }

    counts
}

/// Vocabulary after document-frequency pruning and the feature cap.
/// When capped, the most frequent terms over the corpus win and ties go
/// to the alphabetically first term.
fn select_terms(
    counts: &[HashMap<String, usize>],
    config: VectorizerConfig,
) -> Result<Vec<String>, VectorizeError> {
    // term -> (document frequency, corpus frequency)
    let mut stats: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for doc_counts in counts {
        for (term, &count) in doc_counts {
            let entry = stats.entry(term.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += count;
        }
    }

    if stats.is_empty() {
        return Err(VectorizeError::EmptyVocabulary);
    }

    let mut kept: Vec<(&str, usize)> = stats
        .into_iter()
        .filter(|(_, (df, _))| *df >= config.min_df)
        .map(|(term, (_, total))| (term, total))
        .collect();

    if kept.is_empty() {
        return Err(VectorizeError::NoTermsAfterPruning(config.min_df));
    }

    if kept.len() > config.max_features {
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        kept.truncate(config.max_features);
    }

    let mut terms: Vec<String> = kept.into_iter().map(|(term, _)| term.to_string()).collect();
    terms.sort();
    Ok(terms)
}

fn normalize(row: &mut [f64]) {
    let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        row.iter_mut().for_each(|v| *v /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|d| (*d).to_string()).collect()
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_stop_words() {
        let tokens = tokenize("The Database TIMEOUT on a login page");

        assert_eq!(tokens, vec!["database", "timeout", "login", "page"]);
    }

    #[test]
    fn test_tokenize_ignores_single_characters() {
        assert_eq!(tokenize("x y zz 1 42"), vec!["zz", "42"]);
    }

    #[test]
    fn test_bigrams_skip_stop_words() {
        let counts = count_terms("database is timing out", 2);

        assert_eq!(counts.get("database timing"), Some(&1));
        assert_eq!(counts.get("database"), Some(&1));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_primary_config_requires_two_documents() {
        let matrix = vectorize(
            &docs(&["database timeout", "database crash", "button color"]),
            VectorizerConfig::PRIMARY,
        )
        .unwrap();

        assert_eq!(matrix.terms, vec!["database"]);
        assert_eq!(matrix.rows.len(), 3);
        assert_eq!(matrix.rows[2], vec![0.0]);
    }

    #[test]
    fn test_primary_config_fails_without_shared_terms() {
        let result = vectorize(
            &docs(&["database timeout", "button color", "login crash"]),
            VectorizerConfig::PRIMARY,
        );

        assert_eq!(result.unwrap_err(), VectorizeError::NoTermsAfterPruning(2));
    }

    #[test]
    fn test_relaxed_config_keeps_unique_terms() {
        let matrix = vectorize(
            &docs(&["database timeout", "button color", "login crash"]),
            VectorizerConfig::RELAXED,
        )
        .unwrap();

        assert_eq!(
            matrix.terms,
            vec!["button", "color", "crash", "database", "login", "timeout"]
        );
    }

    #[test]
    fn test_stop_words_only_is_empty_vocabulary() {
        let result = vectorize(&docs(&["the and of", "", "a"]), VectorizerConfig::RELAXED);

        assert_eq!(result.unwrap_err(), VectorizeError::EmptyVocabulary);
    }

    #[test]
    fn test_feature_cap_keeps_most_frequent_terms() {
        let config = VectorizerConfig {
            max_features: 2,
            min_df: 1,
            ngram_max: 1,
        };
        let matrix = vectorize(
            &docs(&["crash crash crash zebra", "alpha beta crash", "beta"]),
            config,
        )
        .unwrap();

        assert_eq!(matrix.terms, vec!["beta", "crash"]);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let matrix = vectorize(
            &docs(&["database timeout error", "database crash error"]),
            VectorizerConfig::RELAXED,
        )
        .unwrap();

        for row in &matrix.rows {
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let matrix = vectorize(
            &docs(&["database timeout", "database crash"]),
            VectorizerConfig::RELAXED,
        )
        .unwrap();
        let col = |term: &str| matrix.terms.iter().position(|t| t == term).unwrap();

        assert!(matrix.rows[0][col("timeout")] > matrix.rows[0][col("database")]);
    }
}
