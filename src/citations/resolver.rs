//! Fuzzy citation resolver
//!
//! Scans generated text for `**…**` document mentions, matches each
//! distinct mention against the corpus index with a similarity ratio, and
//! rewrites the text with numbered inline citations plus a trailing
//! reference block. Pure with respect to caller-visible state: same text
//! and same corpus snapshot always produce byte-identical output.

use crate::citations::corpus::CorpusIndex;
use crate::errors::Result;
use similar::TextDiff;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{debug, warn};

/// Default minimum similarity (percent) for a mention to resolve
pub const DEFAULT_THRESHOLD: u8 = 70;

/// Default base path the bibliography links documents under
pub const DEFAULT_DOCS_BASE: &str = "/static/docs";

/// A mention successfully matched to a corpus file
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedCitation {
    index: usize,
    mention: String,
    matched_filename: String,
}

/// One `**…**` occurrence located in the source text
#[derive(Debug, Clone)]
struct MentionSpan {
    /// Full span including both delimiters
    span: Range<usize>,
    /// Span of the text between the delimiters
    inner: Range<usize>,
}

/// Rewrites document mentions into numbered citations
#[derive(Debug, Clone)]
pub struct CitationResolver {
    corpus: CorpusIndex,
    threshold: u8,
    docs_base: String,
}

impl CitationResolver {
    /// Create a resolver over a corpus index with the default threshold
    pub fn new(corpus: CorpusIndex) -> Self {
        Self::with_threshold(corpus, DEFAULT_THRESHOLD)
    }

    /// Create a resolver with a custom similarity threshold (percent)
    pub fn with_threshold(corpus: CorpusIndex, threshold: u8) -> Self {
        Self {
            corpus,
            threshold,
            docs_base: DEFAULT_DOCS_BASE.to_string(),
        }
    }

    /// Override the base path used in bibliography links
    pub fn with_docs_base(mut self, docs_base: impl Into<String>) -> Self {
        self.docs_base = docs_base.into();
        self
    }

    /// Resolve document mentions in `text`
    ///
    /// Each distinct mention whose best corpus match scores at or above the
    /// threshold receives the next citation index (starting at 1, in order
    /// of first appearance); every occurrence of it gains an inline marker
    /// after the closing delimiter. Unresolved mentions are left unchanged.
    /// A reference block listing the resolved files is appended when at
    /// least one mention resolved. Text without mentions is returned as-is.
    pub fn resolve_references(&self, text: &str) -> String {
        let mentions = find_mentions(text);
        if mentions.is_empty() {
            return text.to_string();
        }

        // Assign indices to distinct mentions in order of first appearance.
        let mut assignments: HashMap<&str, usize> = HashMap::new();
        let mut resolved: Vec<ResolvedCitation> = Vec::new();

        for mention in &mentions {
            let raw = &text[mention.inner.clone()];
            if assignments.contains_key(raw) {
                continue;
            }
            match self.find_closest_filename(raw) {
                Some(filename) => {
                    let index = resolved.len() + 1;
                    assignments.insert(raw, index);
                    resolved.push(ResolvedCitation {
                        index,
                        mention: raw.to_string(),
                        matched_filename: filename,
                    });
                }
                None => {
                    // Leave unresolved; later duplicates re-enter here but
                    // find_closest_filename is deterministic, so they fail
                    // identically.
                }
            }
        }

        // Rewrite keyed by span, never by repeated substring search, so a
        // mention contained inside another mention cannot be mangled.
        let mut output = String::with_capacity(text.len() + 64 * resolved.len());
        let mut copied_to = 0;
        for mention in &mentions {
            let raw = &text[mention.inner.clone()];
            output.push_str(&text[copied_to..mention.span.end]);
            copied_to = mention.span.end;
            if let Some(index) = assignments.get(raw) {
                output.push_str(&format!(
                    " <span class=\"doc-citation-number\">[{}]</span>",
                    index
                ));
            }
        }
        output.push_str(&text[copied_to..]);

        if !resolved.is_empty() {
            output.push_str("\n\n<b>Referencias:</b>\n");
            for citation in &resolved {
                debug!(
                    index = citation.index,
                    mention = %citation.mention,
                    file = %citation.matched_filename,
                    "bibliography entry"
                );
                let link = format!(
                    "{}/{}",
                    self.docs_base,
                    urlencoding::encode(&citation.matched_filename)
                );
                output.push_str(&format!(
                    "<li>[{}] <a href=\"{}\" target=\"_blank\">{}</a></li>",
                    citation.index, link, citation.matched_filename
                ));
            }
        }

        output
    }

    /// Best corpus filename for a mention, or None below the threshold
    ///
    /// Ties are broken by corpus enumeration order (first wins).
    fn find_closest_filename(&self, mention: &str) -> Option<String> {
        let normalized = normalize_mention(mention);

        let mut best: Option<(&String, f32)> = None;
        for filename in self.corpus.files() {
            let score = TextDiff::from_chars(normalized.as_str(), filename.as_str()).ratio() * 100.0;
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((filename, score));
            }
        }

        match best {
            Some((filename, score)) if score >= self.threshold as f32 => {
                debug!(mention, matched = %filename, score, "mention resolved");
                Some(filename.clone())
            }
            Some((filename, score)) => {
                warn!(
                    mention,
                    closest = %filename,
                    score,
                    threshold = self.threshold,
                    "no corpus file close enough for mention"
                );
                None
            }
            None => None,
        }
    }

    /// Corpus backing this resolver
    pub fn corpus(&self) -> &CorpusIndex {
        &self.corpus
    }

    /// Re-enumerate the backing corpus directory
    pub fn reload_corpus(&mut self) -> Result<usize> {
        self.corpus.reload()
    }

    /// Configured similarity threshold (percent)
    pub fn threshold(&self) -> u8 {
        self.threshold
    }
}

/// Undo common URL-style escaping the generator copies out of source docs
fn normalize_mention(mention: &str) -> String {
    mention
        .replace('+', " ")
        .replace("%20", " ")
        .replace("%28", "(")
        .replace("%29", ")")
}

/// Locate every `**…**` mention in one left-to-right pass
///
/// Inner text must be non-empty and free of `*` (non-greedy, no nesting).
/// Spans are non-overlapping; scanning resumes after each match.
fn find_mentions(text: &str) -> Vec<MentionSpan> {
    let bytes = text.as_bytes();
    let mut mentions = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'*' || bytes[i + 1] != b'*' {
            i += 1;
            continue;
        }

        let inner_start = i + 2;
        let mut j = inner_start;
        while j < bytes.len() && bytes[j] != b'*' {
            j += 1;
        }

        if j > inner_start && j + 1 < bytes.len() && bytes[j] == b'*' && bytes[j + 1] == b'*' {
            mentions.push(MentionSpan {
                span: i..j + 2,
                inner: inner_start..j,
            });
            i = j + 2;
        } else {
            i += 1;
        }
    }

    mentions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn corpus_with(files: &[&str]) -> (TempDir, CorpusIndex) {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            File::create(dir.path().join(name)).unwrap();
        }
        let index = CorpusIndex::load(dir.path()).unwrap();
        (dir, index)
    }

    #[test]
    fn test_no_mentions_returns_input_unchanged() {
        let (_dir, index) = corpus_with(&["Guia.pdf"]);
        let resolver = CitationResolver::new(index);

        let text = "Una respuesta sin menciones de documentos.";
        assert_eq!(resolver.resolve_references(text), text);
    }

    #[test]
    fn test_exact_mention_resolves_with_link() {
        let (_dir, index) = corpus_with(&["Protocolo de Sepsis.pdf"]);
        let resolver = CitationResolver::new(index);

        let out = resolver.resolve_references("Ver **Protocolo de Sepsis.pdf** para dosis.");

        assert!(out.contains(
            "**Protocolo de Sepsis.pdf** <span class=\"doc-citation-number\">[1]</span>"
        ));
        assert!(out.contains("<b>Referencias:</b>"));
        assert!(out.contains("href=\"/static/docs/Protocolo%20de%20Sepsis.pdf\""));
    }

    #[test]
    fn test_duplicate_mention_shares_index_and_single_entry() {
        let (_dir, index) = corpus_with(&["DocA.pdf"]);
        let resolver = CitationResolver::new(index);

        let out = resolver.resolve_references("See **DocA.pdf** and **DocA.pdf** again");

        assert_eq!(out.matches("[1]</span>").count(), 2);
        assert_eq!(out.matches("<li>").count(), 1);
    }

    #[test]
    fn test_below_threshold_left_unchanged() {
        let (_dir, index) = corpus_with(&["Protocolo de Sepsis.pdf"]);
        let resolver = CitationResolver::new(index);

        let text = "Sobre **cultivo de quinoa en altura** no hay documentos.";
        let out = resolver.resolve_references(text);

        // Mention byte-for-byte unchanged, no bibliography appended
        assert_eq!(out, text);
    }

    #[test]
    fn test_mixed_resolution_indices_start_at_one() {
        let (_dir, index) = corpus_with(&["Guia de Antibioticos.pdf"]);
        let resolver = CitationResolver::new(index);

        let out = resolver.resolve_references(
            "Primero **cultivo de quinoa en altura**, luego **Guia de Antibioticos.pdf**.",
        );

        // The unresolvable mention keeps its text and gets no marker; the
        // resolvable one is indexed starting at 1.
        assert!(out.contains("**cultivo de quinoa en altura**,"));
        assert!(out.contains(
            "**Guia de Antibioticos.pdf** <span class=\"doc-citation-number\">[1]</span>"
        ));
        assert_eq!(out.matches("<li>").count(), 1);
    }

    #[test]
    fn test_url_escapes_normalized_before_matching() {
        let (_dir, index) = corpus_with(&["Guia de Antibioticos (2024).pdf"]);
        let resolver = CitationResolver::new(index);

        let out =
            resolver.resolve_references("Ver **Guia+de+Antibioticos+%282024%29.pdf** aqui.");

        assert!(out.contains("doc-citation-number\">[1]</span>"));
        assert!(out.contains(">Guia de Antibioticos (2024).pdf</a>"));
    }

    #[test]
    fn test_substring_mention_is_not_mangled() {
        let (_dir, index) = corpus_with(&["Protocolo de Sepsis.pdf"]);
        let resolver = CitationResolver::new(index);

        // "Sepsis" is a substring of the resolvable mention but scores far
        // below threshold on its own; the span rewrite must leave it alone.
        let out = resolver
            .resolve_references("Sobre **Sepsis**: ver **Protocolo de Sepsis.pdf** y **Sepsis**.");

        assert!(out.contains("Sobre **Sepsis**:"));
        assert!(out.contains("y **Sepsis**."));
        assert_eq!(out.matches("doc-citation-number").count(), 1);
    }

    #[test]
    fn test_two_mentions_number_in_order_of_appearance() {
        let (_dir, index) = corpus_with(&["Alfa.pdf", "Beta.pdf"]);
        let resolver = CitationResolver::new(index);

        let out = resolver.resolve_references("Ver **Beta.pdf** y despues **Alfa.pdf**.");

        let beta = out.find("**Beta.pdf** <span class=\"doc-citation-number\">[1]</span>");
        let alfa = out.find("**Alfa.pdf** <span class=\"doc-citation-number\">[2]</span>");
        assert!(beta.is_some());
        assert!(alfa.is_some());
        assert!(out.contains("<li>[1] <a href=\"/static/docs/Beta.pdf\""));
        assert!(out.contains("<li>[2] <a href=\"/static/docs/Alfa.pdf\""));
    }

    #[test]
    fn test_determinism() {
        let (_dir, index) = corpus_with(&["Alfa.pdf", "Beta.pdf"]);
        let resolver = CitationResolver::new(index);

        let text = "Ver **Alfa.pdf** y **Beta.pdf**.";
        assert_eq!(
            resolver.resolve_references(text),
            resolver.resolve_references(text)
        );
    }

    #[test]
    fn test_find_mentions_scan() {
        let spans = find_mentions("a **uno** b **dos** c");
        assert_eq!(spans.len(), 2);

        // Unclosed and empty pairs are not mentions
        assert!(find_mentions("sin cierre **abierto").is_empty());
        assert!(find_mentions("vacio ****").is_empty());
        // A stray single star inside breaks the pair
        assert!(find_mentions("**a*b**").is_empty());
    }
}
