//! Corpus interchange types: tokenized documents with named-entity mentions
//! and coreference chains, as produced by an upstream NER/coreference
//! pipeline.
//!
//! Documents arrive as JSON Lines, one document per line. Token positions
//! are half-open `[start_token, end_token)` ranges within a single sentence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Half-open token range within one sentence of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Zero-based sentence index.
    pub sentence: usize,
    /// First token covered.
    pub start_token: usize,
    /// One past the last token covered.
    pub end_token: usize,
}

impl Span {
    /// Whether this range addresses real tokens of `sentences`.
    #[must_use]
    pub fn in_bounds(&self, sentences: &[Vec<String>]) -> bool {
        self.start_token < self.end_token
            && sentences
                .get(self.sentence)
                .is_some_and(|s| self.end_token <= s.len())
    }

    /// Whether two ranges share at least one token of the same sentence.
    #[must_use]
    pub fn intersects(&self, other: &Span) -> bool {
        self.sentence == other.sentence
            && self.start_token < other.end_token
            && other.start_token < self.end_token
    }
}

/// An organization mention flagged by the upstream entity recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Where the mention sits in the document.
    pub span: Span,
    /// Surface text of the mention as the recognizer rendered it.
    pub text: String,
}

/// One side of a coreference chain: a positioned phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorefEntry {
    /// Where the phrase sits in the document.
    pub span: Span,
    /// Surface text of the phrase.
    pub text: String,
}

/// A coreference chain: proform phrases that refer back to antecedent
/// phrases elsewhere in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorefChain {
    /// Phrases being referred back to.
    pub antecedents: Vec<CorefEntry>,
    /// Referring phrases (pronouns, definite descriptions).
    pub proforms: Vec<CorefEntry>,
}

/// A tokenized document plus everything the upstream pipeline found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Unique document name within the corpus.
    pub name: String,
    /// Sentences as token lists.
    pub sentences: Vec<Vec<String>>,
    /// Organization mentions.
    #[serde(default)]
    pub mentions: Vec<Mention>,
    /// Coreference chains.
    #[serde(default)]
    pub corefs: Vec<CorefChain>,
}

/// Read a JSONL corpus: one [`SourceDocument`] per non-empty line.
pub fn read_corpus_jsonl(path: &Path) -> Result<Vec<SourceDocument>> {
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document: SourceDocument = serde_json::from_str(&line).map_err(|e| {
            Error::corpus(format!("{}:{}: {e}", path.display(), lineno + 1))
        })?;
        documents.push(document);
    }
    Ok(documents)
}
