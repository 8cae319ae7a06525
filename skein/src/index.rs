//! Document co-mention indexer: resolves every mention of a document to a
//! canonical entity and keeps only the sentences naming at least two
//! distinct entities.
//!
//! Coreference chains inject extra occurrences: a mention overlapping a
//! chain's antecedent is propagated onto each of the chain's proform spans,
//! so "it acquired ..." counts toward the company the pronoun refers to.

use log::{debug, warn};

use crate::registry::{EntityId, Registry};
use crate::source::{SourceDocument, Span};

/// One source document after entity resolution: only the interesting
/// sentences survive, as ordered sets of entity handles.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    /// Source document name.
    pub name: String,
    /// Total sentence count of the source document, kept for normalization
    /// even though most sentences are discarded.
    pub total_sentences: usize,
    /// Distinct entities per interesting sentence, in sentence order;
    /// within a sentence, in first-occurrence order.
    pub interesting: Vec<Vec<EntityId>>,
}

/// All indexed documents of a corpus run, in ingestion order.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    documents: Vec<IndexedDocument>,
}

impl CorpusIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexed documents in ingestion order.
    #[must_use]
    pub fn documents(&self) -> &[IndexedDocument] {
        &self.documents
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether no document yielded interesting sentences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Append a document, replacing any earlier document of the same name.
    pub fn push(&mut self, document: IndexedDocument) {
        if let Some(existing) = self.documents.iter_mut().find(|d| d.name == document.name) {
            warn!("duplicate document {:?} replaces earlier copy", document.name);
            *existing = document;
        } else {
            self.documents.push(document);
        }
    }
}

/// Index a whole corpus: documents in listing order, mentions in document
/// order, derived coreference occurrences after the document's own
/// mentions. The order is load-bearing; resolution ratchets entity state.
pub fn index_corpus(registry: &mut Registry, documents: &[SourceDocument]) -> CorpusIndex {
    let mut index = CorpusIndex::new();
    for document in documents {
        if let Some(indexed) = index_document(registry, document) {
            index.push(indexed);
        }
    }
    index
}

/// Index one document. Returns `None` when no sentence names two or more
/// distinct entities; such documents are dropped entirely.
pub fn index_document(registry: &mut Registry, document: &SourceDocument) -> Option<IndexedDocument> {
    let mut by_sentence: Vec<Vec<EntityId>> = vec![Vec::new(); document.sentences.len()];

    let record = |sentence: usize, id: EntityId, slots: &mut Vec<Vec<EntityId>>| {
        let slot = &mut slots[sentence];
        if !slot.contains(&id) {
            slot.push(id);
        }
    };

    for mention in &document.mentions {
        if !mention.span.in_bounds(&document.sentences) {
            debug!(
                "{}: mention {:?} out of bounds at sentence {}, skipped",
                document.name, mention.text, mention.span.sentence
            );
            continue;
        }
        let id = registry.resolve_mention(&mention.text);
        record(mention.span.sentence, id, &mut by_sentence);
    }

    for chain in &document.corefs {
        for antecedent in &chain.antecedents {
            if !verify_text(document, &antecedent.span, &antecedent.text) {
                debug!(
                    "{}: stale antecedent {:?} at sentence {}, skipped",
                    document.name, antecedent.text, antecedent.span.sentence
                );
                continue;
            }
            for mention in &document.mentions {
                if !mention.span.in_bounds(&document.sentences)
                    || !mention.span.intersects(&antecedent.span)
                {
                    continue;
                }
                let id = registry.resolve_mention(&mention.text);
                for proform in &chain.proforms {
                    if !verify_text(document, &proform.span, &proform.text) {
                        debug!(
                            "{}: stale proform {:?} at sentence {}, skipped",
                            document.name, proform.text, proform.span.sentence
                        );
                        continue;
                    }
                    record(proform.span.sentence, id, &mut by_sentence);
                }
            }
        }
    }

    let interesting: Vec<Vec<EntityId>> = by_sentence
        .into_iter()
        .filter(|entities| entities.len() >= 2)
        .collect();
    if interesting.is_empty() {
        return None;
    }
    Some(IndexedDocument {
        name: document.name.clone(),
        total_sentences: document.sentences.len(),
        interesting,
    })
}

/// A coreference span is usable only if it addresses real tokens and its
/// recorded text still matches them.
fn verify_text(document: &SourceDocument, span: &Span, text: &str) -> bool {
    if !span.in_bounds(&document.sentences) {
        return false;
    }
    let tokens = &document.sentences[span.sentence][span.start_token..span.end_token];
    tokens.join(" ") == text
}
