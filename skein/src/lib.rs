//! Extraction of weighted relatedness networks between organization
//! entities from a text corpus.
//!
//! Given tokenized documents annotated with organization mentions and
//! coreference chains, skein resolves surface-form variation ("TRW",
//! "TRW Inc.", "A&P", "The Great Atlantic and Pacific Tea Company") down
//! to canonical entities, indexes which entities are mentioned together in
//! a sentence, and scores every co-mentioned pair by normalized pointwise
//! mutual information. The result is a sorted edge list suitable for
//! downstream clustering or visualization.
//!
//! The stages are exposed individually ([`registry`], [`index`], [`score`],
//! [`codec`]) and as a batch [`pipeline`] that caches the expensive
//! indexing stage between runs.
//!
//! Entity resolution is heuristic and order-dependent: accepted aliases
//! ratchet per-entity deletion tolerances that widen later matches, so a
//! corpus must be processed in a fixed, reproducible order. The matcher's
//! documented false positives and false negatives are part of its contract;
//! see [`resolve`].

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod score;
pub mod source;

pub use error::{Error, Result};
pub use index::{CorpusIndex, IndexedDocument};
pub use pipeline::{generate_network, CachePaths};
pub use registry::{EntityId, NamedEntity, Registry};
pub use score::{score_network, EntityPair};
pub use source::{read_corpus_jsonl, CorefChain, CorefEntry, Mention, SourceDocument, Span};
