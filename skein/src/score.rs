//! Network scorer: folds interesting sentences into frequency tables and
//! weights every co-mentioned entity pair by normalized pointwise mutual
//! information.
//!
//! NPMI rescales PMI by the self-information of the joint event, which
//! counteracts plain PMI's bias toward rare co-occurrences. The weight lies
//! in roughly [-1, 1]; pairs that never co-occur are absent from the output
//! rather than carried at weight zero.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::index::CorpusIndex;
use crate::registry::{EntityId, Registry};

/// Count over a running total, used while folding frequency tables into
/// probabilities. The denominator is the corpus size, fixed only once the
/// whole corpus has been folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rational {
    pub numerator: u64,
    pub denominator: u64,
}

impl Rational {
    fn value(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// A scored edge of the relatedness network. Sides are canonicalized so
/// `a_key < b_key`.
#[derive(Debug, Clone)]
pub struct EntityPair {
    /// Canonical key of the lexicographically smaller entity.
    pub a_key: String,
    /// Canonical key of the lexicographically larger entity.
    pub b_key: String,
    /// Normalized PMI weight; negative for pairs rarer than chance.
    pub weight: f64,
    /// Sentences in which the pair co-occurred.
    pub sentences: u64,
    /// Distinct documents in which the pair co-occurred.
    pub documents: u64,
}

impl PartialEq for EntityPair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EntityPair {}

impl PartialOrd for EntityPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityPair {
    /// Weakest association first, ties broken by counts and finally keys.
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| self.sentences.cmp(&other.sentences))
            .then_with(|| self.documents.cmp(&other.documents))
            .then_with(|| self.a_key.cmp(&other.a_key))
            .then_with(|| self.b_key.cmp(&other.b_key))
    }
}

/// Score the whole index: one pass accumulating per-entity sentence
/// frequencies, per-pair sentence and document frequencies, and the corpus
/// size (total entity-sentence memberships), then one NPMI computation per
/// pair with nonzero co-mention frequency.
///
/// Returns pairs in ascending weight order. Two distinct entities carrying
/// equal canonical keys, or two distinct pairs comparing equal under the
/// total order, are consistency errors.
pub fn score_network(registry: &Registry, index: &CorpusIndex) -> Result<Vec<EntityPair>> {
    let mut corpus_size: u64 = 0;
    let mut entity_freq: HashMap<EntityId, u64> = HashMap::new();
    let mut pair_sentences: HashMap<(EntityId, EntityId), u64> = HashMap::new();
    let mut pair_documents: HashMap<(EntityId, EntityId), u64> = HashMap::new();

    for document in index.documents() {
        let mut seen_here: HashSet<(EntityId, EntityId)> = HashSet::new();
        for sentence in &document.interesting {
            corpus_size += sentence.len() as u64;
            for &id in sentence {
                *entity_freq.entry(id).or_insert(0) += 1;
            }
            for (i, &x) in sentence.iter().enumerate() {
                for &y in &sentence[i + 1..] {
                    let pair = canonical_pair(registry, x, y)?;
                    *pair_sentences.entry(pair).or_insert(0) += 1;
                    if seen_here.insert(pair) {
                        *pair_documents.entry(pair).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    let mut network: BTreeSet<EntityPair> = BTreeSet::new();
    for (&(x, y), &joint) in &pair_sentences {
        let p_joint = Rational { numerator: joint, denominator: corpus_size };
        let p_x = Rational { numerator: entity_freq[&x], denominator: corpus_size };
        let p_y = Rational { numerator: entity_freq[&y], denominator: corpus_size };
        // Every interesting sentence holds at least two entities, so
        // P(joint) <= 1/2 and the normalizer below is never zero.
        let pmi = (p_joint.value() / (p_x.value() * p_y.value())).log2();
        let weight = pmi / -p_joint.value().log2();

        let pair = EntityPair {
            a_key: registry.get(x).key.clone(),
            b_key: registry.get(y).key.clone(),
            weight,
            sentences: joint,
            documents: pair_documents[&(x, y)],
        };
        if !network.insert(pair) {
            return Err(Error::consistency(format!(
                "distinct pairs compare equal: ({:?}, {:?})",
                registry.get(x).key,
                registry.get(y).key
            )));
        }
    }

    Ok(network.into_iter().collect())
}

/// Order an unordered pair by canonical key. Equal keys on distinct
/// entities mean resolution failed to collapse a duplicate identity.
fn canonical_pair(registry: &Registry, x: EntityId, y: EntityId) -> Result<(EntityId, EntityId)> {
    let key_x = &registry.get(x).key;
    let key_y = &registry.get(y).key;
    match key_x.cmp(key_y) {
        Ordering::Less => Ok((x, y)),
        Ordering::Greater => Ok((y, x)),
        Ordering::Equal => Err(Error::consistency(format!(
            "duplicate canonical key {key_x:?} on distinct entities"
        ))),
    }
}
