//! Entity registry: an arena of named entities addressed by stable handles.
//!
//! Canonical keys are rewritten in place as longer aliases are discovered,
//! so everything downstream (sentence sets, frequency tables) holds an
//! [`EntityId`] handle into the arena rather than a copy of the key string.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::resolve;

/// Stable handle to a [`NamedEntity`] slot in a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    /// Arena index of this handle.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A discovered organization entity: a growing alias set plus the current
/// canonical key (always the longest alias accepted so far).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedEntity {
    /// Current canonical surface string.
    pub key: String,
    /// All accepted surface forms, in discovery order. Grows monotonically.
    pub aliases: Vec<String>,
    /// How many leading tokens have historically been tolerated as deletions.
    pub(crate) max_front_deletes: usize,
    /// How many trailing tokens have historically been tolerated as deletions.
    pub(crate) max_back_deletes: usize,
}

impl NamedEntity {
    /// Create an entity from its first mention.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        Self {
            key: initial.clone(),
            aliases: vec![initial],
            max_front_deletes: 0,
            max_back_deletes: 0,
        }
    }

    /// Record an accepted alias without touching the key.
    pub(crate) fn push_alias(&mut self, alias: &str) {
        if !self.aliases.iter().any(|a| a == alias) {
            self.aliases.push(alias.to_string());
        }
    }

    /// Current front-deletion tolerance.
    #[must_use]
    pub fn max_front_deletes(&self) -> usize {
        self.max_front_deletes
    }

    /// Current back-deletion tolerance.
    #[must_use]
    pub fn max_back_deletes(&self) -> usize {
        self.max_back_deletes
    }
}

/// Arena of all entities discovered in a corpus run, plus an exact-match
/// mention cache so repeated surface forms skip the linear resolution scan.
#[derive(Debug, Default)]
pub struct Registry {
    entities: Vec<NamedEntity>,
    mention_cache: HashMap<String, EntityId>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Borrow an entity by handle.
    #[must_use]
    pub fn get(&self, id: EntityId) -> &NamedEntity {
        &self.entities[id.0]
    }

    /// Mutably borrow an entity by handle.
    pub fn get_mut(&mut self, id: EntityId) -> &mut NamedEntity {
        &mut self.entities[id.0]
    }

    /// Iterate entities in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &NamedEntity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i), e))
    }

    /// Insert a pre-built entity (cache loading path). The mention cache is
    /// primed with every alias so later corpus scans reuse the slot.
    pub fn insert(&mut self, entity: NamedEntity) -> EntityId {
        let id = EntityId(self.entities.len());
        for alias in &entity.aliases {
            self.mention_cache.insert(alias.to_lowercase(), id);
        }
        self.entities.push(entity);
        id
    }

    /// Resolve a raw mention to a canonical entity.
    ///
    /// Checks the exact-match cache first, then scans every previously
    /// discovered entity in discovery order attempting
    /// [`resolve::try_add_alias`], and finally mints a new entity when no
    /// existing one accepts the mention. The scan order makes resolution
    /// deterministic for a fixed mention sequence.
    pub fn resolve_mention(&mut self, mention: &str) -> EntityId {
        let cache_key = mention.to_lowercase();
        if let Some(&id) = self.mention_cache.get(&cache_key) {
            return id;
        }

        for (i, entity) in self.entities.iter_mut().enumerate() {
            if resolve::try_add_alias(entity, mention) {
                let id = EntityId(i);
                self.mention_cache.insert(cache_key, id);
                return id;
            }
        }

        let id = EntityId(self.entities.len());
        self.entities.push(NamedEntity::new(mention));
        self.mention_cache.insert(cache_key, id);
        id
    }
}
