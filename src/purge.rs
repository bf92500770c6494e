//! Extent minimization.
//!
//! With the reverse-inheritance relation every supertype of an entity shares
//! the entity's features, so a concept's extent lists the entity together with
//! its ancestors. Purging removes these ancestors, leaving one entity per
//! independent occurrence of the concept's intent.
//!
//! The simple purge removes every ancestor of another extent entity. The
//! context-aware purge keeps an ancestor whose own local features already cover
//! the whole intent, since it exhibits the feature by itself, and leaves the top
//! (empty intent) untouched.
//!
//! Purging shrinks extents in place; the lattice no longer satisfies the
//! closure property afterwards.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::construct::{Entity, EntitySet, PropertySet};
use crate::error::ConceptualError;
use crate::hierarchy::HierarchyOracle;
use crate::lattice::{ConceptId, Lattice};
use crate::traverse::{Direction, Traversal, VisitorMut};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeMode {
    None,
    Simple,
    #[default]
    ContextAware,
}

pub struct ExtentPurger<'o, O: ?Sized> {
    oracle: &'o O,
    mode: PurgeMode,
    removed: u64,
    skipped: u64,
    failed: u64,
}

impl<'o, O: HierarchyOracle + ?Sized> ExtentPurger<'o, O> {
    pub fn new(oracle: &'o O, mode: PurgeMode) -> Self {
        Self {
            oracle,
            mode,
            removed: 0,
            skipped: 0,
            failed: 0,
        }
    }
    /// Entities removed from extents so far.
    pub fn removed(&self) -> u64 {
        self.removed
    }
    /// Oracle queries that could not resolve an entity and were skipped.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
    /// Oracle queries that failed for any other reason; also passed over.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    fn skip(&mut self, entity: Entity, error: &ConceptualError) {
        if error.is_skippable() {
            self.skipped += 1;
            warn!(entity, %error, "hierarchy query skipped");
        } else {
            self.failed += 1;
            error!(entity, %error, "hierarchy query failed");
        }
    }

    /// Whether the entity's local features cover `intent` on their own, or
    /// `None` when the oracle cannot tell.
    fn exhibits(&mut self, entity: Entity, intent: &PropertySet) -> Option<bool> {
        match self.oracle.local_feature_set(entity) {
            Ok(local) => Some(intent.is_subset(&local)),
            Err(error) => {
                self.skip(entity, &error);
                None
            }
        }
    }

    pub fn process(&mut self, lattice: &mut Lattice, node: ConceptId) {
        let Some(concept) = lattice.get(node) else {
            return;
        };
        if self.mode == PurgeMode::None {
            return;
        }
        if self.mode == PurgeMode::ContextAware && concept.intent().is_empty() {
            return;
        }
        let intent = concept.intent().clone();
        let mut extent = concept.extent().clone();
        let mut pending = extent.clone();
        let mut purged = EntitySet::new();
        while let Some(entity) = pending.min() {
            pending.remove(entity);
            let ancestors = match self.oracle.ancestors(entity) {
                Ok(ancestors) => ancestors,
                Err(error) => {
                    self.skip(entity, &error);
                    continue;
                }
            };
            for ancestor in (&ancestors & &extent).iter() {
                pending.remove(ancestor);
                // an ancestor the oracle cannot describe stays where it is
                if self.mode == PurgeMode::ContextAware && self.exhibits(ancestor, &intent) != Some(false) {
                    continue;
                }
                extent.remove(ancestor);
                purged.insert(ancestor);
            }
        }
        if purged.is_empty() {
            return;
        }
        if let Some(concept) = lattice.get_mut(node) {
            for entity in purged.iter() {
                concept.remove_from_extent(entity);
            }
        }
        self.removed += purged.len();
        debug!(concept = %node, removed = purged.len(), remaining = extent.len(), "extent purged");
    }
}

impl<O: HierarchyOracle + ?Sized> VisitorMut for ExtentPurger<'_, O> {
    fn on_visit(&mut self, lattice: &mut Lattice, node: ConceptId) {
        self.process(lattice, node);
    }
}

/// Purges every extent of the lattice and returns the number of removed entities.
pub fn purge<O: HierarchyOracle + ?Sized>(lattice: &mut Lattice, oracle: &O, mode: PurgeMode) -> u64 {
    if mode == PurgeMode::None {
        return 0;
    }
    let started = Instant::now();
    let mut purger = ExtentPurger::new(oracle, mode);
    Traversal::new(Direction::TopDown).walk_mut(lattice, &mut purger);
    info!(
        ms = started.elapsed().as_secs_f64() * 1000.0,
        mode = ?mode,
        removed = purger.removed(),
        skipped = purger.skipped(),
        failed = purger.failed(),
        "extents purged"
    );
    purger.removed()
}
