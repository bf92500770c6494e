//! Incremental lattice construction.
//!
//! The builder follows the incremental algorithm of Godin, Missaoui and Alaoui
//! (Computational Intelligence, 1995). Entities are added one at a time; each
//! insertion walks the existing concepts by increasing intent size and either
//! extends a concept (its intent is contained in the new image), creates a new
//! concept for an intersection not seen before (the concept that first produces
//! it is its generator), or does nothing because the intersection is already
//! accounted for in this round.
//!
//! Concepts of one intent size are processed in ascending [`ConceptId`] order,
//! so when several concepts yield the same intersection the one with the lowest
//! id is its generator and the others only contribute their extents.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::construct::{Entity, EntitySet, PropertySet};
use crate::error::{ConceptualError, Result};
use crate::lattice::{Concept, ConceptId, ConceptSet, Lattice};
use crate::relation::Relation;
use crate::traverse::IntentBuckets;

/// Concepts modified or created during one insertion, by intent size.
#[derive(Debug, Default)]
struct Touched {
    by_size: BTreeMap<usize, Vec<ConceptId>>,
    members: ConceptSet,
}

impl Touched {
    fn add(&mut self, lattice: &Lattice, id: ConceptId) {
        if self.members.insert(id) {
            let size = lattice[id].intent().len() as usize;
            self.by_size.entry(size).or_default().push(id);
        }
    }
    fn contains(&self, id: ConceptId) -> bool {
        self.members.contains(&id)
    }
    /// Touched concepts with an intent smaller than `size`, smallest first.
    fn below(&self, size: usize) -> Vec<ConceptId> {
        self.by_size
            .range(..size)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct LatticeBuilder {
    inserted: u64,
    created: u64,
}

impl LatticeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of insertions performed by this builder.
    pub fn inserted(&self) -> u64 {
        self.inserted
    }
    /// Number of concepts created by insertions (boundaries excluded).
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Builds the complete lattice of `relation`, inserting entities in ascending order.
    pub fn build(&mut self, relation: &Relation) -> Result<Lattice> {
        let started = Instant::now();
        let mut lattice = Lattice::new();
        self.initialize_top_bottom(&mut lattice, relation)?;
        for (entity, image) in relation.rows() {
            self.add(&mut lattice, entity, &image)?;
        }
        info!(
            ms = started.elapsed().as_secs_f64() * 1000.0,
            entities = relation.domain().len(),
            concepts = lattice.len(),
            edges = lattice.edge_count(),
            "lattice built"
        );
        Ok(lattice)
    }

    /// Creates the top `(∅, common properties)` and the bottom `(∅, all
    /// properties)`, linked when they differ. Extents are filled by insertion.
    pub fn initialize_top_bottom(&mut self, lattice: &mut Lattice, relation: &Relation) -> Result<()> {
        if !lattice.is_empty() {
            return Err(ConceptualError::Invariant(
                "top and bottom can only be initialized on an empty lattice".to_string(),
            ));
        }
        let common = relation.common_properties();
        let everything = relation.all_properties().clone();
        let top = lattice.insert(Concept::new(EntitySet::new(), common.clone()))?;
        lattice.set_top(top);
        if common == everything {
            lattice.set_bottom(top);
        } else {
            let bottom = lattice.insert(Concept::new(EntitySet::new(), everything))?;
            lattice.link(top, bottom)?;
            lattice.set_bottom(bottom);
        }
        Ok(())
    }

    /// Adds `entity` with its `image` to the lattice.
    pub fn add(&mut self, lattice: &mut Lattice, entity: Entity, image: &PropertySet) -> Result<()> {
        self.inserted += 1;
        let bottom = match lattice.bottom() {
            Some(bottom) => bottom,
            None => {
                let mut extent = EntitySet::new();
                extent.insert(entity);
                let only = lattice.insert(Concept::new(extent, image.clone()))?;
                lattice.set_top(only);
                lattice.set_bottom(only);
                debug!(entity, "first concept");
                return Ok(());
            }
        };
        self.adjust_bottom(lattice, bottom, image)?;

        let order = IntentBuckets::collect(lattice).into_order();
        let mut touched = Touched::default();
        let mut created = 0;
        let mut modified = 0;
        for old in order {
            let intent = lattice[old].intent().clone();
            if intent.is_subset(image) {
                if let Some(concept) = lattice.get_mut(old) {
                    concept.add_to_extent(entity);
                }
                touched.add(lattice, old);
                modified += 1;
                if &intent == image {
                    break;
                }
                continue;
            }
            let int = &intent & image;
            match lattice.find(&int) {
                Some(existing) if touched.contains(existing) => {
                    let extent = lattice[old].extent().clone();
                    if let Some(concept) = lattice.get_mut(existing) {
                        concept.extend_extent(&extent);
                    }
                }
                Some(existing) => {
                    return Err(ConceptualError::Invariant(format!(
                        "concept {} owns intent {:?} but was skipped while inserting entity {}",
                        existing,
                        int.iter().collect::<Vec<_>>(),
                        entity
                    )));
                }
                None => {
                    let generated = self.generate(lattice, &touched, old, entity, int.clone())?;
                    touched.add(lattice, generated);
                    created += 1;
                    if &int == image {
                        break;
                    }
                }
            }
        }
        debug!(entity, properties = image.len(), modified, created, "entity inserted");
        Ok(())
    }

    /// Grows the bottom so that its intent contains `image`.
    fn adjust_bottom(&mut self, lattice: &mut Lattice, bottom: ConceptId, image: &PropertySet) -> Result<()> {
        if image.is_subset(lattice[bottom].intent()) {
            return Ok(());
        }
        let intent = lattice[bottom].intent() | image;
        if lattice[bottom].extent().is_empty() {
            let grown = lattice.replace(bottom, Concept::new(EntitySet::new(), intent))?;
            debug!(bottom = %grown, "bottom replaced");
        } else {
            let grown = lattice.insert(Concept::new(EntitySet::new(), intent))?;
            lattice.link(bottom, grown)?;
            lattice.set_bottom(grown);
            self.created += 1;
            debug!(bottom = %grown, "bottom extended");
        }
        Ok(())
    }

    /// Creates the concept `(extent(generator) ∪ {entity}, int)` below its
    /// maximal touched ancestors and above `generator`.
    fn generate(
        &mut self,
        lattice: &mut Lattice,
        touched: &Touched,
        generator: ConceptId,
        entity: Entity,
        int: PropertySet,
    ) -> Result<ConceptId> {
        let mut extent = lattice[generator].extent().clone();
        extent.insert(entity);
        let size = int.len() as usize;
        let generated = lattice.insert(Concept::new(extent, int))?;
        lattice.link(generated, generator)?;
        self.created += 1;

        for candidate in touched.below(size) {
            let above = lattice[candidate].intent();
            let within = |intent: &PropertySet| intent.is_subset(lattice[generated].intent()) && intent != lattice[generated].intent();
            if !within(above) {
                continue;
            }
            let covered = lattice[candidate]
                .children()
                .iter()
                .any(|child| within(lattice[*child].intent()));
            if covered {
                continue;
            }
            if lattice[candidate].has_child(generator) {
                lattice.unlink(candidate, generator)?;
            }
            lattice.link(candidate, generated)?;
        }

        if lattice[generated].parents().is_empty() {
            lattice.set_top(generated);
            debug!(top = %generated, "top replaced");
        }
        Ok(generated)
    }
}
