//! Concepts and the lattice that owns them.
//!
//! Concepts reference each other through [`ConceptId`] handles into a flat
//! arena owned by the [`Lattice`], so parent/child links never own anything and
//! a concept that is supplanted by another simply becomes detached.
//!
//! The lattice also keeps an index from intent to concept. Intents are unique
//! among attached concepts; any operation that would break this returns
//! [`ConceptualError::Invariant`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Index;

use serde::Serialize;

use crate::construct::{Entity, EntitySet, IdHasher, OtherHasher, Property, PropertySet};
use crate::error::{ConceptualError, Result};
use crate::relation::Relation;

// ------------- ConceptId -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConceptId(u32);

impl ConceptId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type ConceptSet = HashSet<ConceptId, IdHasher>;

// ------------- Concept -------------
#[derive(Debug, Clone, Default)]
pub struct Concept {
    extent: EntitySet,
    intent: PropertySet,
    parents: ConceptSet,
    children: ConceptSet,
    attached: bool,
}

impl Concept {
    pub fn new(extent: EntitySet, intent: PropertySet) -> Self {
        Self {
            extent,
            intent,
            parents: ConceptSet::default(),
            children: ConceptSet::default(),
            attached: true,
        }
    }
    pub fn extent(&self) -> &EntitySet {
        &self.extent
    }
    pub fn intent(&self) -> &PropertySet {
        &self.intent
    }
    pub fn parents(&self) -> &ConceptSet {
        &self.parents
    }
    pub fn children(&self) -> &ConceptSet {
        &self.children
    }
    /// Parents in ascending id order.
    pub fn sorted_parents(&self) -> Vec<ConceptId> {
        let mut parents: Vec<ConceptId> = self.parents.iter().copied().collect();
        parents.sort_unstable();
        parents
    }
    /// Children in ascending id order.
    pub fn sorted_children(&self) -> Vec<ConceptId> {
        let mut children: Vec<ConceptId> = self.children.iter().copied().collect();
        children.sort_unstable();
        children
    }
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn add_to_extent(&mut self, entity: Entity) -> bool {
        self.extent.insert(entity)
    }
    pub fn remove_from_extent(&mut self, entity: Entity) -> bool {
        self.extent.remove(entity)
    }
    pub fn extend_extent(&mut self, entities: &EntitySet) {
        self.extent |= entities;
    }

    // Edge maintenance is one-sided; callers keep both ends in step.
    pub fn has_parent(&self, parent: ConceptId) -> bool {
        self.parents.contains(&parent)
    }
    pub fn has_child(&self, child: ConceptId) -> bool {
        self.children.contains(&child)
    }
    pub fn add_parent(&mut self, parent: ConceptId) -> bool {
        self.parents.insert(parent)
    }
    pub fn add_child(&mut self, child: ConceptId) -> bool {
        self.children.insert(child)
    }
    pub fn remove_parent(&mut self, parent: ConceptId) -> bool {
        self.parents.remove(&parent)
    }
    pub fn remove_child(&mut self, child: ConceptId) -> bool {
        self.children.remove(&child)
    }

    /// Same extent and intent, but no parents or children.
    pub fn copy(&self) -> Concept {
        Concept::new(self.extent.clone(), self.intent.clone())
    }
}

fn key(set: &PropertySet) -> Vec<u64> {
    set.iter().collect()
}

// ------------- Lattice -------------
#[derive(Debug, Default)]
pub struct Lattice {
    concepts: Vec<Concept>,
    intents: HashMap<Vec<Property>, ConceptId, OtherHasher>,
    top: Option<ConceptId>,
    bottom: Option<ConceptId>,
}

impl Lattice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(&self) -> Option<ConceptId> {
        self.top
    }
    pub fn bottom(&self) -> Option<ConceptId> {
        self.bottom
    }
    pub fn set_top(&mut self, top: ConceptId) {
        self.top = Some(top);
    }
    pub fn set_bottom(&mut self, bottom: ConceptId) {
        self.bottom = Some(bottom);
    }

    /// Adds a concept to the arena. Its edges are expected to be empty.
    pub fn insert(&mut self, mut concept: Concept) -> Result<ConceptId> {
        let intent = key(&concept.intent);
        if let Some(owner) = self.intents.get(&intent) {
            return Err(ConceptualError::Invariant(format!(
                "intent {:?} is already owned by concept {}",
                intent, owner
            )));
        }
        let id = ConceptId(u32::try_from(self.concepts.len()).map_err(|_| {
            ConceptualError::Invariant("concept arena exhausted".to_string())
        })?);
        concept.attached = true;
        self.concepts.push(concept);
        self.intents.insert(intent, id);
        Ok(id)
    }

    pub fn get(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.get(id.index()).filter(|c| c.attached)
    }
    pub fn get_mut(&mut self, id: ConceptId) -> Option<&mut Concept> {
        self.concepts.get_mut(id.index()).filter(|c| c.attached)
    }
    fn attached(&self, id: ConceptId) -> Result<&Concept> {
        self.get(id).ok_or(ConceptualError::UnknownConcept(id))
    }

    /// The attached concept owning exactly this intent.
    pub fn find(&self, intent: &PropertySet) -> Option<ConceptId> {
        self.intents.get(&key(intent)).copied()
    }

    /// Adds the edge `parent -> child` on both ends.
    pub fn link(&mut self, parent: ConceptId, child: ConceptId) -> Result<()> {
        self.attached(parent)?;
        self.attached(child)?;
        self.concepts[parent.index()].add_child(child);
        self.concepts[child.index()].add_parent(parent);
        Ok(())
    }

    /// Removes the edge `parent -> child` on both ends.
    pub fn unlink(&mut self, parent: ConceptId, child: ConceptId) -> Result<()> {
        self.attached(parent)?;
        self.attached(child)?;
        self.concepts[parent.index()].remove_child(child);
        self.concepts[child.index()].remove_parent(parent);
        Ok(())
    }

    pub fn add_to_intent(&mut self, id: ConceptId, property: Property) -> Result<bool> {
        self.rekey(id, |intent| intent.insert(property))
    }
    pub fn remove_from_intent(&mut self, id: ConceptId, property: Property) -> Result<bool> {
        self.rekey(id, |intent| intent.remove(property))
    }
    // Intents are indexed, so they only change through the lattice.
    fn rekey(&mut self, id: ConceptId, change: impl FnOnce(&mut PropertySet) -> bool) -> Result<bool> {
        let mut intent = self.attached(id)?.intent().clone();
        if !change(&mut intent) {
            return Ok(false);
        }
        let new = key(&intent);
        if let Some(owner) = self.intents.get(&new) {
            return Err(ConceptualError::Invariant(format!(
                "intent {:?} is already owned by concept {}",
                new, owner
            )));
        }
        let concept = &mut self.concepts[id.index()];
        self.intents.remove(&key(&concept.intent));
        self.intents.insert(new, id);
        concept.intent = intent;
        Ok(true)
    }

    /// `successor` inherits every parent and child edge of `old`, which is then
    /// detached from the lattice (and from top/bottom if it was either).
    pub fn supplant(&mut self, successor: ConceptId, old: ConceptId) -> Result<()> {
        if successor == old {
            return Err(ConceptualError::Invariant(format!(
                "concept {} cannot supplant itself",
                old
            )));
        }
        self.attached(successor)?;
        let children = self.attached(old)?.sorted_children();
        let parents = self.concepts[old.index()].sorted_parents();
        for child in children {
            self.unlink(old, child)?;
            if child != successor {
                self.link(successor, child)?;
            }
        }
        for parent in parents {
            self.unlink(parent, old)?;
            if parent != successor {
                self.link(parent, successor)?;
            }
        }
        let intent = key(self.concepts[old.index()].intent());
        if self.intents.get(&intent) == Some(&old) {
            self.intents.remove(&intent);
        }
        self.concepts[old.index()].attached = false;
        if self.top == Some(old) {
            self.top = Some(successor);
        }
        if self.bottom == Some(old) {
            self.bottom = Some(successor);
        }
        Ok(())
    }

    /// Puts `concept` in the place of `old`; the two may share an intent.
    pub fn replace(&mut self, old: ConceptId, concept: Concept) -> Result<ConceptId> {
        let intent = key(self.attached(old)?.intent());
        if self.intents.get(&intent) == Some(&old) {
            self.intents.remove(&intent);
        }
        let successor = match self.insert(concept) {
            Ok(successor) => successor,
            Err(e) => {
                self.intents.insert(intent, old);
                return Err(e);
            }
        };
        self.supplant(successor, old)?;
        Ok(successor)
    }

    /// Attached concepts in ascending id order.
    pub fn ids(&self) -> impl Iterator<Item = ConceptId> + '_ {
        self.concepts
            .iter()
            .enumerate()
            .filter(|(_, c)| c.attached)
            .map(|(i, _)| ConceptId(i as u32))
    }
    pub fn iter(&self) -> impl Iterator<Item = (ConceptId, &Concept)> + '_ {
        self.ids().map(move |id| (id, &self.concepts[id.index()]))
    }
    /// Number of attached concepts.
    pub fn len(&self) -> usize {
        self.intents.len()
    }
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
    pub fn edge_count(&self) -> usize {
        self.iter().map(|(_, c)| c.children.len()).sum()
    }

    /// Checks the Galois closure of every concept, the boundary concepts, edge
    /// symmetry and the covering relation. Only meaningful before extents are purged.
    pub fn verify(&self, relation: &Relation) -> Result<()> {
        let fail = |message: String| -> Result<()> { Err(ConceptualError::Invariant(message)) };
        let (top, bottom) = match (self.top, self.bottom) {
            (Some(top), Some(bottom)) => (top, bottom),
            _ => return fail("lattice has no top or bottom".to_string()),
        };
        let mut roots = 0;
        let mut leaves = 0;
        for (id, concept) in self.iter() {
            if &relation.intent_of(concept.extent()) != concept.intent() {
                return fail(format!("intent of concept {} is not closed", id));
            }
            if &relation.extent_of(concept.intent()) != concept.extent() {
                return fail(format!("extent of concept {} is not closed", id));
            }
            if concept.parents.is_empty() {
                roots += 1;
            }
            if concept.children.is_empty() {
                leaves += 1;
            }
            for child in concept.sorted_children() {
                let below = self.attached(child)?;
                if !below.has_parent(id) {
                    return fail(format!("edge {} -> {} is one-sided", id, child));
                }
                if below.intent().len() <= concept.intent().len() || !concept.intent().is_subset(below.intent()) {
                    return fail(format!("edge {} -> {} does not grow the intent", id, child));
                }
                let between = self.iter().any(|(other, o)| {
                    other != id
                        && other != child
                        && concept.intent().is_subset(o.intent())
                        && o.intent().is_subset(below.intent())
                        && o.intent() != concept.intent()
                        && o.intent() != below.intent()
                });
                if between {
                    return fail(format!("edge {} -> {} is not a covering edge", id, child));
                }
            }
            for parent in concept.sorted_parents() {
                if !self.attached(parent)?.has_child(id) {
                    return fail(format!("edge {} -> {} is one-sided", parent, id));
                }
            }
        }
        if roots != 1 || leaves != 1 {
            return fail(format!("expected one root and one leaf, found {} and {}", roots, leaves));
        }
        if self[top].extent() != relation.domain() || self[top].intent() != &relation.common_properties() {
            return fail(format!("concept {} is not the top", top));
        }
        if self[bottom].intent() != relation.all_properties() && !relation.is_empty() {
            return fail(format!("concept {} is not the bottom", bottom));
        }
        Ok(())
    }

    /// A digest of the (extent, intent) pairs and of the edges expressed through
    /// intents, so that isomorphic lattices share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut pairs: Vec<(Vec<u64>, Vec<u64>)> = self
            .iter()
            .map(|(_, c)| (c.extent.iter().collect(), key(&c.intent)))
            .collect();
        pairs.sort_unstable();
        let mut edges: Vec<(Vec<u64>, Vec<u64>)> = self
            .iter()
            .flat_map(|(_, c)| {
                c.children
                    .iter()
                    .map(move |child| (key(&c.intent), key(&self.concepts[child.index()].intent)))
            })
            .collect();
        edges.sort_unstable();
        let mut hasher = blake3::Hasher::new();
        for (section, entries) in [(b'c', &pairs), (b'e', &edges)] {
            hasher.update(&[section]);
            for (left, right) in entries {
                for id in left {
                    hasher.update(&id.to_le_bytes());
                }
                hasher.update(b"|");
                for id in right {
                    hasher.update(&id.to_le_bytes());
                }
                hasher.update(b";");
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl Index<ConceptId> for Lattice {
    type Output = Concept;
    fn index(&self, id: ConceptId) -> &Concept {
        &self.concepts[id.index()]
    }
}
