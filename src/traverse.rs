//! Direction-aware walks over a lattice.
//!
//! A [`Traversal`] starts at the top (walking children) or at the bottom
//! (walking parents) and reports every concept it reaches to a visitor. A
//! concept reached a second time through another path is reported through
//! `on_revisit` and not expanded again, so `on_visit` fires once per concept per
//! traversal instance. The visited set belongs to the traversal, not to the
//! concepts: independent traversals never interfere with each other.
//!
//! Neighbours are expanded in ascending [`ConceptId`] order, depth first, which
//! makes every walk (and everything printed from it) reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lattice::{ConceptId, ConceptSet, Lattice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    TopDown,
    BottomUp,
}

pub trait Visitor {
    fn on_visit(&mut self, lattice: &Lattice, node: ConceptId);
    fn on_revisit(&mut self, _lattice: &Lattice, _node: ConceptId) {}
    fn on_before_recurse(&mut self, _lattice: &Lattice, _node: ConceptId, _direction: Direction) {}
}

/// A visitor allowed to change the lattice while it is being walked. Changes
/// to edges of a concept take effect for the walk once that concept is expanded.
pub trait VisitorMut {
    fn on_visit(&mut self, lattice: &mut Lattice, node: ConceptId);
    fn on_revisit(&mut self, _lattice: &mut Lattice, _node: ConceptId) {}
    fn on_before_recurse(&mut self, _lattice: &mut Lattice, _node: ConceptId, _direction: Direction) {}
}

enum Step {
    Visit(ConceptId),
    Revisit(ConceptId),
}

#[derive(Debug)]
pub struct Traversal {
    direction: Direction,
    visited: ConceptSet,
    pending: Vec<ConceptId>,
}

impl Traversal {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            visited: ConceptSet::default(),
            pending: Vec::new(),
        }
    }
    pub fn top_down() -> Self {
        Self::new(Direction::TopDown)
    }
    pub fn bottom_up() -> Self {
        Self::new(Direction::BottomUp)
    }
    pub fn direction(&self) -> Direction {
        self.direction
    }
    pub fn has_visited(&self, node: ConceptId) -> bool {
        self.visited.contains(&node)
    }
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
    /// Forgets every visited concept so the instance can walk again.
    pub fn reset(&mut self) {
        self.visited.clear();
        self.pending.clear();
    }

    pub fn walk<V: Visitor + ?Sized>(&mut self, lattice: &Lattice, visitor: &mut V) {
        self.seed(lattice);
        while let Some(step) = self.next_step() {
            match step {
                Step::Revisit(node) => visitor.on_revisit(lattice, node),
                Step::Visit(node) => {
                    visitor.on_visit(lattice, node);
                    visitor.on_before_recurse(lattice, node, self.direction);
                    self.expand(lattice, node);
                }
            }
        }
    }

    pub fn walk_mut<V: VisitorMut + ?Sized>(&mut self, lattice: &mut Lattice, visitor: &mut V) {
        self.seed(lattice);
        while let Some(step) = self.next_step() {
            match step {
                Step::Revisit(node) => visitor.on_revisit(lattice, node),
                Step::Visit(node) => {
                    visitor.on_visit(lattice, node);
                    visitor.on_before_recurse(lattice, node, self.direction);
                    self.expand(lattice, node);
                }
            }
        }
    }

    fn seed(&mut self, lattice: &Lattice) {
        self.pending.clear();
        let root = match self.direction {
            Direction::TopDown => lattice.top(),
            Direction::BottomUp => lattice.bottom(),
        };
        if let Some(root) = root {
            self.pending.push(root);
        }
    }

    fn next_step(&mut self) -> Option<Step> {
        let node = self.pending.pop()?;
        if self.visited.insert(node) {
            Some(Step::Visit(node))
        } else {
            Some(Step::Revisit(node))
        }
    }

    fn expand(&mut self, lattice: &Lattice, node: ConceptId) {
        let Some(concept) = lattice.get(node) else {
            return;
        };
        let next = match self.direction {
            Direction::TopDown => concept.sorted_children(),
            Direction::BottomUp => concept.sorted_parents(),
        };
        // the stack pops the lowest id first
        self.pending.extend(next.into_iter().rev());
    }
}

/// Walks the whole lattice once with a fresh traversal.
pub fn walk<V: Visitor + ?Sized>(lattice: &Lattice, direction: Direction, visitor: &mut V) {
    Traversal::new(direction).walk(lattice, visitor);
}

pub fn walk_mut<V: VisitorMut + ?Sized>(lattice: &mut Lattice, direction: Direction, visitor: &mut V) {
    Traversal::new(direction).walk_mut(lattice, visitor);
}

// ------------- Intent buckets -------------
/// Groups concepts by the cardinality of their intent.
#[derive(Debug, Default)]
pub struct IntentBuckets {
    buckets: BTreeMap<usize, Vec<ConceptId>>,
}

impl IntentBuckets {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn collect(lattice: &Lattice) -> Self {
        let mut buckets = Self::new();
        walk(lattice, Direction::TopDown, &mut buckets);
        buckets
    }
    pub fn bucket(&self, size: usize) -> &[ConceptId] {
        self.buckets.get(&size).map(Vec::as_slice).unwrap_or_default()
    }
    /// Sizes in increasing order.
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.keys().copied()
    }
    /// Every concept, by increasing intent size and then by id.
    pub fn into_order(self) -> Vec<ConceptId> {
        self.buckets
            .into_values()
            .flat_map(|mut bucket| {
                bucket.sort_unstable();
                bucket
            })
            .collect()
    }
}

impl Visitor for IntentBuckets {
    fn on_visit(&mut self, lattice: &Lattice, node: ConceptId) {
        let size = lattice[node].intent().len() as usize;
        self.buckets.entry(size).or_default().push(node);
    }
}
