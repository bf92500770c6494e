//! Text and JSON renderings of a lattice and its classification.
//!
//! Printers are visitors: they walk the lattice top-down and render each
//! concept as `id[extent,intent]` with names sorted alphabetically. A concept
//! reached again through another parent is rendered as `id[...,...]`. Node ids
//! come from a [`NodeIds`] owned by the caller, so the same concept keeps its id
//! across several prints of a lattice that grows in between.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write;

use roaring::RoaringTreemap;
use serde::Serialize;

use crate::classify::{Classification, ClassificationTag};
use crate::construct::{labels, IdHasher, SymbolKeeper};
use crate::error::Result;
use crate::lattice::{ConceptId, ConceptSet, Lattice};
use crate::relation::Relation;
use crate::traverse::{Direction, Traversal, Visitor};

/// Print ids, assigned in order of first appearance.
#[derive(Debug, Default)]
pub struct NodeIds {
    ids: HashMap<ConceptId, usize, IdHasher>,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn id(&mut self, concept: ConceptId) -> usize {
        let next = self.ids.len();
        *self.ids.entry(concept).or_insert(next)
    }
    pub fn get(&self, concept: ConceptId) -> Option<usize> {
        self.ids.get(&concept).copied()
    }
    pub fn len(&self) -> usize {
        self.ids.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
    pub fn reset(&mut self) {
        self.ids.clear();
    }
}

/// A tag with names, e.g.
/// `FULL_EXTENT_FULL_BEHAVIOR_INTERFACE_REALIZATION; ANCHOR: [Shape]; ANCHOR BEHAVIOR COVERAGE: [1.00]`
pub fn describe_tag(tag: &ClassificationTag, relation: &Relation) -> String {
    let mut output = tag.label();
    if let Some(anchor) = tag.anchor {
        let _ = write!(
            output,
            "; ANCHOR: [{}]; ANCHOR BEHAVIOR COVERAGE: [{:.2}]",
            relation.entity_label(anchor),
            tag.behavior_coverage
        );
    }
    if tag.configuration_coverage > 0.0 {
        let _ = write!(output, "; CONFIGURATION BEHAVIOR COVERAGE: [{:.2}]", tag.configuration_coverage);
    }
    if !tag.related.is_empty() {
        let mut related: Vec<String> = tag.related.iter().map(|e| relation.entity_label(*e)).collect();
        related.sort_unstable();
        let _ = write!(output, "; RELATED: [{}]", related.join(", "));
    }
    output
}

/// Full-extent tags first, separated by ` ## `.
pub fn describe_tags(tags: &[ClassificationTag], relation: &Relation) -> String {
    let (full, partial): (Vec<&ClassificationTag>, Vec<&ClassificationTag>) =
        tags.iter().partition(|tag| tag.is_full_extent());
    full.into_iter()
        .chain(partial)
        .map(|tag| describe_tag(tag, relation))
        .collect::<Vec<_>>()
        .join(" ## ")
}

// ------------- Printers -------------
pub struct LatticePrinter<'a> {
    relation: &'a Relation,
    ids: &'a mut NodeIds,
    candidates: Option<&'a Classification>,
    indents: HashMap<ConceptId, String, IdHasher>,
    out: String,
}

impl<'a> LatticePrinter<'a> {
    /// Prints every concept, announcing any children with an `ITS CHILDREN:` line.
    pub fn new(relation: &'a Relation, ids: &'a mut NodeIds) -> Self {
        Self {
            relation,
            ids,
            candidates: None,
            indents: HashMap::default(),
            out: String::new(),
        }
    }
    /// Prints the classified concepts only, each followed by its tags.
    pub fn candidates(relation: &'a Relation, ids: &'a mut NodeIds, classification: &'a Classification) -> Self {
        Self {
            candidates: Some(classification),
            ..Self::new(relation, ids)
        }
    }
    pub fn finish(self) -> String {
        self.out
    }

    fn indent(&self, node: ConceptId) -> String {
        self.indents.get(&node).cloned().unwrap_or_default()
    }
    fn shown(&self, node: ConceptId) -> bool {
        self.candidates.is_none_or(|c| c.contains(node))
    }
}

impl Visitor for LatticePrinter<'_> {
    fn on_visit(&mut self, lattice: &Lattice, node: ConceptId) {
        let id = self.ids.id(node);
        if !self.shown(node) {
            return;
        }
        let indent = self.indent(node);
        let concept = &lattice[node];
        let _ = writeln!(
            self.out,
            "{}{}[{},{}]",
            indent,
            id,
            labels(concept.extent(), self.relation.entity_keeper()),
            labels(concept.intent(), self.relation.property_keeper())
        );
    }

    fn on_revisit(&mut self, _lattice: &Lattice, node: ConceptId) {
        if !self.shown(node) {
            return;
        }
        let id = self.ids.id(node);
        let _ = writeln!(self.out, "{}{}[...,...]", self.indent(node), id);
    }

    fn on_before_recurse(&mut self, lattice: &Lattice, node: ConceptId, _direction: Direction) {
        let indent = self.indent(node);
        match self.candidates {
            None => {
                if !lattice[node].children().is_empty() {
                    let _ = writeln!(self.out, "{}ITS CHILDREN:", indent);
                }
            }
            Some(classification) => {
                if let Some(tags) = classification.get(node) {
                    let _ = writeln!(
                        self.out,
                        "{}FEATURE TYPE: {}",
                        indent.replace("->", "  "),
                        describe_tags(tags, self.relation)
                    );
                }
            }
        }
        let below = format!("{}\t->", indent);
        for child in lattice[node].sorted_children() {
            self.indents.insert(child, below.clone());
        }
    }
}

pub fn print_lattice(lattice: &Lattice, relation: &Relation, ids: &mut NodeIds) -> String {
    let mut printer = LatticePrinter::new(relation, ids);
    Traversal::new(Direction::TopDown).walk(lattice, &mut printer);
    printer.finish()
}

pub fn print_candidates(
    lattice: &Lattice,
    relation: &Relation,
    classification: &Classification,
    ids: &mut NodeIds,
) -> String {
    let mut printer = LatticePrinter::candidates(relation, ids, classification);
    Traversal::new(Direction::TopDown).walk(lattice, &mut printer);
    printer.finish()
}

// ------------- Candidate graph -------------
#[derive(Debug, Clone, Serialize)]
pub struct TagSummary {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    pub extent_coverage: f64,
    pub behavior_coverage: f64,
    pub configuration_coverage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateNode {
    pub id: ConceptId,
    pub extent: Vec<String>,
    pub intent: Vec<String>,
    pub tags: Vec<TagSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Connection {
    pub from: ConceptId,
    pub to: ConceptId,
}

/// The classified concepts, each connected to its nearest classified descendants.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateGraph {
    pub nodes: Vec<CandidateNode>,
    pub connections: Vec<Connection>,
}

fn sorted_names(set: &RoaringTreemap, keeper: &SymbolKeeper) -> Vec<String> {
    let mut names: Vec<String> = set.iter().map(|id| keeper.label(id)).collect();
    names.sort_unstable();
    names
}

impl CandidateGraph {
    pub fn new(lattice: &Lattice, relation: &Relation, classification: &Classification) -> Self {
        let mut graph = Self::default();
        for (id, tags) in classification.iter() {
            let Some(concept) = lattice.get(id) else {
                continue;
            };
            graph.nodes.push(CandidateNode {
                id,
                extent: sorted_names(concept.extent(), relation.entity_keeper()),
                intent: sorted_names(concept.intent(), relation.property_keeper()),
                tags: tags
                    .iter()
                    .map(|tag| TagSummary {
                        label: tag.label(),
                        anchor: tag.anchor.map(|a| relation.entity_label(a)),
                        related: {
                            let mut related: Vec<String> =
                                tag.related.iter().map(|e| relation.entity_label(*e)).collect();
                            related.sort_unstable();
                            related
                        },
                        extent_coverage: tag.extent_coverage,
                        behavior_coverage: tag.behavior_coverage,
                        configuration_coverage: tag.configuration_coverage,
                    })
                    .collect(),
            });
            for to in nearest_candidates(lattice, classification, id) {
                graph.connections.push(Connection { from: id, to });
            }
        }
        graph.connections.sort_unstable();
        graph
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Candidates below `from` with no other candidate in between, ascending.
fn nearest_candidates(lattice: &Lattice, classification: &Classification, from: ConceptId) -> Vec<ConceptId> {
    let mut found = Vec::new();
    let mut seen = ConceptSet::default();
    let mut pending: VecDeque<ConceptId> = lattice[from].sorted_children().into();
    while let Some(node) = pending.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        if classification.contains(node) {
            found.push(node);
        } else if let Some(concept) = lattice.get(node) {
            pending.extend(concept.sorted_children());
        }
    }
    found.sort_unstable();
    found
}
