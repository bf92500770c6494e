//! Classification of candidate concepts.
//!
//! A concept is a candidate when more than one entity shares its (non-empty)
//! intent and no child concept is shared by as many entities; such a child would
//! be the same commonality with more properties. Each candidate is matched
//! against the structural patterns a developer would have used to express the
//! commonality explicitly:
//!
//! * interface realization: an interface-like entity of the extent and some of
//!   its implementors;
//! * subtype redefinition: an entity of the extent and some of its subtypes
//!   (interface subtypes only, when the entity is interface-like);
//! * aggregation: an entity of the extent used as a field type by others.
//!
//! A candidate matching none of them is tagged ad hoc. Classification reads the
//! lattice but never changes it, and is meant to run on purged extents.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::construct::{Entity, EntitySet, PropertySet};
use crate::error::ConceptualError;
use crate::hierarchy::HierarchyOracle;
use crate::lattice::{Concept, ConceptId, Lattice};
use crate::traverse::{Direction, Traversal, Visitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    InterfaceRealization,
    SubtypeRedefinition,
    Aggregation,
    AdHoc,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PatternKind::InterfaceRealization => "INTERFACE_REALIZATION",
            PatternKind::SubtypeRedefinition => "SUBTYPE_REDEFINITION",
            PatternKind::Aggregation => "AGGREGATION",
            PatternKind::AdHoc => "AD_HOC",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Full,
    Partial,
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Coverage::Full => write!(f, "FULL"),
            Coverage::Partial => write!(f, "PARTIAL"),
        }
    }
}

// ------------- Tags -------------
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationTag {
    pub kind: PatternKind,
    /// Whether the pattern spans the whole extent; absent for ad hoc tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Coverage>,
    /// Whether the intent is all the behavior anchor and related entities share.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Coverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Entity>,
    /// Entities of the extent related to the anchor, ascending.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Entity>,
    /// `(|related| + 1) / |extent|`
    pub extent_coverage: f64,
    /// `|intent| / |local features of the anchor|`
    pub behavior_coverage: f64,
    /// `|intent| / |behavior shared by anchor and related entities|`
    pub configuration_coverage: f64,
}

impl ClassificationTag {
    pub fn ad_hoc() -> Self {
        Self {
            kind: PatternKind::AdHoc,
            extent: None,
            behavior: None,
            anchor: None,
            related: Vec::new(),
            extent_coverage: 0.0,
            behavior_coverage: 0.0,
            configuration_coverage: 0.0,
        }
    }
    pub fn is_full_extent(&self) -> bool {
        self.extent == Some(Coverage::Full)
    }
    pub fn is_full_behavior(&self) -> bool {
        self.behavior == Some(Coverage::Full)
    }
    /// e.g. `FULL_EXTENT_PARTIAL_BEHAVIOR_AGGREGATION`, or `AD_HOC`
    pub fn label(&self) -> String {
        match (self.extent, self.behavior) {
            (Some(extent), Some(behavior)) => format!("{}_EXTENT_{}_BEHAVIOR_{}", extent, behavior, self.kind),
            _ => self.kind.to_string(),
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// ------------- Classification -------------
/// Tags of every candidate concept.
#[derive(Debug, Default, Clone)]
pub struct Classification {
    tags: BTreeMap<ConceptId, Vec<ClassificationTag>>,
}

impl Classification {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, concept: ConceptId, tags: Vec<ClassificationTag>) {
        self.tags.insert(concept, tags);
    }
    pub fn get(&self, concept: ConceptId) -> Option<&[ClassificationTag]> {
        self.tags.get(&concept).map(Vec::as_slice)
    }
    pub fn contains(&self, concept: ConceptId) -> bool {
        self.tags.contains_key(&concept)
    }
    /// Candidates in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ConceptId, &[ClassificationTag])> + '_ {
        self.tags.iter().map(|(id, tags)| (*id, tags.as_slice()))
    }
    pub fn candidates(&self) -> impl Iterator<Item = ConceptId> + '_ {
        self.tags.keys().copied()
    }
    /// Candidates carrying at least one tag of the given kind.
    pub fn of_kind(&self, kind: PatternKind) -> Vec<ConceptId> {
        self.iter()
            .filter(|(_, tags)| tags.iter().any(|tag| tag.kind == kind))
            .map(|(id, _)| id)
            .collect()
    }
    pub fn len(&self) -> usize {
        self.tags.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// More than one entity, a non-empty intent and no child with as many entities.
pub fn is_candidate(lattice: &Lattice, node: ConceptId) -> bool {
    let Some(concept) = lattice.get(node) else {
        return false;
    };
    let size = concept.extent().len();
    size > 1
        && !concept.intent().is_empty()
        && !concept
            .children()
            .iter()
            .any(|child| lattice.get(*child).is_some_and(|c| c.extent().len() == size))
}

// ------------- Detector -------------
pub struct FeatureDetector<'o, O: ?Sized> {
    oracle: &'o O,
    classification: Classification,
    skipped: u64,
    failed: u64,
}

impl<'o, O: HierarchyOracle + ?Sized> FeatureDetector<'o, O> {
    pub fn new(oracle: &'o O) -> Self {
        Self {
            oracle,
            classification: Classification::new(),
            skipped: 0,
            failed: 0,
        }
    }
    /// Oracle queries that could not resolve an entity and were skipped.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
    /// Oracle queries that failed for any other reason; also passed over.
    pub fn failed(&self) -> u64 {
        self.failed
    }
    pub fn into_classification(self) -> Classification {
        self.classification
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

    /// Tags of a single concept, ad hoc when no structural pattern fits.
    pub fn tags(&mut self, concept: &Concept) -> Vec<ClassificationTag> {
        let mut tags = Vec::new();
        self.realizations(concept, &mut tags);
        self.redefinitions(concept, &mut tags);
        self.aggregations(concept, &mut tags);
        if tags.is_empty() {
            tags.push(ClassificationTag::ad_hoc());
        }
        tags
    }

    fn realizations(&mut self, concept: &Concept, tags: &mut Vec<ClassificationTag>) {
        let extent = concept.extent();
        for anchor in extent.iter() {
            match self.oracle.is_interface_like(anchor) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(error) => {
                    self.skip(anchor, &error);
                    continue;
                }
            }
            let mut related = match self.oracle.implementors(anchor) {
                Ok(implementors) => &implementors & extent,
                Err(error) => {
                    self.skip(anchor, &error);
                    continue;
                }
            };
            related.remove(anchor);
            if related.is_empty() {
                continue;
            }
            let full = related.len() == extent.len() - 1;
            if let Some(tag) = self.tag(PatternKind::InterfaceRealization, concept, anchor, &related, full) {
                tags.push(tag);
            }
        }
    }

    fn redefinitions(&mut self, concept: &Concept, tags: &mut Vec<ClassificationTag>) {
        let extent = concept.extent();
        for anchor in extent.iter() {
            let interface = match self.oracle.is_interface_like(anchor) {
                Ok(interface) => interface,
                Err(error) => {
                    self.skip(anchor, &error);
                    continue;
                }
            };
            let mut related = match self.oracle.subtypes(anchor) {
                Ok(subtypes) => &subtypes & extent,
                Err(error) => {
                    self.skip(anchor, &error);
                    continue;
                }
            };
            related.remove(anchor);
            if interface {
                let mut interfaces = EntitySet::new();
                for subtype in related.iter() {
                    match self.oracle.is_interface_like(subtype) {
                        Ok(true) => {
                            interfaces.insert(subtype);
                        }
                        Ok(false) => {}
                        Err(error) => self.skip(subtype, &error),
                    }
                }
                related = interfaces;
            }
            if related.is_empty() {
                continue;
            }
            let full = related.len() == extent.len() - 1;
            if let Some(tag) = self.tag(PatternKind::SubtypeRedefinition, concept, anchor, &related, full) {
                tags.push(tag);
            }
        }
    }

    fn aggregations(&mut self, concept: &Concept, tags: &mut Vec<ClassificationTag>) {
        let extent = concept.extent();
        let mut aggregates: BTreeMap<Entity, EntitySet> = BTreeMap::new();
        for aggregate in extent.iter() {
            let components = match self.oracle.member_components(aggregate) {
                Ok(components) => &components & extent,
                Err(error) => {
                    self.skip(aggregate, &error);
                    continue;
                }
            };
            for component in components.iter().filter(|c| *c != aggregate) {
                aggregates.entry(component).or_default().insert(aggregate);
            }
        }
        for (component, related) in aggregates {
            let full = related.len() >= extent.len() - 1;
            if let Some(tag) = self.tag(PatternKind::Aggregation, concept, component, &related, full) {
                tags.push(tag);
            }
        }
    }

    /// The behavior shared by the anchor (its own features) and every related
    /// entity (their cumulative features).
    fn common_behavior(&mut self, anchor: Entity, related: &EntitySet) -> Option<(PropertySet, PropertySet)> {
        let local = match self.oracle.local_feature_set(anchor) {
            Ok(local) => local,
            Err(error) => {
                self.skip(anchor, &error);
                return None;
            }
        };
        let mut common = local.clone();
        for entity in related.iter() {
            match self.oracle.cumulative_feature_set(entity) {
                Ok(cumulative) => common &= cumulative,
                Err(error) => self.skip(entity, &error),
            }
        }
        Some((local, common))
    }

    fn tag(
        &mut self,
        kind: PatternKind,
        concept: &Concept,
        anchor: Entity,
        related: &EntitySet,
        full_extent: bool,
    ) -> Option<ClassificationTag> {
        let (local, common) = self.common_behavior(anchor, related)?;
        let intent = concept.intent().len();
        Some(ClassificationTag {
            kind,
            extent: Some(if full_extent { Coverage::Full } else { Coverage::Partial }),
            behavior: Some(if common.len() == intent { Coverage::Full } else { Coverage::Partial }),
            anchor: Some(anchor),
            related: related.iter().collect(),
            extent_coverage: ratio(related.len() + 1, concept.extent().len()),
            behavior_coverage: ratio(intent, local.len()),
            configuration_coverage: ratio(intent, common.len()),
        })
    }
}

impl<O: HierarchyOracle + ?Sized> Visitor for FeatureDetector<'_, O> {
    fn on_visit(&mut self, lattice: &Lattice, node: ConceptId) {
        if !is_candidate(lattice, node) {
            return;
        }
        let tags = self.tags(&lattice[node]);
        self.classification.insert(node, tags);
    }
}

/// Tags every candidate concept of the lattice.
pub fn classify<O: HierarchyOracle + ?Sized>(lattice: &Lattice, oracle: &O) -> Classification {
    let started = Instant::now();
    let mut detector = FeatureDetector::new(oracle);
    Traversal::new(Direction::TopDown).walk(lattice, &mut detector);
    let skipped = detector.skipped();
    let failed = detector.failed();
    let classification = detector.into_classification();
    info!(
        ms = started.elapsed().as_secs_f64() * 1000.0,
        candidates = classification.len(),
        ad_hoc = classification.of_kind(PatternKind::AdHoc).len(),
        skipped,
        failed,
        "concepts classified"
    );
    classification
}
