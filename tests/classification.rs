use conceptual::builder::LatticeBuilder;
use conceptual::classify::{
    classify, is_candidate, Classification, ClassificationTag, Coverage, FeatureDetector, PatternKind,
};
use conceptual::construct::{Entity, EntitySet, PropertySet};
use conceptual::error::{ConceptualError, Result};
use conceptual::hierarchy::{HierarchyOracle, TypeDeclaration, TypeModel};
use conceptual::lattice::{Concept, Lattice};
use conceptual::purge::{purge, PurgeMode};
use conceptual::traverse::Traversal;

fn analyzed(model: &TypeModel, mode: PurgeMode) -> (Lattice, Classification) {
    let mut lattice = LatticeBuilder::new().build(&model.relation()).expect("lattice");
    purge(&mut lattice, model, mode);
    let classification = classify(&lattice, model);
    (lattice, classification)
}

fn only_tags<'c>(classification: &'c Classification) -> &'c [ClassificationTag] {
    assert_eq!(classification.len(), 1, "exactly one candidate");
    let (_, tags) = classification.iter().next().expect("a candidate");
    tags
}

// answers like the model, except for one entity that it cannot resolve
struct Unresolvable<'m> {
    model: &'m TypeModel,
    entity: Entity,
}

impl Unresolvable<'_> {
    fn check(&self, entity: Entity) -> Result<()> {
        if entity == self.entity {
            return Err(ConceptualError::Unresolved { entity });
        }
        Ok(())
    }
}

impl HierarchyOracle for Unresolvable<'_> {
    fn ancestors(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        self.model.ancestors(entity)
    }
    fn is_interface_like(&self, entity: Entity) -> Result<bool> {
        self.check(entity)?;
        self.model.is_interface_like(entity)
    }
    fn implementors(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        self.model.implementors(entity)
    }
    fn subtypes(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        self.model.subtypes(entity)
    }
    fn local_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        self.check(entity)?;
        self.model.local_feature_set(entity)
    }
    fn cumulative_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        self.check(entity)?;
        self.model.cumulative_feature_set(entity)
    }
    fn member_components(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        self.model.member_components(entity)
    }
}

fn vehicles() -> TypeModel {
    TypeModel::from_declarations(vec![
        TypeDeclaration::class("Engine").features(&["start"]),
        TypeDeclaration::class("Car").features(&["start", "drive"]).field("Engine"),
        TypeDeclaration::class("Boat").features(&["start", "sail"]).field("Engine"),
    ])
}

fn detected<O: HierarchyOracle>(lattice: &Lattice, oracle: &O) -> (Classification, u64, u64) {
    let mut detector = FeatureDetector::new(oracle);
    Traversal::top_down().walk(lattice, &mut detector);
    let (skipped, failed) = (detector.skipped(), detector.failed());
    (detector.into_classification(), skipped, failed)
}

fn set(ids: &[u64]) -> PropertySet {
    ids.iter().copied().collect()
}

#[test]
fn implementors_sharing_interface_methods_are_a_realization() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::interface("X").features(&["m1", "m2"]),
        TypeDeclaration::class("A").implements("X").features(&["m1", "m2", "a"]),
        TypeDeclaration::class("B").implements("X").features(&["m1", "m2", "b"]),
    ]);
    let (lattice, classification) = analyzed(&model, PurgeMode::ContextAware);
    let top = lattice.top().expect("top");
    assert!(classification.contains(top), "the top holds X, A and B");
    let tags = only_tags(&classification);
    assert_eq!(tags.len(), 1);
    let tag = &tags[0];
    assert_eq!(tag.kind, PatternKind::InterfaceRealization);
    assert_eq!(tag.extent, Some(Coverage::Full));
    assert_eq!(tag.behavior, Some(Coverage::Full));
    assert_eq!(tag.anchor, model.entity("X"));
    let related: EntitySet = tag.related.iter().copied().collect();
    let expected: EntitySet = ["A", "B"].iter().map(|n| model.entity(n).expect("type")).collect();
    assert_eq!(related, expected);
    assert_eq!(tag.extent_coverage, 1.0);
    assert_eq!(tag.behavior_coverage, 1.0);
    assert_eq!(tag.configuration_coverage, 1.0);
    assert_eq!(tag.label(), "FULL_EXTENT_FULL_BEHAVIOR_INTERFACE_REALIZATION");
    assert_eq!(classification.of_kind(PatternKind::InterfaceRealization), vec![top]);
}

#[test]
fn purging_the_interface_leaves_an_ad_hoc_feature() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::interface("X").features(&["m1", "m2"]),
        TypeDeclaration::class("A").implements("X").features(&["m1", "m2", "a"]),
        TypeDeclaration::class("B").implements("X").features(&["m1", "m2", "b"]),
    ]);
    let (_, classification) = analyzed(&model, PurgeMode::Simple);
    let tags = only_tags(&classification);
    assert_eq!(tags, &[ClassificationTag::ad_hoc()][..]);
    assert_eq!(tags[0].label(), "AD_HOC");
}

#[test]
fn subtypes_of_a_shared_supertype_are_a_redefinition() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::class("Base").features(&["run"]),
        TypeDeclaration::class("Fast").extends("Base").features(&["run", "fast"]),
        TypeDeclaration::class("Slow").extends("Base").features(&["run", "slow"]),
    ]);
    let (_, classification) = analyzed(&model, PurgeMode::ContextAware);
    let tags = only_tags(&classification);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].kind, PatternKind::SubtypeRedefinition);
    assert_eq!(tags[0].anchor, model.entity("Base"));
    assert!(tags[0].is_full_extent() && tags[0].is_full_behavior());
    assert_eq!(tags[0].label(), "FULL_EXTENT_FULL_BEHAVIOR_SUBTYPE_REDEFINITION");
}

#[test]
fn an_unrelated_entity_makes_the_extent_partial() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::class("Base").features(&["run"]),
        TypeDeclaration::class("Fast").extends("Base").features(&["run", "fast"]),
        TypeDeclaration::class("Slow").extends("Base").features(&["run", "slow"]),
        TypeDeclaration::class("Other").features(&["run"]),
    ]);
    let (_, classification) = analyzed(&model, PurgeMode::ContextAware);
    let tags = only_tags(&classification);
    assert_eq!(tags.len(), 1);
    let tag = &tags[0];
    assert_eq!(tag.kind, PatternKind::SubtypeRedefinition);
    assert_eq!(tag.extent, Some(Coverage::Partial), "Other is not a subtype of Base");
    assert_eq!(tag.behavior, Some(Coverage::Full));
    assert_eq!(tag.extent_coverage, 0.75);
    assert_eq!(tag.label(), "PARTIAL_EXTENT_FULL_BEHAVIOR_SUBTYPE_REDEFINITION");
}

#[test]
fn a_shared_field_type_is_an_aggregation() {
    let model = vehicles();
    let (_, classification) = analyzed(&model, PurgeMode::ContextAware);
    let tags = only_tags(&classification);
    assert_eq!(tags.len(), 1);
    let tag = &tags[0];
    assert_eq!(tag.kind, PatternKind::Aggregation);
    assert_eq!(tag.anchor, model.entity("Engine"));
    assert_eq!(tag.related.len(), 2);
    assert_eq!(tag.label(), "FULL_EXTENT_FULL_BEHAVIOR_AGGREGATION");
}

#[test]
fn unrelated_entities_sharing_behavior_are_ad_hoc() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::class("Alpha").features(&["log", "x"]),
        TypeDeclaration::class("Beta").features(&["log", "y"]),
    ]);
    let (_, classification) = analyzed(&model, PurgeMode::ContextAware);
    assert_eq!(classification.of_kind(PatternKind::AdHoc).len(), 1);
    let tags = only_tags(&classification);
    assert_eq!(tags[0].kind, PatternKind::AdHoc);
    assert!(tags[0].anchor.is_none() && tags[0].related.is_empty());
}

#[test]
fn candidates_need_shared_non_empty_intents() {
    let mut lattice = Lattice::new();
    let parent = lattice.insert(Concept::new(set(&[1, 2]), set(&[10]))).expect("insert");
    let child = lattice.insert(Concept::new(set(&[1, 2]), set(&[10, 11]))).expect("insert");
    let single = lattice.insert(Concept::new(set(&[1]), set(&[10, 11, 12]))).expect("insert");
    let empty = lattice.insert(Concept::new(set(&[1, 2, 3]), set(&[]))).expect("insert");
    lattice.link(parent, child).expect("link");
    lattice.link(child, single).expect("link");
    assert!(!is_candidate(&lattice, parent), "the child is shared by as many entities");
    assert!(is_candidate(&lattice, child));
    assert!(!is_candidate(&lattice, single), "one entity is no commonality");
    assert!(!is_candidate(&lattice, empty), "nothing is shared");
}

#[test]
fn an_unresolved_aggregate_narrows_the_extent() {
    let model = vehicles();
    let lattice = LatticeBuilder::new().build(&model.relation()).expect("lattice");
    let boat = model.entity("Boat").expect("Boat");
    let oracle = Unresolvable { model: &model, entity: boat };
    let (classification, skipped, failed) = detected(&lattice, &oracle);
    assert!(skipped > 0, "every query about Boat fails");
    assert_eq!(failed, 0);
    let tags = only_tags(&classification);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].kind, PatternKind::Aggregation);
    assert_eq!(tags[0].anchor, model.entity("Engine"));
    assert_eq!(tags[0].related, vec![model.entity("Car").expect("Car")]);
    assert_eq!(tags[0].label(), "PARTIAL_EXTENT_FULL_BEHAVIOR_AGGREGATION");
}

#[test]
fn an_unresolved_anchor_leaves_the_concept_ad_hoc() {
    let model = vehicles();
    let lattice = LatticeBuilder::new().build(&model.relation()).expect("lattice");
    let engine = model.entity("Engine").expect("Engine");
    let oracle = Unresolvable { model: &model, entity: engine };
    let (classification, skipped, _) = detected(&lattice, &oracle);
    assert!(skipped > 0);
    let tags = only_tags(&classification);
    assert_eq!(tags, &[ClassificationTag::ad_hoc()][..], "no behavior can be computed for Engine");
}

#[test]
fn unresolved_entities_are_passed_over_while_tagging() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::interface("X").features(&["m1", "m2"]),
        TypeDeclaration::class("A").implements("X").features(&["m1", "m2", "a"]),
        TypeDeclaration::class("B").implements("X").features(&["m1", "m2", "b"]),
    ]);
    let mut lattice = LatticeBuilder::new().build(&model.relation()).expect("lattice");
    purge(&mut lattice, &model, PurgeMode::ContextAware);
    let x = model.entity("X").expect("X");
    let a = model.entity("A").expect("A");

    let oracle = Unresolvable { model: &model, entity: x };
    let (classification, skipped, _) = detected(&lattice, &oracle);
    assert!(skipped > 0);
    assert_eq!(only_tags(&classification)[0].kind, PatternKind::AdHoc, "X cannot anchor anything");

    let oracle = Unresolvable { model: &model, entity: a };
    let (classification, skipped, _) = detected(&lattice, &oracle);
    assert!(skipped > 0);
    let tags = only_tags(&classification);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].kind, PatternKind::InterfaceRealization);
    assert!(tags[0].is_full_extent(), "A is still an implementor of X");
    assert_eq!(tags[0].behavior, Some(Coverage::Full), "the behavior of A is left out");
}
