use conceptual::analysis::Analysis;
use conceptual::builder::LatticeBuilder;
use conceptual::classify::PatternKind;
use conceptual::hierarchy::{TypeDeclaration, TypeModel};
use conceptual::lattice::ConceptId;
use conceptual::purge::PurgeMode;

const SHAPES: &str = r#"{ "types": [
    { "name": "Shape", "kind": "interface", "features": ["area()"] },
    { "name": "Circle", "implements": ["Shape"], "features": ["area()", "radius()"] },
    { "name": "Square", "implements": ["Shape"], "features": ["area()", "side()"] }
] }"#;

#[test]
fn shapes_realize_their_interface() {
    let model = TypeModel::from_json(SHAPES).expect("model");
    let relation = model.relation();
    let analysis = Analysis::run(&relation, &model, PurgeMode::ContextAware).expect("analysis");

    let built = LatticeBuilder::new().build(&relation).expect("lattice");
    assert_eq!(analysis.fingerprint(), built.fingerprint(), "the fingerprint is taken before purging");
    assert_eq!(analysis.removed(), 2, "Shape leaves the Circle and Square concepts");
    assert_eq!(analysis.classification().len(), 1);
    assert_eq!(analysis.classification().of_kind(PatternKind::InterfaceRealization).len(), 1);

    let printed = analysis.print_candidates(&relation);
    assert!(
        printed.contains("FEATURE TYPE: FULL_EXTENT_FULL_BEHAVIOR_INTERFACE_REALIZATION; ANCHOR: [Shape]"),
        "{}",
        printed
    );
    assert!(printed.starts_with("0[[Circle, Shape, Square],[area()]]"), "{}", printed);

    let json = analysis.candidate_graph(&relation).to_json().expect("json");
    assert!(json.contains("\"FULL_EXTENT_FULL_BEHAVIOR_INTERFACE_REALIZATION\""), "{}", json);
    assert!(json.contains("\"Shape\""));
}

#[test]
fn candidate_graph_connects_nearest_candidates() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::class("P").features(&["a", "b"]),
        TypeDeclaration::class("Q").features(&["a", "b", "c"]),
        TypeDeclaration::class("R").features(&["a", "b", "c"]),
        TypeDeclaration::class("S").features(&["a", "d"]),
    ]);
    let relation = model.relation();
    let analysis = Analysis::run(&relation, &model, PurgeMode::None).expect("analysis");
    assert_eq!(analysis.removed(), 0);

    let graph = analysis.candidate_graph(&relation);
    assert_eq!(graph.nodes.len(), 3, "{{a}}, {{a,b}} and {{a,b,c}}");
    assert!(graph.nodes.iter().all(|n| n.tags.iter().all(|t| t.label == "AD_HOC")));
    assert_eq!(graph.connections.len(), 2, "a chain, not a triangle");

    let intent_of = |id: ConceptId| {
        graph
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.intent.join(","))
            .expect("connected nodes are candidates")
    };
    let mut pairs: Vec<(String, String)> =
        graph.connections.iter().map(|c| (intent_of(c.from), intent_of(c.to))).collect();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("a".to_string(), "a,b".to_string()),
            ("a,b".to_string(), "a,b,c".to_string()),
        ]
    );
}
