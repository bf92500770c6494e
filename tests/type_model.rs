use conceptual::construct::EntitySet;
use conceptual::error::ConceptualError;
use conceptual::hierarchy::{CachedOracle, HierarchyOracle, TypeDeclaration, TypeKind, TypeModel};

fn shapes() -> TypeModel {
    TypeModel::from_declarations(vec![
        TypeDeclaration::interface("Shape").features(&["area()"]),
        TypeDeclaration::interface("Polygon").extends("Shape").features(&["area()", "corners()"]),
        TypeDeclaration::class("Rectangle").implements("Polygon").features(&["area()", "corners()", "width()"]),
        TypeDeclaration::class("Square").extends("Rectangle").features(&["side()"]).field("Point"),
        TypeDeclaration::class("Point").features(&["x()", "y()"]).field("int"),
    ])
}

fn ids(model: &TypeModel, names: &[&str]) -> EntitySet {
    names.iter().map(|n| model.entity(n).expect("declared type")).collect()
}

#[test]
fn ancestry_is_transitive() {
    let model = shapes();
    let square = model.entity("Square").expect("Square");
    let ancestors = model.ancestors(square).expect("ancestors");
    assert_eq!(ancestors, ids(&model, &["Rectangle", "Polygon", "Shape"]));
    let shape = model.entity("Shape").expect("Shape");
    assert!(model.ancestors(shape).expect("ancestors").is_empty());
    assert_eq!(model.subtypes(shape).expect("subtypes"), ids(&model, &["Polygon", "Rectangle", "Square"]));
}

#[test]
fn implementors_are_classes_below_an_interface() {
    let model = shapes();
    let shape = model.entity("Shape").expect("Shape");
    assert!(model.is_interface_like(shape).expect("kind"));
    assert_eq!(model.kind(shape), Some(TypeKind::Interface));
    assert_eq!(
        model.implementors(shape).expect("implementors"),
        ids(&model, &["Rectangle", "Square"]),
        "sub-interfaces are not implementors, subclasses of implementors are"
    );
}

#[test]
fn cumulative_features_include_subtypes() {
    let model = shapes();
    let rectangle = model.entity("Rectangle").expect("Rectangle");
    let local = model.local_feature_set(rectangle).expect("local");
    let cumulative = model.cumulative_feature_set(rectangle).expect("cumulative");
    assert_eq!(local.len(), 3);
    assert_eq!(cumulative.len(), 4, "side() comes from Square");
    assert!(local.is_subset(&cumulative));

    let relation = model.relation();
    assert_eq!(relation.domain(), model.types());
    assert_eq!(relation.image(rectangle), Some(&cumulative), "images are cumulative");
    assert_eq!(relation.entity_label(rectangle), "Rectangle");
}

#[test]
fn fields_resolve_to_declared_types() {
    let model = shapes();
    let square = model.entity("Square").expect("Square");
    let point = model.entity("Point").expect("Point");
    assert_eq!(model.member_components(square).expect("members"), ids(&model, &["Point"]));
    assert!(
        model.member_components(point).expect("members").is_empty(),
        "int is outside the model and skipped"
    );
}

#[test]
fn unknown_and_duplicate_types_fail() {
    let model = TypeModel::from_declarations(vec![
        TypeDeclaration::class("Twice").features(&["a()"]),
        TypeDeclaration::class("Twice").features(&["b()"]),
        TypeDeclaration::class("User").field("Twice"),
    ]);
    let twice = model.entity("Twice").expect("Twice");
    let user = model.entity("User").expect("User");
    assert!(matches!(model.ancestors(4242), Err(ConceptualError::Unresolved { entity: 4242 })));
    assert!(matches!(
        model.local_feature_set(twice),
        Err(ConceptualError::Ambiguous { candidates: 2, .. })
    ));
    let error = model.subtypes(twice).expect_err("ambiguous");
    assert!(error.is_skippable());
    assert!(model.member_components(user).expect("members").is_empty(), "ambiguous field is skipped");
}

#[test]
fn model_reads_json() {
    let json = r#"{ "types": [
        { "name": "Shape", "kind": "interface", "features": ["area()"] },
        { "name": "Square", "implements": ["Shape"], "features": ["area()", "side()"], "fields": ["Point"] },
        { "name": "Point", "features": ["x()", "y()"] }
    ] }"#;
    let model = TypeModel::from_json(json).expect("valid model");
    assert_eq!(model.types().len(), 3);
    let square = model.entity("Square").expect("Square");
    assert_eq!(model.kind(square), Some(TypeKind::Class), "kind defaults to class");
    assert_eq!(model.ancestors(square).expect("ancestors"), ids(&model, &["Shape"]));

    let broken = TypeModel::from_json("{ \"types\": [ { \"kind\": \"class\" } ] }");
    assert!(matches!(broken, Err(ConceptualError::Input(_))), "name is required");
}

#[test]
fn cache_remembers_answers_and_failures() {
    let model = shapes();
    let square = model.entity("Square").expect("Square");
    let cached = CachedOracle::new(&model);
    let first = cached.ancestors(square).expect("ancestors");
    let second = cached.ancestors(square).expect("ancestors");
    assert_eq!(first, second);
    assert!(cached.ancestors(4242).is_err());
    assert!(cached.ancestors(4242).is_err());
    assert_eq!(cached.hits(), 2, "the second query of each entity is served from the cache");
    assert!(cached.cumulative_feature_set(square).is_ok());
    assert_eq!(cached.hits(), 2, "queries are cached per kind");
}
