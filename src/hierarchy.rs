//! Structural knowledge about the entities of a relation.
//!
//! The purge and classification passes do not know where entities come from;
//! they ask a [`HierarchyOracle`] about ancestry, realization and membership.
//! A failed query (an entity the oracle cannot resolve, or resolves in more than
//! one way) is reported as an error that the passes skip over.
//!
//! [`TypeModel`] is an in-memory oracle built from type declarations, e.g. as
//! read from a JSON file:
//!
//! ```json
//! { "types": [
//!     { "name": "Shape", "kind": "interface", "features": ["area()"] },
//!     { "name": "Square", "implements": ["Shape"], "features": ["area()", "side()"],
//!       "fields": ["Point"] },
//!     { "name": "Point", "features": ["x()", "y()"] }
//! ] }
//! ```
//!
//! Its [`TypeModel::relation`] relates every type to its cumulative features, i.e.
//! the features it declares together with those declared by any of its
//! subtypes. That is the relation the lattice is usually built from.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::construct::{Entity, EntitySet, IdHasher, Lookup, PropertySet, SymbolKeeper};
use crate::error::{ConceptualError, Result};
use crate::relation::Relation;

pub trait HierarchyOracle {
    /// Every direct and indirect supertype.
    fn ancestors(&self, entity: Entity) -> Result<EntitySet>;
    fn is_interface_like(&self, entity: Entity) -> Result<bool>;
    /// Direct and transitive realizations of an interface-like entity.
    fn implementors(&self, entity: Entity) -> Result<EntitySet>;
    /// Every direct and indirect subtype.
    fn subtypes(&self, entity: Entity) -> Result<EntitySet>;
    /// Properties the entity declares itself.
    fn local_feature_set(&self, entity: Entity) -> Result<PropertySet>;
    /// Local properties together with those of every subtype.
    fn cumulative_feature_set(&self, entity: Entity) -> Result<PropertySet>;
    /// Entities used as the types of the entity's fields.
    fn member_components(&self, entity: Entity) -> Result<EntitySet>;
}

impl<O: HierarchyOracle + ?Sized> HierarchyOracle for &O {
    fn ancestors(&self, entity: Entity) -> Result<EntitySet> {
        (**self).ancestors(entity)
    }
    fn is_interface_like(&self, entity: Entity) -> Result<bool> {
        (**self).is_interface_like(entity)
    }
    fn implementors(&self, entity: Entity) -> Result<EntitySet> {
        (**self).implementors(entity)
    }
    fn subtypes(&self, entity: Entity) -> Result<EntitySet> {
        (**self).subtypes(entity)
    }
    fn local_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        (**self).local_feature_set(entity)
    }
    fn cumulative_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        (**self).cumulative_feature_set(entity)
    }
    fn member_components(&self, entity: Entity) -> Result<EntitySet> {
        (**self).member_components(entity)
    }
}

// ------------- Type declarations -------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    /// Type names of the fields.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl TypeDeclaration {
    pub fn class(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }
    pub fn interface(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: TypeKind::Interface,
            ..Self::default()
        }
    }
    pub fn extends(mut self, supertype: &str) -> Self {
        self.extends.push(supertype.to_owned());
        self
    }
    pub fn implements(mut self, interface: &str) -> Self {
        self.implements.push(interface.to_owned());
        self
    }
    pub fn features(mut self, features: &[&str]) -> Self {
        self.features.extend(features.iter().map(|f| f.to_string()));
        self
    }
    pub fn field(mut self, type_name: &str) -> Self {
        self.fields.push(type_name.to_owned());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    types: Vec<TypeDeclaration>,
}

// ------------- Type model -------------
#[derive(Debug, Default)]
pub struct TypeModel {
    type_keeper: SymbolKeeper,
    feature_keeper: SymbolKeeper,
    types: EntitySet,
    kinds: HashMap<Entity, TypeKind, IdHasher>,
    declared: HashMap<Entity, usize, IdHasher>,
    supertypes: Lookup<Entity>,
    direct_subtypes: Lookup<Entity>,
    local: Lookup<Entity>,
    components: Lookup<Entity>,
}

impl TypeModel {
    /// Builds the model. A name declared more than once keeps its first
    /// declaration, and queries about it fail as ambiguous.
    pub fn from_declarations<I: IntoIterator<Item = TypeDeclaration>>(declarations: I) -> Self {
        let mut model = Self::default();
        let mut kept = Vec::new();
        for declaration in declarations {
            let (entity, previously) = model.type_keeper.keep(&declaration.name);
            *model.declared.entry(entity).or_insert(0) += 1;
            if previously {
                warn!(name = %declaration.name, "type declared more than once");
                continue;
            }
            model.types.insert(entity);
            model.kinds.insert(entity, declaration.kind);
            model.local.touch(entity);
            for feature in &declaration.features {
                let (feature, _) = model.feature_keeper.keep(feature);
                model.local.insert(entity, feature);
            }
            kept.push((entity, declaration));
        }
        // supertypes and fields may name types declared later
        for (entity, declaration) in kept {
            for supertype in declaration.extends.iter().chain(declaration.implements.iter()) {
                match model.type_keeper.id(supertype) {
                    Some(supertype) if supertype != entity => {
                        model.supertypes.insert(entity, supertype);
                        model.direct_subtypes.insert(supertype, entity);
                    }
                    Some(_) => warn!(name = %declaration.name, "type declared as its own supertype"),
                    None => debug!(name = %declaration.name, supertype = %supertype, "supertype outside the model"),
                }
            }
            model.components.touch(entity);
            for field in &declaration.fields {
                match model.type_keeper.id(field) {
                    Some(component) if model.declared.get(&component).copied().unwrap_or(0) > 1 => {
                        warn!(name = %declaration.name, field = %field, "ambiguous field type skipped")
                    }
                    Some(component) => {
                        model.components.insert(entity, component);
                    }
                    None => debug!(name = %declaration.name, field = %field, "field type outside the model"),
                }
            }
        }
        model
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(json)?;
        Ok(Self::from_declarations(file.types))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The reverse-inheritance relation: every type related to its cumulative features.
    pub fn relation(&self) -> Relation {
        let mut relation = Relation::with_keepers(self.type_keeper.clone(), self.feature_keeper.clone());
        for entity in self.types.iter() {
            relation.add_entity(entity);
            for feature in self.cumulative(entity).iter() {
                relation.add_pair(entity, feature);
            }
        }
        relation
    }

    pub fn types(&self) -> &EntitySet {
        &self.types
    }
    pub fn entity(&self, name: &str) -> Option<Entity> {
        self.type_keeper.id(name)
    }
    pub fn feature(&self, name: &str) -> Option<u64> {
        self.feature_keeper.id(name)
    }
    pub fn kind(&self, entity: Entity) -> Option<TypeKind> {
        self.kinds.get(&entity).copied()
    }
    pub fn type_keeper(&self) -> &SymbolKeeper {
        &self.type_keeper
    }
    pub fn feature_keeper(&self) -> &SymbolKeeper {
        &self.feature_keeper
    }

    fn check(&self, entity: Entity) -> Result<()> {
        match self.declared.get(&entity).copied() {
            None | Some(0) => Err(ConceptualError::Unresolved { entity }),
            Some(1) => Ok(()),
            Some(candidates) => Err(ConceptualError::Ambiguous { entity, candidates }),
        }
    }

    fn local_of(&self, entity: Entity) -> PropertySet {
        self.local.lookup(&entity).cloned().unwrap_or_default()
    }

    fn cumulative(&self, entity: Entity) -> PropertySet {
        let mut features = self.local_of(entity);
        for subtype in closure(&self.direct_subtypes, entity).iter() {
            if let Some(local) = self.local.lookup(&subtype) {
                features |= local;
            }
        }
        features
    }
}

/// Everything reachable from `entity` along `edges`, excluding `entity` itself.
fn closure(edges: &Lookup<Entity>, entity: Entity) -> EntitySet {
    let mut reached = EntitySet::new();
    let mut pending = vec![entity];
    while let Some(next) = pending.pop() {
        if let Some(step) = edges.lookup(&next) {
            for other in step.iter() {
                if other != entity && reached.insert(other) {
                    pending.push(other);
                }
            }
        }
    }
    reached
}

impl HierarchyOracle for TypeModel {
    fn ancestors(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        Ok(closure(&self.supertypes, entity))
    }
    fn is_interface_like(&self, entity: Entity) -> Result<bool> {
        self.check(entity)?;
        Ok(self.kind(entity) == Some(TypeKind::Interface))
    }
    fn implementors(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        Ok(closure(&self.direct_subtypes, entity)
            .iter()
            .filter(|subtype| self.kind(*subtype) == Some(TypeKind::Class))
            .collect())
    }
    fn subtypes(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        Ok(closure(&self.direct_subtypes, entity))
    }
    fn local_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        self.check(entity)?;
        Ok(self.local_of(entity))
    }
    fn cumulative_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        self.check(entity)?;
        Ok(self.cumulative(entity))
    }
    fn member_components(&self, entity: Entity) -> Result<EntitySet> {
        self.check(entity)?;
        Ok(self.components.lookup(&entity).cloned().unwrap_or_default())
    }
}

// ------------- Caching -------------
type Memo<T> = RefCell<HashMap<Entity, Result<T>, IdHasher>>;

fn memo<T: Clone>(cache: &Memo<T>, entity: Entity, hits: &Cell<u64>, query: impl FnOnce() -> Result<T>) -> Result<T> {
    if let Some(answer) = cache.borrow().get(&entity) {
        hits.set(hits.get() + 1);
        return answer.clone();
    }
    let answer = query();
    cache.borrow_mut().insert(entity, answer.clone());
    answer
}

/// Remembers every answer of the wrapped oracle, failures included, for as
/// long as the wrapper lives. Meant to span one purge or classification pass.
#[derive(Debug)]
pub struct CachedOracle<O> {
    inner: O,
    hits: Cell<u64>,
    ancestors: Memo<EntitySet>,
    interface_like: Memo<bool>,
    implementors: Memo<EntitySet>,
    subtypes: Memo<EntitySet>,
    local: Memo<PropertySet>,
    cumulative: Memo<PropertySet>,
    components: Memo<EntitySet>,
}

impl<O: HierarchyOracle> CachedOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            hits: Cell::new(0),
            ancestors: RefCell::default(),
            interface_like: RefCell::default(),
            implementors: RefCell::default(),
            subtypes: RefCell::default(),
            local: RefCell::default(),
            cumulative: RefCell::default(),
            components: RefCell::default(),
        }
    }
    /// Queries answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.get()
    }
    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: HierarchyOracle> HierarchyOracle for CachedOracle<O> {
    fn ancestors(&self, entity: Entity) -> Result<EntitySet> {
        memo(&self.ancestors, entity, &self.hits, || self.inner.ancestors(entity))
    }
    fn is_interface_like(&self, entity: Entity) -> Result<bool> {
        memo(&self.interface_like, entity, &self.hits, || self.inner.is_interface_like(entity))
    }
    fn implementors(&self, entity: Entity) -> Result<EntitySet> {
        memo(&self.implementors, entity, &self.hits, || self.inner.implementors(entity))
    }
    fn subtypes(&self, entity: Entity) -> Result<EntitySet> {
        memo(&self.subtypes, entity, &self.hits, || self.inner.subtypes(entity))
    }
    fn local_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        memo(&self.local, entity, &self.hits, || self.inner.local_feature_set(entity))
    }
    fn cumulative_feature_set(&self, entity: Entity) -> Result<PropertySet> {
        memo(&self.cumulative, entity, &self.hits, || self.inner.cumulative_feature_set(entity))
    }
    fn member_components(&self, entity: Entity) -> Result<EntitySet> {
        memo(&self.components, entity, &self.hits, || self.inner.member_components(entity))
    }
}
