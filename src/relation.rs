//! The binary relation between entities and properties that seeds a lattice.
//!
//! A [`Relation`] is write-only while it is being populated and is treated as
//! immutable once handed to the [`crate::builder::LatticeBuilder`]. Entities and
//! properties are kept as `u64` identities; optional names are kept by two
//! [`SymbolKeeper`]s so that printers can render them.

use crate::construct::{Entity, EntitySet, Lookup, Property, PropertySet, SymbolKeeper};

#[derive(Debug, Default)]
pub struct Relation {
    entity_keeper: SymbolKeeper,
    property_keeper: SymbolKeeper,
    images: Lookup<Entity>,
    domain: EntitySet,
    properties: PropertySet,
    pairs: u64,
}

impl Relation {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty relation naming its ids through existing keepers.
    pub fn with_keepers(entity_keeper: SymbolKeeper, property_keeper: SymbolKeeper) -> Self {
        Self {
            entity_keeper,
            property_keeper,
            ..Self::default()
        }
    }

    /// Builds a relation from named rows, one `(entity, properties)` per row.
    pub fn from_rows<R, E, I, P>(rows: R) -> Self
    where
        R: IntoIterator<Item = (E, I)>,
        E: AsRef<str>,
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut relation = Self::new();
        for (entity, image) in rows {
            let entity = relation.add_named_entity(entity.as_ref());
            for property in image {
                let (property, _) = relation.property_keeper.keep(property.as_ref());
                relation.add_pair(entity, property);
            }
        }
        relation
    }

    /// Idempotent; returns false when the pair was already present.
    pub fn add_pair(&mut self, entity: Entity, property: Property) -> bool {
        self.entity_keeper.retain(entity);
        self.property_keeper.retain(property);
        self.domain.insert(entity);
        self.properties.insert(property);
        let added = self.images.insert(entity, property);
        if added {
            self.pairs += 1;
        }
        added
    }

    pub fn add_named_pair(&mut self, entity: &str, property: &str) -> (Entity, Property) {
        let (entity, _) = self.entity_keeper.keep(entity);
        let (property, _) = self.property_keeper.keep(property);
        self.add_pair(entity, property);
        (entity, property)
    }

    /// Adds an entity to the domain without relating it to anything.
    pub fn add_entity(&mut self, entity: Entity) {
        self.entity_keeper.retain(entity);
        self.domain.insert(entity);
        self.images.touch(entity);
    }

    pub fn add_named_entity(&mut self, entity: &str) -> Entity {
        let (entity, _) = self.entity_keeper.keep(entity);
        self.domain.insert(entity);
        self.images.touch(entity);
        entity
    }

    pub fn add_named_property(&mut self, property: &str) -> Property {
        self.property_keeper.keep(property).0
    }

    pub fn domain(&self) -> &EntitySet {
        &self.domain
    }

    pub fn image(&self, entity: Entity) -> Option<&PropertySet> {
        self.images.lookup(&entity)
    }

    pub fn all_properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Properties shared by every entity of the domain, empty for an empty domain.
    pub fn common_properties(&self) -> PropertySet {
        let mut entities = self.domain.iter();
        let mut common = match entities.next().and_then(|e| self.image(e)) {
            Some(image) => image.clone(),
            None => return PropertySet::new(),
        };
        for entity in entities {
            match self.image(entity) {
                Some(image) => common &= image,
                None => common.clear(),
            }
        }
        common
    }

    /// `{e ∈ domain | image(e) ⊇ intent}`
    pub fn extent_of(&self, intent: &PropertySet) -> EntitySet {
        self.domain
            .iter()
            .filter(|e| self.image(*e).is_some_and(|image| intent.is_subset(image)))
            .collect()
    }

    /// `⋂ image(e)` over the entities; every property when there are none.
    pub fn intent_of(&self, extent: &EntitySet) -> PropertySet {
        let mut intent = self.properties.clone();
        for entity in extent.iter() {
            match self.image(entity) {
                Some(image) => intent &= image,
                None => intent.clear(),
            }
        }
        intent
    }

    /// Rows in ascending entity order.
    pub fn rows(&self) -> impl Iterator<Item = (Entity, PropertySet)> + '_ {
        self.domain
            .iter()
            .map(|e| (e, self.image(e).cloned().unwrap_or_default()))
    }

    pub fn entity(&self, name: &str) -> Option<Entity> {
        self.entity_keeper.id(name)
    }
    pub fn property(&self, name: &str) -> Option<Property> {
        self.property_keeper.id(name)
    }
    pub fn entity_keeper(&self) -> &SymbolKeeper {
        &self.entity_keeper
    }
    pub fn property_keeper(&self) -> &SymbolKeeper {
        &self.property_keeper
    }
    pub fn entity_label(&self, entity: Entity) -> String {
        self.entity_keeper.label(entity)
    }
    pub fn property_label(&self, property: Property) -> String {
        self.property_keeper.label(property)
    }

    /// Number of distinct pairs.
    pub fn len(&self) -> u64 {
        self.pairs
    }
    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }
}
