// used to keep the one-to-one mapping between names and their assigned identities
use bimap::BiMap;

// keepers and lookups use HashMap with a fast, deterministic hasher
use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::hash::Hash;
use seahash::SeaHasher;

// sets of identities are kept as compressed bitmaps
use roaring::RoaringTreemap;

// ------------- Identities -------------
// Entities (the objects under analysis, e.g. classes) and properties (the
// attributes they are related to, e.g. method signatures) are both opaque
// integers. Names live in keepers, never in the sets themselves.
pub type Entity = u64;
pub type Property = u64;

pub type EntitySet = RoaringTreemap;
pub type PropertySet = RoaringTreemap;

pub type IdHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: u64 = 0;

#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    lower_bound: u64,
    retained: RoaringTreemap,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: GENESIS,
            retained: RoaringTreemap::new(),
        }
    }
    // Identities handed in from the outside (e.g. a caller numbering its own
    // entities) must be retained so that generated ones never collide with them.
    pub fn retain(&mut self, id: u64) {
        self.retained.insert(id);
        if id > self.lower_bound {
            self.lower_bound = id;
        }
    }
    pub fn check(&self, id: u64) -> Option<u64> {
        self.retained.contains(id).then_some(id)
    }
    pub fn generate(&mut self) -> u64 {
        self.lower_bound += 1;
        self.retained.insert(self.lower_bound);
        self.lower_bound
    }
    pub fn len(&self) -> u64 {
        self.retained.len()
    }
    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }
}

// ------------- Symbols -------------
#[derive(Debug, Default, Clone)]
pub struct SymbolKeeper {
    kept: BiMap<String, u64>,
    generator: IdGenerator,
}
impl SymbolKeeper {
    pub fn new() -> Self {
        Self {
            kept: BiMap::new(),
            generator: IdGenerator::new(),
        }
    }
    /// Returns the id kept for `name`, and whether it was previously kept.
    pub fn keep(&mut self, name: &str) -> (u64, bool) {
        if let Some(id) = self.kept.get_by_left(name) {
            return (*id, true);
        }
        let id = self.generator.generate();
        self.kept.insert(name.to_owned(), id);
        (id, false)
    }
    /// Registers an id without a name (ids supplied directly by a caller).
    pub fn retain(&mut self, id: u64) {
        self.generator.retain(id);
    }
    pub fn id(&self, name: &str) -> Option<u64> {
        self.kept.get_by_left(name).copied()
    }
    pub fn name(&self, id: u64) -> Option<&str> {
        self.kept.get_by_right(&id).map(String::as_str)
    }
    /// The name of `id`, or `#id` when it was never named.
    pub fn label(&self, id: u64) -> String {
        match self.name(id) {
            Some(name) => name.to_owned(),
            None => format!("#{id}"),
        }
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Lookups -------------
#[derive(Debug, Clone)]
pub struct Lookup<K, H = IdHasher> {
    index: HashMap<K, RoaringTreemap, H>,
}
impl<K: Eq + Hash, H: std::hash::BuildHasher + Default> Lookup<K, H> {
    pub fn new() -> Self {
        Self {
            index: HashMap::<K, RoaringTreemap, H>::default(),
        }
    }
    /// Returns false when the value was already indexed under the key.
    pub fn insert(&mut self, key: K, value: u64) -> bool {
        self.index.entry(key).or_default().insert(value)
    }
    /// Makes sure the key is present, even with nothing indexed under it.
    pub fn touch(&mut self, key: K) {
        self.index.entry(key).or_default();
    }
    pub fn lookup(&self, key: &K) -> Option<&RoaringTreemap> {
        self.index.get(key)
    }
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.index.keys()
    }
    pub fn len(&self) -> usize {
        self.index.len()
    }
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
impl<K: Eq + Hash, H: std::hash::BuildHasher + Default> Default for Lookup<K, H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted, comma separated labels of a set, as used by the printers.
pub fn labels(set: &RoaringTreemap, keeper: &SymbolKeeper) -> String {
    let mut printed: Vec<String> = set.iter().map(|id| keeper.label(id)).collect();
    printed.sort_unstable();
    format!("[{}]", printed.join(", "))
}
