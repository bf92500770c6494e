//! Conceptual – discovering ad-hoc features through incremental concept lattices.
//!
//! Conceptual looks for recurring structural commonalities ("features") among a
//! set of entities that are related to a set of properties, e.g. classes and the
//! method signatures they declare. It does so with Formal Concept Analysis:
//! * A [`relation::Relation`] is a set of `(entity, property)` pairs.
//! * A [`lattice::Concept`] is a closed pair `(extent, intent)`: the intent holds
//!   exactly the properties shared by every entity of the extent, and the extent
//!   holds exactly the entities having all of the intent.
//! * A [`lattice::Lattice`] orders concepts by intent inclusion, from the top
//!   (properties shared by everyone) to the bottom (every property).
//!
//! Concepts with more than one independent occurrence are candidate features.
//! Some of them were captured explicitly by the developers (an interface and its
//! implementations, a class and its subclasses, a component and the classes
//! delegating to it). The ones that were not are tagged *ad hoc*, which is where
//! the interesting findings are.
//!
//! ## Modules
//! * [`construct`] – Identities, symbol keepers and id-keyed lookups.
//! * [`relation`] – The entity/property relation.
//! * [`lattice`] – Concepts, the concept arena and its structural operations.
//! * [`traverse`] – Direction-aware visitor walks over the lattice.
//! * [`builder`] – Incremental (Godin-style) lattice construction.
//! * [`hierarchy`] – The [`hierarchy::HierarchyOracle`] answering ancestry and
//!   membership questions, an in-memory [`hierarchy::TypeModel`] implementing it,
//!   and a per-pass cache.
//! * [`purge`] – Removal of entities that only inherit a concept's intent.
//! * [`classify`] – Tagging of candidate concepts with structural patterns.
//! * [`report`] – Text printers and a serializable candidate graph.
//! * [`analysis`] – The pipeline wiring all of the above.
//! * [`settings`] – Configuration of the `conceptual` binary.
//!
//! ## Pipeline
//! The lattice is built once and then purged in place; the classification is
//! computed on the purged lattice and never modifies it. Each stage walks the
//! lattice with a [`traverse::Traversal`], which visits every concept exactly
//! once even though concepts are commonly reachable through several parents.
//!
//! ## Quick Start
//! ```
//! use conceptual::{builder::LatticeBuilder, relation::Relation};
//! let relation = Relation::from_rows(vec![
//!     ("O1", vec!["a", "c", "f", "h"]),
//!     ("O2", vec!["a", "c", "g", "i"]),
//!     ("O4", vec!["b", "c", "f", "h"]),
//! ]);
//! let lattice = LatticeBuilder::new().build(&relation).expect("lattice");
//! lattice.verify(&relation).expect("closed concepts");
//! let cfh = relation.intent_of(&[relation.entity("O1").unwrap(), relation.entity("O4").unwrap()].into_iter().collect());
//! let concept = lattice.find(&cfh).expect("concept");
//! assert_eq!(lattice[concept].extent().len(), 2);
//! ```
//!
//! ## Errors
//! Fallible operations return [`Result`] with a [`ConceptualError`]. Failed
//! hierarchy queries do not abort a pass: the affected entity is skipped and a
//! warning is logged. A broken lattice invariant is reported immediately.

pub mod construct;
pub mod error;
pub mod relation;
pub mod lattice;
pub mod traverse;
pub mod builder;
pub mod hierarchy;
pub mod purge;
pub mod classify;
pub mod report;
pub mod analysis;
pub mod settings;

pub use error::{ConceptualError, Result};
