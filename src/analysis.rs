//! The whole pipeline: relation → lattice → purged extents → classification.

use std::time::Instant;

use tracing::info;

use crate::builder::LatticeBuilder;
use crate::classify::{classify, Classification};
use crate::error::Result;
use crate::hierarchy::{CachedOracle, HierarchyOracle};
use crate::lattice::Lattice;
use crate::purge::{purge, PurgeMode};
use crate::relation::Relation;
use crate::report::{print_candidates, CandidateGraph, NodeIds};

#[derive(Debug)]
pub struct Analysis {
    lattice: Lattice,
    classification: Classification,
    fingerprint: String,
    removed: u64,
}

impl Analysis {
    /// Builds the lattice of `relation`, purges it with `mode` and classifies it.
    /// Each pass queries the oracle through its own cache.
    pub fn run<O: HierarchyOracle + ?Sized>(relation: &Relation, oracle: &O, mode: PurgeMode) -> Result<Self> {
        let started = Instant::now();
        let mut lattice = LatticeBuilder::new().build(relation)?;
        let fingerprint = lattice.fingerprint();
        let removed = purge(&mut lattice, &CachedOracle::new(oracle), mode);
        let classification = classify(&lattice, &CachedOracle::new(oracle));
        info!(
            ms = started.elapsed().as_secs_f64() * 1000.0,
            concepts = lattice.len(),
            candidates = classification.len(),
            %fingerprint,
            "analysis complete"
        );
        Ok(Self {
            lattice,
            classification,
            fingerprint,
            removed,
        })
    }

    /// The purged lattice.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }
    pub fn classification(&self) -> &Classification {
        &self.classification
    }
    /// Fingerprint of the lattice as built, before purging.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
    /// Entities removed from extents by the purge.
    pub fn removed(&self) -> u64 {
        self.removed
    }

    pub fn candidate_graph(&self, relation: &Relation) -> CandidateGraph {
        CandidateGraph::new(&self.lattice, relation, &self.classification)
    }
    pub fn print_candidates(&self, relation: &Relation) -> String {
        print_candidates(&self.lattice, relation, &self.classification, &mut NodeIds::new())
    }
}
