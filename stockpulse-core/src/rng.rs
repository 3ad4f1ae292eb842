//! Deterministic per-company RNG derivation.
//!
//! A master seed expands into one sub-seed per company id. Derivation is
//! BLAKE3-based and independent of call order, so a simulated company
//! produces the same price path no matter when or in what order it is first
//! requested.

use crate::domain::CompanyId;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Derive the sub-seed for a company.
    pub fn sub_seed(&self, company: &CompanyId) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(company.as_str().as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, company: &CompanyId) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(company))
    }
}
