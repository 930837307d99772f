//! The RAN function chain.
//!
//! Functions are numbered from the antenna upwards: `f0`/`f1` are the
//! low-PHY stages that always stay on the radio unit, `f2` is high-PHY and
//! `f3..f8` are the higher layers (MAC, RLC, PDCP, RRC). Only `f2..f8` run as
//! virtualized network functions and are priced by the model.

use serde::{Deserialize, Serialize};

/// Identifier of one function in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(u8);

impl FunctionId {
    #[inline]
    pub const fn new(value: u8) -> Self {
        FunctionId(value)
    }
    #[inline]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// The fixed ordered chain used by every split configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionChain {
    functions: Vec<FunctionId>,
    virtualized: Vec<FunctionId>,
}

impl FunctionChain {
    /// The standard nine-stage chain `f0..f8` with `f2..f8` virtualized.
    pub fn standard() -> Self {
        Self {
            functions: (0..=8).map(FunctionId::new).collect(),
            virtualized: (2..=8).map(FunctionId::new).collect(),
        }
    }

    /// Every function in chain order.
    pub fn functions(&self) -> &[FunctionId] {
        &self.functions
    }

    /// Functions that are placed, priced and migrated as VNFs.
    pub fn virtualized(&self) -> &[FunctionId] {
        &self.virtualized
    }

    pub fn contains(&self, function: FunctionId) -> bool {
        self.functions.contains(&function)
    }

    pub fn is_virtualized(&self, function: FunctionId) -> bool {
        self.virtualized.contains(&function)
    }
}

impl Default for FunctionChain {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_chain() {
        let chain = FunctionChain::standard();
        assert_eq!(chain.functions().len(), 9);
        assert_eq!(chain.virtualized().len(), 7);
        assert!(!chain.is_virtualized(FunctionId::new(1)));
        assert!(chain.is_virtualized(FunctionId::new(2)));
        assert!(!chain.contains(FunctionId::new(9)));
    }
}
