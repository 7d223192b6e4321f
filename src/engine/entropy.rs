use std::fmt;

use alloy::primitives::{U256, keccak256};

use crate::types::BlockContext;

/// Source of the value used to break ties between equally good reserves.
pub trait Entropy: fmt::Debug {
    fn entropy(&self, block: BlockContext) -> U256;
}

/// Hash of the block number and timestamp.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockEntropy;

impl Entropy for BlockEntropy {
    fn entropy(&self, block: BlockContext) -> U256 {
        let mut preimage = [0u8; 16];
        preimage[..8].copy_from_slice(&block.block_number().to_be_bytes());
        preimage[8..].copy_from_slice(&block.block_timestamp().to_be_bytes());
        U256::from_be_bytes(keccak256(preimage).0)
    }
}

/// Same value for every block.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedEntropy(pub U256);

impl Entropy for FixedEntropy {
    fn entropy(&self, _block: BlockContext) -> U256 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_entropy_depends_on_block() {
        let entropy = BlockEntropy;
        let a = entropy.entropy(BlockContext::new(1, 100));
        assert_eq!(a, entropy.entropy(BlockContext::new(1, 100)));
        assert_ne!(a, entropy.entropy(BlockContext::new(2, 100)));
        assert_ne!(a, entropy.entropy(BlockContext::new(1, 101)));
    }

    #[test]
    fn fixed_entropy_ignores_block() {
        let entropy = FixedEntropy(U256::from(7));
        assert_eq!(entropy.entropy(BlockContext::new(1, 1)), U256::from(7));
        assert_eq!(entropy.entropy(BlockContext::new(9, 9)), U256::from(7));
    }
}
