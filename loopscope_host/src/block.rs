use crate::{Address, Instruction};
use serde::{Deserialize, Serialize};

/// A straight-line run of instructions with a single entry and a single exit
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Address of the first instruction
    pub fn address(&self) -> Address {
        self.instructions.first().map(|i| i.address).unwrap_or_default()
    }

    /// Address one past the end of the last instruction
    pub fn end_address(&self) -> Address {
        self.instructions
            .last()
            .map(Instruction::next_addr)
            .unwrap_or_default()
    }

    pub fn num_instructions(&self) -> usize {
        self.instructions.len()
    }

    /// The instruction that ends this block
    pub fn tail(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    pub fn contains(&self, addr: Address) -> bool {
        (self.address()..self.end_address()).contains(&addr)
    }
}

/// A unit of code the host examines as a whole before it first runs: a
/// sequence of basic blocks entered at the first block's address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeUnit {
    pub blocks: Vec<BasicBlock>,
}

impl CodeUnit {
    pub fn address(&self) -> Address {
        self.blocks.first().map(BasicBlock::address).unwrap_or_default()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.blocks.iter().any(|b| b.contains(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BranchTarget, ControlFlow};

    #[test]
    fn block_bounds() {
        let block = BasicBlock {
            instructions: vec![
                Instruction {
                    address: 0x100,
                    length: 3,
                    flow: ControlFlow::Sequential,
                },
                Instruction {
                    address: 0x103,
                    length: 2,
                    flow: ControlFlow::Branch(BranchTarget::Direct(0x100)),
                },
            ],
        };
        assert!(!block.is_empty());
        assert_eq!(block.address(), 0x100);
        assert_eq!(block.end_address(), 0x105);
        assert_eq!(block.num_instructions(), 2);
        assert_eq!(block.tail().map(|i| i.address), Some(0x103));
        assert!(block.contains(0x104));
        assert!(!block.contains(0x105));

        let unit = CodeUnit {
            blocks: vec![block],
        };
        assert_eq!(unit.address(), 0x100);
        assert!(unit.contains(0x103));
        assert!(!unit.contains(0xff));
    }

    #[test]
    fn empty_block_has_no_extent() {
        let block = BasicBlock {
            instructions: vec![],
        };
        assert!(block.is_empty());
        assert_eq!(block.tail(), None);
        assert!(!block.contains(0));
    }
}
