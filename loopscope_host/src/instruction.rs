use crate::Address;
use serde::{Deserialize, Serialize};

/// Where a control-flow instruction sends execution
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchTarget {
    /// The destination is encoded in the instruction and known at discovery time
    Direct(Address),
    /// The destination is only known once the instruction executes
    Indirect,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlFlow {
    /// Falls through to the next instruction
    #[default]
    Sequential,
    /// A jump, conditional or not
    Branch(BranchTarget),
    Call(BranchTarget),
    Return,
}

/// A single decoded instruction, as reported by the host
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// The address this instruction was read from
    pub address: Address,
    /// The number of bytes taken up by the encoding of this instruction
    pub length: usize,
    #[serde(default)]
    pub flow: ControlFlow,
}

impl Instruction {
    /// The address just past this instruction, saturating at the top of the
    /// address space
    pub fn next_addr(&self) -> Address {
        self.checked_next_addr().unwrap_or(Address::MAX)
    }

    pub fn checked_next_addr(&self) -> Option<Address> {
        self.address.checked_add(self.length as u64)
    }

    /// Calls and returns are not branches
    pub fn is_branch(&self) -> bool {
        matches!(self.flow, ControlFlow::Branch(_))
    }

    /// The statically resolvable target of this instruction, if it is a direct branch
    pub fn direct_branch_target(&self) -> Option<Address> {
        match self.flow {
            ControlFlow::Branch(BranchTarget::Direct(target)) => Some(target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(address: Address, flow: ControlFlow) -> Instruction {
        Instruction {
            address,
            length: 2,
            flow,
        }
    }

    #[test]
    fn calls_are_not_branches() {
        let call = ins(0x10, ControlFlow::Call(BranchTarget::Direct(0x4)));
        assert!(!call.is_branch());
        assert_eq!(call.direct_branch_target(), None);
    }

    #[test]
    fn indirect_branch_has_no_static_target() {
        let jmp = ins(0x10, ControlFlow::Branch(BranchTarget::Indirect));
        assert!(jmp.is_branch());
        assert_eq!(jmp.direct_branch_target(), None);
        let jmp = ins(0x10, ControlFlow::Branch(BranchTarget::Direct(0x8)));
        assert_eq!(jmp.direct_branch_target(), Some(0x8));
        assert_eq!(jmp.next_addr(), 0x12);
    }

    #[test]
    fn next_addr_saturates_at_top_of_address_space() {
        let last = Instruction {
            address: Address::MAX - 1,
            length: 4,
            flow: ControlFlow::Sequential,
        };
        assert_eq!(last.checked_next_addr(), None);
        assert_eq!(last.next_addr(), Address::MAX);
    }

    #[test]
    fn flow_deserializes_from_recording_syntax() {
        let i: Instruction = serde_json::from_str(
            r#"{"address": 32, "length": 4, "flow": {"branch": {"direct": 16}}}"#,
        )
        .unwrap();
        assert_eq!(i.direct_branch_target(), Some(16));
        let i: Instruction = serde_json::from_str(r#"{"address": 32, "length": 4}"#).unwrap();
        assert_eq!(i.flow, ControlFlow::Sequential);
    }
}
