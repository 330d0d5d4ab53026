/// Errors raised while executing a call frame.
///
/// Apart from [`VmError::ExecutionReverted`], every variant consumes all energy handed to the
/// failing frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// The frame ran out of energy.
    #[error("out of energy")]
    OutOfEnergy,
    /// Not enough energy left to pay for the deployed code.
    #[error("contract creation code storage out of energy")]
    CodeStoreOutOfEnergy,
    /// The nested call depth limit was hit.
    #[error("max call depth exceeded")]
    Depth,
    /// The caller cannot afford the value transfer.
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    /// A contract already lives at the target address.
    #[error("contract address collision")]
    ContractAddressCollision,
    /// REVERT was executed. Remaining energy and the revert reason are preserved.
    #[error("execution reverted")]
    ExecutionReverted,
    /// The deployed code is larger than the protocol maximum.
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,
    /// JUMP, JUMPI or JUMPSUB targeted an invalid destination.
    #[error("invalid jump destination")]
    InvalidJump,
    /// A state modifying instruction ran in a read-only frame.
    #[error("write protection")]
    WriteProtection,
    /// RETURNDATACOPY read past the end of the return data.
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
    /// An energy computation overflowed 64 bits.
    #[error("energy uint64 overflow")]
    EnergyUintOverflow,
    /// RETURNSUB with an empty return stack.
    #[error("invalid retsub")]
    InvalidRetsub,
    /// JUMPSUB with a full return stack.
    #[error("return stack limit reached")]
    ReturnStackExceeded,
    /// Execution walked into a BEGINSUB.
    #[error("invalid subroutine entry")]
    InvalidSubroutineEntry,
    /// The opcode is not part of the active instruction set.
    #[error("invalid opcode: opcode {0:#04x} not defined")]
    InvalidOpCode(u8),
    /// The opcode needs more stack items than available.
    #[error("stack underflow ({len} <=> {required})")]
    StackUnderflow {
        /// Items on the stack.
        len: usize,
        /// Items required.
        required: usize,
    },
    /// The opcode would grow the stack past its limit.
    #[error("stack limit reached {len} ({limit})")]
    StackOverflow {
        /// Items on the stack.
        len: usize,
        /// Largest stack size the opcode accepts.
        limit: usize,
    },
    /// A precompiled contract rejected its input.
    #[error("{0}")]
    Precompile(String),
}

impl VmError {
    /// Whether the error keeps the frame's remaining energy.
    pub fn is_revert(&self) -> bool {
        matches!(self, VmError::ExecutionReverted)
    }
}
