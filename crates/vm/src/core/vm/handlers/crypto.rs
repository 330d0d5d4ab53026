use alloy::primitives::{keccak256, Bytes};

use crate::core::errors::VmError;

use super::{
    super::{core::Cvm, execution::Scope},
    from_word, low_u64,
};

/// SHA3 - Compute the Keccak-256 hash of a memory region
pub fn sha3(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let offset = scope.stack.pop()?;
    let size = scope.stack.peek_mut()?;

    let data = scope.memory.get_ptr(low_u64(offset), low_u64(*size));
    let hash = keccak256(data);

    if cvm.config.enable_preimage_recording {
        cvm.state.add_preimage(hash, Bytes::copy_from_slice(data));
    }

    *size = from_word(hash);
    Ok(Bytes::new())
}
