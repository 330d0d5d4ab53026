use alloy::primitives::{Bytes, U256};

use crate::core::errors::VmError;

use super::{
    super::{core::Cvm, execution::Scope},
    from_address, from_word,
};

/// How many ancestors BLOCKHASH can see.
const BLOCKHASH_WINDOW: u64 = 256;

/// BLOCKHASH - Get the hash of one of the 256 most recent complete blocks
pub fn blockhash(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let number = scope.stack.peek_mut()?;

    let Ok(requested) = u64::try_from(*number) else {
        *number = U256::ZERO;
        return Ok(Bytes::new());
    };

    let upper = cvm.context.block_number;
    let lower = upper.saturating_sub(BLOCKHASH_WINDOW);
    *number = if requested >= lower && requested < upper {
        from_word((cvm.context.get_hash)(requested))
    } else {
        U256::ZERO
    };
    Ok(Bytes::new())
}

/// COINBASE - Get the block's beneficiary address
pub fn coinbase(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(from_address(cvm.context.coinbase));
    Ok(Bytes::new())
}

/// TIMESTAMP - Get the block's timestamp
pub fn timestamp(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(cvm.context.time);
    Ok(Bytes::new())
}

/// NUMBER - Get the block's number
pub fn number(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(cvm.context.block_number));
    Ok(Bytes::new())
}

/// DIFFICULTY - Get the block's difficulty
pub fn difficulty(_: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    scope.stack.push(cvm.context.difficulty);
    Ok(Bytes::new())
}

/// ENERGYLIMIT - Get the block's energy limit
pub fn energy_limit(
    _: &mut u64,
    cvm: &mut Cvm<'_>,
    scope: &mut Scope<'_>,
) -> Result<Bytes, VmError> {
    scope.stack.push(U256::from(cvm.context.energy_limit));
    Ok(Bytes::new())
}
