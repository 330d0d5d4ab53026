use alloy::primitives::Bytes;

use crate::core::{errors::VmError, log::Log, opcodes::LOG0};

use super::{
    super::{core::Cvm, execution::Scope},
    low_u64, to_word,
};

/// LOG0-LOG4 - Append log record with 0-4 topics
pub fn log(pc: &mut u64, cvm: &mut Cvm<'_>, scope: &mut Scope<'_>) -> Result<Bytes, VmError> {
    let topic_count = (scope.contract.get_op(*pc) - LOG0) as usize;

    let offset = scope.stack.pop()?;
    let size = scope.stack.pop()?;
    let topics = (0..topic_count)
        .map(|_| scope.stack.pop().map(to_word))
        .collect::<Result<Vec<_>, _>>()?;

    let data = scope.memory.get_copy(low_u64(offset), low_u64(size));
    cvm.state.add_log(Log::new(
        scope.contract.address(),
        topics,
        &data,
        cvm.context.block_number,
    ));
    Ok(Bytes::new())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256, U256};

    use super::*;
    use crate::core::{
        state::{BlockState, MemoryState},
        vm::handlers::test_utils,
    };

    #[test]
    fn test_log2_records_topics_in_order() {
        let mut state = MemoryState::new();
        state.prepare(B256::repeat_byte(0x77), B256::ZERO, 0);
        {
            let mut cvm = test_utils::cvm(&mut state);
            let mut contract = test_utils::contract(0);
            // LOG2
            contract.code = Bytes::from_static(&[0xa2]);

            let items = [U256::ZERO, U256::from(2), U256::from(1), U256::from(2)];
            let mut scope = test_utils::scope(&mut contract, &items);
            scope.memory.resize(32);
            scope.memory.set(0, 2, &[0xbe, 0xef]);
            log(&mut 0, &mut cvm, &mut scope).expect("log failed");
        }

        let logs = state.logs(B256::repeat_byte(0x77));
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].address, Address::repeat_byte(0xcc));
        assert_eq!(logs[0].topics, vec![to_word(U256::from(1)), to_word(U256::from(2))]);
        assert_eq!(logs[0].data, Bytes::from_static(&[0xbe, 0xef]));
        assert_eq!(logs[0].block_number, 1000);
    }
}
