//! Net metered SSTORE pricing under CIP2200.

#[cfg(test)]
mod integration_tests {
    use alloy::primitives::{Address, Bytes, B256, U256};
    use cvm_common::utils::strings::decode_hex;
    use cvm_vm::core::{
        chains::ChainConfig,
        errors::VmError,
        state::{BlockState, MemoryState, StateDb},
        vm::{BlockContext, Config, Cvm, TxContext},
    };

    struct Vector {
        original: u8,
        energy: u64,
        code: &'static str,
        used: u64,
        refund: u64,
        error: Option<VmError>,
    }

    const fn vector(
        original: u8,
        energy: u64,
        code: &'static str,
        used: u64,
        refund: u64,
    ) -> Vector {
        Vector { original, energy, code, used, refund, error: None }
    }

    const VECTORS: [Vector; 19] = [
        vector(0, u64::MAX, "0x60006000556000600055", 1612, 0), // 0 -> 0 -> 0
        vector(0, u64::MAX, "0x60006000556001600055", 20812, 0), // 0 -> 0 -> 1
        vector(0, u64::MAX, "0x60016000556000600055", 20812, 19200), // 0 -> 1 -> 0
        vector(0, u64::MAX, "0x60016000556002600055", 20812, 0), // 0 -> 1 -> 2
        vector(0, u64::MAX, "0x60016000556001600055", 20812, 0), // 0 -> 1 -> 1
        vector(1, u64::MAX, "0x60006000556000600055", 5812, 15000), // 1 -> 0 -> 0
        vector(1, u64::MAX, "0x60006000556001600055", 5812, 4200), // 1 -> 0 -> 1
        vector(1, u64::MAX, "0x60006000556002600055", 5812, 0), // 1 -> 0 -> 2
        vector(1, u64::MAX, "0x60026000556000600055", 5812, 15000), // 1 -> 2 -> 0
        vector(1, u64::MAX, "0x60026000556003600055", 5812, 0), // 1 -> 2 -> 3
        vector(1, u64::MAX, "0x60026000556001600055", 5812, 4200), // 1 -> 2 -> 1
        vector(1, u64::MAX, "0x60026000556002600055", 5812, 0), // 1 -> 2 -> 2
        vector(1, u64::MAX, "0x60016000556000600055", 5812, 15000), // 1 -> 1 -> 0
        vector(1, u64::MAX, "0x60016000556002600055", 5812, 0), // 1 -> 1 -> 2
        vector(1, u64::MAX, "0x60016000556001600055", 1612, 0), // 1 -> 1 -> 1
        vector(0, u64::MAX, "0x600160005560006000556001600055", 40818, 0), // 0 -> 1 -> 0 -> 1
        vector(1, u64::MAX, "0x600060005560016000556000600055", 10818, 19200), // 1 -> 0 -> 1 -> 0
        // the sentry needs more than 2300 left after the two pushes
        Vector {
            original: 1,
            energy: 2306,
            code: "0x6001600055",
            used: 2306,
            refund: 0,
            error: Some(VmError::OutOfEnergy),
        },
        vector(1, 2307, "0x6001600055", 806, 0),
    ];

    fn context<'a>() -> BlockContext<'a> {
        BlockContext {
            can_transfer: |_, _, _| true,
            transfer: |_, _, _, _| {},
            get_hash: Box::new(|_| B256::ZERO),
            coinbase: Address::ZERO,
            energy_limit: 0,
            block_number: 0,
            time: U256::ZERO,
            difficulty: U256::ZERO,
        }
    }

    #[test]
    fn test_cip2200_vectors() {
        let address = Address::left_padding_from(&[0xaa]);

        for (i, vector) in VECTORS.iter().enumerate() {
            let mut state = MemoryState::new();
            state.create_account(address);
            state.set_code(address, Bytes::from(decode_hex(vector.code).expect("invalid code")));
            state.set_state(address, B256::ZERO, B256::left_padding_from(&[vector.original]));
            // moves the slot into the committed values
            state.finalise(true);

            let mut cvm = Cvm::new(
                context(),
                TxContext::default(),
                &mut state,
                ChainConfig::all_protocol_changes(),
                Config { extra_cips: vec![2200], ..Default::default() },
            );
            let outcome =
                cvm.call(Address::ZERO, address, Bytes::new(), vector.energy, U256::ZERO);

            assert_eq!(outcome.error, vector.error, "vector {i}: unexpected error");
            assert_eq!(vector.energy - outcome.energy_left, vector.used, "vector {i}: energy used");
            assert_eq!(cvm.state.get_refund(), vector.refund, "vector {i}: refund");
        }
    }
}
