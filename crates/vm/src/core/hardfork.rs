use serde::{Deserialize, Serialize};

/// Protocol upgrades in activation order.
///
/// Each upgrade may introduce opcodes or reprice existing ones. The instruction set of an
/// upgrade is derived from the one before it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HardFork {
    /// Initial release
    Frontier = 0,
    /// DELEGATECALL, contract creation repricing
    Homestead = 1,
    /// CIP150 IO repricing and the 63/64 call energy rule
    TangerineWhistle = 2,
    /// CIP158/161 state clearing and EXP repricing
    SpuriousDragon = 3,
    /// REVERT, RETURNDATA*, STATICCALL and the precompiles 5 to 8
    Byzantium = 4,
    /// Bitwise shifts, EXTCODEHASH, CREATE2 and net metered SSTORE
    Constantinople = 5,
    /// Constantinople without net metered SSTORE
    Petersburg = 6,
    /// NETWORKID, SELFBALANCE, repricing and CIP2200 SSTORE
    Istanbul = 7,
    /// Istanbul plus CIP2315 subroutines
    YoloV1 = 8,
    /// Latest stable upgrade (default)
    #[default]
    Latest = 255,
}

impl HardFork {
    /// Returns the effective hard fork, resolving `Latest` to the latest stable upgrade.
    #[inline]
    pub const fn effective(self) -> Self {
        match self {
            Self::Latest => Self::Istanbul,
            other => other,
        }
    }

    /// Returns true if `self` is at or after `other`.
    ///
    /// ```
    /// use cvm_vm::core::hardfork::HardFork;
    ///
    /// assert!(HardFork::Istanbul.is_active(HardFork::Byzantium));
    /// assert!(!HardFork::Homestead.is_active(HardFork::Byzantium));
    /// assert!(HardFork::Latest.is_active(HardFork::Istanbul));
    /// ```
    #[inline]
    pub const fn is_active(self, other: Self) -> bool {
        self.effective() as u8 >= other as u8
    }
}

impl std::fmt::Display for HardFork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.effective() {
            Self::Frontier => "frontier",
            Self::Homestead => "homestead",
            Self::TangerineWhistle => "tangerine_whistle",
            Self::SpuriousDragon => "spurious_dragon",
            Self::Byzantium => "byzantium",
            Self::Constantinople => "constantinople",
            Self::Petersburg => "petersburg",
            Self::Istanbul | Self::Latest => "istanbul",
            Self::YoloV1 => "yolo_v1",
        };
        f.write_str(name)
    }
}
