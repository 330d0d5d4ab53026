//! Chain configuration and the per-block upgrade rules derived from it.

use serde::{Deserialize, Serialize};

use super::hardfork::HardFork;

/// Network id of the main network.
pub const MAINNET: u64 = 1;
/// Network id of the Devin test network.
pub const DEVIN: u64 = 3;
/// Network id used by development configurations.
pub const PRIVATE: u64 = 1337;

/// Activation heights of the protocol upgrades of a chain. `None` means never activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The network id, exposed through NETWORKID.
    pub network_id: u64,
    /// Homestead activation block.
    #[serde(default)]
    pub homestead_block: Option<u64>,
    /// CIP150 (Tangerine Whistle) activation block.
    #[serde(default)]
    pub cip150_block: Option<u64>,
    /// CIP155 replay protection activation block.
    #[serde(default)]
    pub cip155_block: Option<u64>,
    /// CIP158 (Spurious Dragon) activation block.
    #[serde(default)]
    pub cip158_block: Option<u64>,
    /// Byzantium activation block.
    #[serde(default)]
    pub byzantium_block: Option<u64>,
    /// Constantinople activation block.
    #[serde(default)]
    pub constantinople_block: Option<u64>,
    /// Petersburg activation block. Defaults to Constantinople when unset.
    #[serde(default)]
    pub petersburg_block: Option<u64>,
    /// Istanbul activation block.
    #[serde(default)]
    pub istanbul_block: Option<u64>,
    /// YoloV1 activation block.
    #[serde(default)]
    pub yolo_v1_block: Option<u64>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::all_protocol_changes()
    }
}

impl ChainConfig {
    /// A chain with every upgrade up to and including `fork` active from genesis.
    ///
    /// ```
    /// use cvm_vm::core::{chains::ChainConfig, hardfork::HardFork};
    ///
    /// let config = ChainConfig::at_hardfork(7, HardFork::Byzantium);
    /// assert!(config.is_byzantium(0));
    /// assert!(!config.is_constantinople(0));
    /// ```
    pub fn at_hardfork(network_id: u64, fork: HardFork) -> Self {
        let at = |upgrade: HardFork| fork.is_active(upgrade).then_some(0);
        Self {
            network_id,
            homestead_block: at(HardFork::Homestead),
            cip150_block: at(HardFork::TangerineWhistle),
            cip155_block: at(HardFork::SpuriousDragon),
            cip158_block: at(HardFork::SpuriousDragon),
            byzantium_block: at(HardFork::Byzantium),
            constantinople_block: at(HardFork::Constantinople),
            // an unset Petersburg follows Constantinople, so pin it to keep CIP1283 metering
            petersburg_block: if fork == HardFork::Constantinople {
                Some(u64::MAX)
            } else {
                at(HardFork::Petersburg)
            },
            istanbul_block: at(HardFork::Istanbul),
            yolo_v1_block: if fork == HardFork::YoloV1 { Some(0) } else { None },
        }
    }

    /// The main network.
    pub fn mainnet() -> Self {
        Self::at_hardfork(MAINNET, HardFork::Istanbul)
    }

    /// The Devin test network.
    pub fn devin() -> Self {
        Self::at_hardfork(DEVIN, HardFork::Istanbul)
    }

    /// Every stable upgrade active from genesis. Used by tooling and tests.
    pub fn all_protocol_changes() -> Self {
        Self::at_hardfork(PRIVATE, HardFork::Istanbul)
    }

    /// Looks up a configuration by name: a network (`mainnet`, `devin`, `dev`) or an upgrade
    /// name (`frontier` ... `yolo_v1`).
    pub fn by_name(name: &str) -> Option<Self> {
        let fork = match name.to_lowercase().as_str() {
            "mainnet" => return Some(Self::mainnet()),
            "devin" => return Some(Self::devin()),
            "dev" | "all" => return Some(Self::all_protocol_changes()),
            "frontier" => HardFork::Frontier,
            "homestead" => HardFork::Homestead,
            "tangerine_whistle" | "cip150" => HardFork::TangerineWhistle,
            "spurious_dragon" | "cip158" => HardFork::SpuriousDragon,
            "byzantium" => HardFork::Byzantium,
            "constantinople" => HardFork::Constantinople,
            "petersburg" => HardFork::Petersburg,
            "istanbul" => HardFork::Istanbul,
            "yolo_v1" | "yolov1" => HardFork::YoloV1,
            _ => return None,
        };
        Some(Self::at_hardfork(PRIVATE, fork))
    }

    /// Whether `num` is at or after Homestead.
    pub fn is_homestead(&self, num: u64) -> bool {
        is_forked(self.homestead_block, num)
    }

    /// Whether `num` is at or after CIP150.
    pub fn is_cip150(&self, num: u64) -> bool {
        is_forked(self.cip150_block, num)
    }

    /// Whether `num` is at or after CIP155.
    pub fn is_cip155(&self, num: u64) -> bool {
        is_forked(self.cip155_block, num)
    }

    /// Whether `num` is at or after CIP158.
    pub fn is_cip158(&self, num: u64) -> bool {
        is_forked(self.cip158_block, num)
    }

    /// Whether `num` is at or after Byzantium.
    pub fn is_byzantium(&self, num: u64) -> bool {
        is_forked(self.byzantium_block, num)
    }

    /// Whether `num` is at or after Constantinople.
    pub fn is_constantinople(&self, num: u64) -> bool {
        is_forked(self.constantinople_block, num)
    }

    /// Whether `num` is at or after Petersburg. A chain that never schedules Petersburg
    /// explicitly treats Constantinople as Petersburg.
    pub fn is_petersburg(&self, num: u64) -> bool {
        is_forked(self.petersburg_block, num) ||
            (self.petersburg_block.is_none() && is_forked(self.constantinople_block, num))
    }

    /// Whether `num` is at or after Istanbul.
    pub fn is_istanbul(&self, num: u64) -> bool {
        is_forked(self.istanbul_block, num)
    }

    /// Whether `num` is at or after YoloV1.
    pub fn is_yolo_v1(&self, num: u64) -> bool {
        is_forked(self.yolo_v1_block, num)
    }

    /// The latest upgrade active at `num`.
    pub fn hardfork(&self, num: u64) -> HardFork {
        let rules = self.rules(num);
        match () {
            _ if rules.is_yolo_v1 => HardFork::YoloV1,
            _ if rules.is_istanbul => HardFork::Istanbul,
            _ if rules.is_petersburg => HardFork::Petersburg,
            _ if rules.is_constantinople => HardFork::Constantinople,
            _ if rules.is_byzantium => HardFork::Byzantium,
            _ if rules.is_cip158 => HardFork::SpuriousDragon,
            _ if rules.is_cip150 => HardFork::TangerineWhistle,
            _ if rules.is_homestead => HardFork::Homestead,
            _ => HardFork::Frontier,
        }
    }

    /// The upgrade flags in force at block `num`.
    pub fn rules(&self, num: u64) -> Rules {
        Rules {
            network_id: self.network_id,
            is_homestead: self.is_homestead(num),
            is_cip150: self.is_cip150(num),
            is_cip155: self.is_cip155(num),
            is_cip158: self.is_cip158(num),
            is_byzantium: self.is_byzantium(num),
            is_constantinople: self.is_constantinople(num),
            is_petersburg: self.is_petersburg(num),
            is_istanbul: self.is_istanbul(num),
            is_yolo_v1: self.is_yolo_v1(num),
        }
    }
}

/// A snapshot of the upgrade flags for one block. Rules never change during a call tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
    /// The network id.
    pub network_id: u64,
    /// Homestead is active.
    pub is_homestead: bool,
    /// CIP150 is active.
    pub is_cip150: bool,
    /// CIP155 is active.
    pub is_cip155: bool,
    /// CIP158 is active.
    pub is_cip158: bool,
    /// Byzantium is active.
    pub is_byzantium: bool,
    /// Constantinople is active.
    pub is_constantinople: bool,
    /// Petersburg is active.
    pub is_petersburg: bool,
    /// Istanbul is active.
    pub is_istanbul: bool,
    /// YoloV1 is active.
    pub is_yolo_v1: bool,
}

fn is_forked(activation: Option<u64>, num: u64) -> bool {
    activation.is_some_and(|block| block <= num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_follow_activation_heights() {
        let config = ChainConfig {
            network_id: 9,
            homestead_block: Some(0),
            cip150_block: Some(10),
            cip155_block: Some(20),
            cip158_block: Some(20),
            byzantium_block: Some(30),
            constantinople_block: None,
            petersburg_block: None,
            istanbul_block: None,
            yolo_v1_block: None,
        };

        assert_eq!(config.hardfork(0), HardFork::Homestead);
        assert_eq!(config.hardfork(15), HardFork::TangerineWhistle);
        assert_eq!(config.hardfork(25), HardFork::SpuriousDragon);
        assert_eq!(config.hardfork(1_000), HardFork::Byzantium);
        assert!(!config.rules(29).is_byzantium);
        assert_eq!(config.rules(30).network_id, 9);
    }

    #[test]
    fn test_petersburg_defaults_to_constantinople() {
        let mut config = ChainConfig::at_hardfork(1, HardFork::Constantinople);
        assert!(!config.is_petersburg(0));

        config.petersburg_block = None;
        assert!(config.is_petersburg(0));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(ChainConfig::by_name("mainnet"), Some(ChainConfig::mainnet()));
        assert!(ChainConfig::by_name("frontier").is_some_and(|c| !c.is_homestead(0)));
        assert!(ChainConfig::by_name("yolo_v1").is_some_and(|c| c.is_yolo_v1(0)));
        assert_eq!(ChainConfig::by_name("nope"), None);
    }
}
