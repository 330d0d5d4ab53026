use alloy::{
    primitives::{keccak256, Address, Bloom, BloomInput, Bytes, B256, U256},
    rlp::{BufMut, Encodable, Header as RlpHeader, EMPTY_STRING_CODE},
};
use cvm_vm::core::log::Log;
use serde::{Deserialize, Serialize};

/// Receipt status of a transaction whose top level call failed.
pub const RECEIPT_STATUS_FAILED: u64 = 0;
/// Receipt status of a transaction whose top level call succeeded.
pub const RECEIPT_STATUS_SUCCESSFUL: u64 = 1;

/// A [`Message`] is what the state transition executes: a transaction stripped down to the fields
/// execution depends on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The sender.
    pub from: Address,
    /// The recipient, `None` for a contract creation.
    pub to: Option<Address>,
    /// Sender nonce the message was issued with.
    pub nonce: u64,
    /// Value transferred to the recipient.
    pub value: U256,
    /// Energy bought for the message.
    pub energy_limit: u64,
    /// Price paid per unit of energy.
    pub energy_price: U256,
    /// Call data, or init code for a creation.
    pub data: Bytes,
    /// Whether `nonce` must match the sender's account nonce.
    pub check_nonce: bool,
}

impl Message {
    /// Whether the message deploys a contract.
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// A transaction, already attributed to its sender.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender nonce.
    pub nonce: u64,
    /// Price paid per unit of energy.
    pub energy_price: U256,
    /// Energy bought for the transaction.
    pub energy_limit: u64,
    /// The recipient, `None` for a contract creation.
    pub to: Option<Address>,
    /// Value transferred to the recipient.
    pub value: U256,
    /// Call data, or init code for a creation.
    pub data: Bytes,
    /// The sender.
    pub from: Address,
}

impl Transaction {
    /// The keccak hash of the transaction's RLP encoding.
    pub fn hash(&self) -> B256 {
        keccak256(alloy::rlp::encode(self))
    }

    /// Converts the transaction into a nonce checked [`Message`].
    pub fn as_message(&self) -> Message {
        Message {
            from: self.from,
            to: self.to,
            nonce: self.nonce,
            value: self.value,
            energy_limit: self.energy_limit,
            energy_price: self.energy_price,
            data: self.data.clone(),
            check_nonce: true,
        }
    }

    fn payload_length(&self) -> usize {
        self.nonce.length() +
            self.energy_price.length() +
            self.energy_limit.length() +
            self.to.map_or(1, |to| to.length()) +
            self.value.length() +
            self.data.length() +
            self.from.length()
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut dyn BufMut) {
        RlpHeader { list: true, payload_length: self.payload_length() }.encode(out);
        self.nonce.encode(out);
        self.energy_price.encode(out);
        self.energy_limit.encode(out);
        match self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.data.encode(out);
        self.from.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy::rlp::length_of_length(payload_length)
    }
}

/// A block header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// The block's beneficiary.
    pub coinbase: Address,
    /// State commitment after the block.
    pub root: B256,
    /// Bloom over every log of the block.
    pub bloom: Bloom,
    /// Block difficulty.
    pub difficulty: U256,
    /// Block number.
    pub number: u64,
    /// Energy available to the block's transactions.
    pub energy_limit: u64,
    /// Energy used by the block's transactions.
    pub energy_used: u64,
    /// Block timestamp.
    pub time: u64,
    /// Free form extra data.
    pub extra: Bytes,
}

impl Header {
    /// The keccak hash of the header's RLP encoding.
    pub fn hash(&self) -> B256 {
        keccak256(alloy::rlp::encode(self))
    }

    fn payload_length(&self) -> usize {
        self.parent_hash.length() +
            self.coinbase.length() +
            self.root.length() +
            self.bloom.length() +
            self.difficulty.length() +
            self.number.length() +
            self.energy_limit.length() +
            self.energy_used.length() +
            self.time.length() +
            self.extra.length()
    }
}

impl Encodable for Header {
    fn encode(&self, out: &mut dyn BufMut) {
        RlpHeader { list: true, payload_length: self.payload_length() }.encode(out);
        self.parent_hash.encode(out);
        self.coinbase.encode(out);
        self.root.encode(out);
        self.bloom.encode(out);
        self.difficulty.encode(out);
        self.number.encode(out);
        self.energy_limit.encode(out);
        self.energy_used.encode(out);
        self.time.encode(out);
        self.extra.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy::rlp::length_of_length(payload_length)
    }
}

/// A block: a header, its transactions and its uncles' headers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The header.
    pub header: Header,
    /// Transactions, in execution order.
    pub transactions: Vec<Transaction>,
    /// Uncle headers.
    pub uncles: Vec<Header>,
}

impl Block {
    /// Hash of the block, which is the hash of its header.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// The block number.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Energy available to the block's transactions.
    pub fn energy_limit(&self) -> u64 {
        self.header.energy_limit
    }
}

/// The result of a transaction, as recorded in its block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// State root after the transaction. Only set before Byzantium.
    pub post_state: Option<B256>,
    /// [`RECEIPT_STATUS_SUCCESSFUL`] or [`RECEIPT_STATUS_FAILED`]. Only meaningful from
    /// Byzantium on.
    pub status: u64,
    /// Energy used by the block up to and including this transaction.
    pub cumulative_energy_used: u64,
    /// Bloom over [`Receipt::logs`].
    pub bloom: Bloom,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,

    /// Hash of the transaction.
    pub tx_hash: B256,
    /// Address of the deployed contract, for creations.
    pub contract_address: Option<Address>,
    /// Energy used by this transaction alone.
    pub energy_used: u64,

    /// Hash of the block.
    pub block_hash: B256,
    /// Number of the block.
    pub block_number: u64,
    /// Position of the transaction in the block.
    pub transaction_index: usize,
}

impl Receipt {
    /// Creates a receipt. A `root` is recorded as the post state, otherwise the failure flag
    /// becomes the status.
    pub fn new(root: Option<B256>, failed: bool, cumulative_energy_used: u64) -> Self {
        let status = if failed { RECEIPT_STATUS_FAILED } else { RECEIPT_STATUS_SUCCESSFUL };
        Self { post_state: root, status, cumulative_energy_used, ..Default::default() }
    }
}

/// Builds the bloom filter over the addresses and topics of `logs`.
pub fn logs_bloom<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Bloom {
    let mut bloom = Bloom::default();
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_slice()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_slice()));
        }
    }
    bloom
}

/// Builds the bloom filter of a block from its receipts.
pub fn create_bloom(receipts: &[Receipt]) -> Bloom {
    logs_bloom(receipts.iter().flat_map(|receipt| &receipt.logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_hash_commits_to_every_field() {
        let tx = Transaction {
            nonce: 1,
            energy_limit: 21_000,
            to: Some(Address::repeat_byte(0x11)),
            from: Address::repeat_byte(0x22),
            ..Default::default()
        };
        let create = Transaction { to: None, ..tx.clone() };
        let other_sender = Transaction { from: Address::repeat_byte(0x33), ..tx.clone() };

        assert_eq!(tx.hash(), tx.clone().hash());
        assert_ne!(tx.hash(), create.hash());
        assert_ne!(tx.hash(), other_sender.hash());
        assert_eq!(alloy::rlp::encode(&tx).len(), tx.length());
    }

    #[test]
    fn test_as_message_checks_nonce() {
        let tx = Transaction { nonce: 4, data: Bytes::from(vec![1, 2]), ..Default::default() };
        let msg = tx.as_message();
        assert!(msg.check_nonce);
        assert!(msg.is_create());
        assert_eq!(msg.nonce, 4);
        assert_eq!(msg.data, tx.data);
    }

    #[test]
    fn test_header_hash_changes_with_number() {
        let header = Header { number: 1, ..Default::default() };
        let next = Header { number: 2, ..Default::default() };
        assert_ne!(header.hash(), next.hash());
        assert_eq!(Block { header: header.clone(), ..Default::default() }.hash(), header.hash());
    }

    #[test]
    fn test_logs_bloom_contains_address_and_topics() {
        let log = Log::new(Address::repeat_byte(0xaa), vec![B256::repeat_byte(0xbb)], &[], 0);
        let receipt = Receipt { logs: vec![log], ..Receipt::new(None, false, 0) };
        let bloom = create_bloom(&[receipt]);

        assert!(bloom.contains_input(BloomInput::Raw(Address::repeat_byte(0xaa).as_slice())));
        assert!(bloom.contains_input(BloomInput::Raw(B256::repeat_byte(0xbb).as_slice())));
        assert!(!bloom.contains_input(BloomInput::Raw(B256::repeat_byte(0xcc).as_slice())));
    }

    #[test]
    fn test_receipt_status() {
        assert_eq!(Receipt::new(None, true, 5).status, RECEIPT_STATUS_FAILED);
        let receipt = Receipt::new(Some(B256::ZERO), false, 5);
        assert_eq!(receipt.status, RECEIPT_STATUS_SUCCESSFUL);
        assert_eq!(receipt.post_state, Some(B256::ZERO));
        assert_eq!(receipt.cumulative_energy_used, 5);
    }

    #[test]
    fn test_receipt_json_uses_camel_case() {
        let receipt = Receipt {
            contract_address: Some(Address::repeat_byte(0x01)),
            transaction_index: 3,
            ..Receipt::new(None, false, 21_000)
        };
        let json = serde_json::to_value(&receipt).expect("failed to serialize receipt");

        assert_eq!(json["cumulativeEnergyUsed"], 21_000);
        assert_eq!(json["transactionIndex"], 3);
        assert!(json["postState"].is_null());

        let decoded: Receipt = serde_json::from_value(json).expect("failed to deserialize");
        assert_eq!(decoded, receipt);
    }
}
