// Copyright 2021 The Grin Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Slate: the mutable document two parties exchange to build a
//! transaction together. Each phase in `tx.rs` reads and extends one of
//! these; the JSON shape below is the wire contract a transport layer
//! passes verbatim.

use mw_core::ser_util::{num_or_string_u64, opt_num_or_string_u64, option_sig_serde, pubkey_serde};
use mw_core::Transaction;
use mw_util::secp::key::PublicKey;
use mw_util::secp::Signature;
use uuid::Uuid;

/// Which side of the exchange a `ParticipantData` entry belongs to.
pub const PARTICIPANT_ID_SENDER: u64 = 0;
/// See [`PARTICIPANT_ID_SENDER`].
pub const PARTICIPANT_ID_RECEIVER: u64 = 1;

/// One participant's public contribution to the slate's aggregate
/// signature.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParticipantData {
	/// `0` for the sender, `1` for the receiver.
	pub id: u64,
	/// `x_i * G`: this participant's share of the kernel excess.
	#[serde(with = "pubkey_serde")]
	pub public_blind_excess: PublicKey,
	/// `k_i * G`: this participant's public signing nonce.
	#[serde(with = "pubkey_serde")]
	pub public_nonce: PublicKey,
	/// This participant's share of the final signature, once computed.
	#[serde(with = "option_sig_serde")]
	pub part_sig: Option<Signature>,
	/// An optional human-readable message attached by this participant.
	pub message: Option<String>,
	/// Signature over `message`, proving it came from the holder of
	/// `public_blind_excess`.
	#[serde(with = "option_sig_serde")]
	pub message_sig: Option<Signature>,
}

impl ParticipantData {
	/// Whether this participant has supplied their partial signature yet
	/// (round 2 of the protocol, in the sender/receiver/sender terms of
	/// §4.4).
	pub fn is_complete(&self) -> bool {
		self.part_sig.is_some()
	}
}

/// Out-of-band binding between a payment and the Tor (Ed25519) identities
/// of sender and receiver.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentProof {
	/// Sender's Ed25519 public key, hex-encoded.
	pub sender_address: String,
	/// Receiver's Ed25519 public key, hex-encoded.
	pub receiver_address: String,
	/// Receiver's signature over `(amount, kernel_excess, sender_address)`,
	/// once Phase R has run.
	pub receiver_signature: Option<String>,
}

impl PaymentProof {
	/// A fresh proof naming both parties' addresses, awaiting the
	/// receiver's signature.
	pub fn new(sender_address: [u8; 32], receiver_address: [u8; 32]) -> PaymentProof {
		PaymentProof {
			sender_address: mw_util::to_hex(sender_address.to_vec()),
			receiver_address: mw_util::to_hex(receiver_address.to_vec()),
			receiver_signature: None,
		}
	}

	/// Decode the receiver's address back to raw Ed25519 public key bytes.
	pub fn receiver_address_bytes(&self) -> Result<[u8; 32], crate::error::Error> {
		decode_32(&self.receiver_address)
	}

	/// Decode the sender's address back to raw Ed25519 public key bytes.
	pub fn sender_address_bytes(&self) -> Result<[u8; 32], crate::error::Error> {
		decode_32(&self.sender_address)
	}
}

fn decode_32(hex: &str) -> Result<[u8; 32], crate::error::Error> {
	let bytes = mw_util::from_hex(hex.to_string())
		.map_err(|e| crate::error::ErrorKind::Deserialization(e.to_string()))?;
	if bytes.len() != 32 {
		return Err(crate::error::ErrorKind::Deserialization("expected a 32-byte address".to_string()).into());
	}
	let mut out = [0u8; 32];
	out.copy_from_slice(&bytes);
	Ok(out)
}

/// The document passed back and forth between sender and receiver while a
/// transaction is being built. See §4.4 for the phase-by-phase transitions.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Slate {
	/// Slate format version understood by the writer.
	pub version: u16,
	/// Block header version the slate's height implies; lets a receiver on
	/// an older client detect an incompatible fork before signing.
	pub block_header_version: u16,
	/// Format version the slate was originally created at, before any
	/// downgrade a lower-versioned peer along the way required. Unlike
	/// `version`, a receiver never rewrites this.
	pub orig_version: u16,
	/// Always 2 for the two-party protocol this crate implements.
	pub num_participants: usize,
	/// Unique id for this transaction, chosen by the sender.
	pub id: Uuid,
	/// The transaction under construction.
	pub tx: Transaction,
	/// Amount being sent, excluding fee.
	#[serde(with = "num_or_string_u64")]
	pub amount: u64,
	/// Transaction fee.
	#[serde(with = "num_or_string_u64")]
	pub fee: u64,
	/// Chain height the slate was built against.
	#[serde(with = "num_or_string_u64")]
	pub height: u64,
	/// Kernel lock height.
	#[serde(with = "num_or_string_u64")]
	pub lock_height: u64,
	/// Height past which the sender will no longer accept this slate back
	/// from the receiver.
	#[serde(with = "opt_num_or_string_u64")]
	pub ttl_cutoff_height: Option<u64>,
	/// Each participant's public contribution.
	pub participant_data: Vec<ParticipantData>,
	/// Payment-proof binding, if the receiver's address was known up front.
	pub payment_proof: Option<PaymentProof>,
}

impl Slate {
	/// The slate format this crate writes.
	pub const CURRENT_VERSION: u16 = 3;
	/// Block header version implied by the current network rules.
	pub const CURRENT_BLOCK_HEADER_VERSION: u16 = 2;

	/// Build a fresh, empty two-party slate for a new send.
	pub fn blank(id: Uuid) -> Slate {
		Slate {
			version: Slate::CURRENT_VERSION,
			orig_version: Slate::CURRENT_VERSION,
			block_header_version: Slate::CURRENT_BLOCK_HEADER_VERSION,
			num_participants: 2,
			id,
			tx: Transaction::empty(),
			amount: 0,
			fee: 0,
			height: 0,
			lock_height: 0,
			ttl_cutoff_height: None,
			participant_data: vec![],
			payment_proof: None,
		}
	}

	/// This slate's single kernel's signing message
	/// (`H(features ‖ fee ‖ lock_height)`).
	pub fn kernel_sig_msg(&self) -> Result<mw_util::secp::Message, mw_core::Error> {
		let kernel = self
			.tx
			.body
			.kernels
			.get(0)
			.ok_or(mw_core::Error::NoKernels)?;
		kernel.features.kernel_sig_msg()
	}

	/// The participant entry for `id`, if one has been added yet.
	pub fn participant(&self, id: u64) -> Option<&ParticipantData> {
		self.participant_data.iter().find(|p| p.id == id)
	}

	/// Sum of every participant's public nonce (`R = Σ k_i·G`).
	pub fn nonce_sum(&self, secp: &mw_util::secp::Secp256k1) -> Result<PublicKey, mw_core::Error> {
		let nonces: Vec<&PublicKey> = self.participant_data.iter().map(|p| &p.public_nonce).collect();
		PublicKey::from_combination(secp, nonces).map_err(mw_core::Error::from)
	}

	/// Sum of every participant's public excess (`P = Σ x_i·G`).
	pub fn pubkey_sum(&self, secp: &mw_util::secp::Secp256k1) -> Result<PublicKey, mw_core::Error> {
		let keys: Vec<&PublicKey> = self
			.participant_data
			.iter()
			.map(|p| &p.public_blind_excess)
			.collect();
		PublicKey::from_combination(secp, keys).map_err(mw_core::Error::from)
	}

	/// Every participant's partial signature, once all have signed.
	pub fn part_sigs(&self) -> Option<Vec<&Signature>> {
		self.participant_data
			.iter()
			.map(|p| p.part_sig.as_ref())
			.collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn blank_slate_has_two_participant_slots_and_no_kernel() {
		let slate = Slate::blank(Uuid::new_v4());
		assert_eq!(slate.num_participants, 2);
		assert!(slate.participant_data.is_empty());
		assert!(slate.kernel_sig_msg().is_err());
	}

	#[test]
	fn payment_proof_address_round_trips_through_hex() {
		let sender = [1u8; 32];
		let receiver = [2u8; 32];
		let proof = PaymentProof::new(sender, receiver);
		assert_eq!(proof.sender_address_bytes().unwrap(), sender);
		assert_eq!(proof.receiver_address_bytes().unwrap(), receiver);
	}

	#[test]
	fn slate_round_trips_through_json() {
		let slate = Slate::blank(Uuid::new_v4());
		let json = serde_json::to_string(&slate).unwrap();
		let back: Slate = serde_json::from_str(&json).unwrap();
		assert_eq!(back.id, slate.id);
		assert_eq!(back.num_participants, slate.num_participants);
	}

	#[test]
	fn slate_emits_u64_fields_as_numbers() {
		let mut slate = Slate::blank(Uuid::new_v4());
		slate.amount = 60_000_000_000;
		slate.fee = 8_000_000;
		let json = serde_json::to_string(&slate).unwrap();
		assert!(json.contains("\"amount\":60000000000"));
		assert!(json.contains("\"fee\":8000000"));
	}

	#[test]
	fn slate_accepts_u64_fields_as_decimal_strings() {
		let slate = Slate::blank(Uuid::new_v4());
		let mut json = serde_json::to_string(&slate).unwrap();
		json = json
			.replace("\"amount\":0", "\"amount\":\"60000000000\"")
			.replace("\"fee\":0", "\"fee\":\"8000000\"")
			.replace("\"ttl_cutoff_height\":null", "\"ttl_cutoff_height\":\"123\"");
		let back: Slate = serde_json::from_str(&json).unwrap();
		assert_eq!(back.amount, 60_000_000_000);
		assert_eq!(back.fee, 8_000_000);
		assert_eq!(back.ttl_cutoff_height, Some(123));
	}
}
