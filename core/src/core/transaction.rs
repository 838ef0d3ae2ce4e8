// Copyright 2018 The Grin Developers
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

//! Transactions: inputs spending prior outputs, fresh outputs with range
//! proofs, and kernels carrying the transaction's excess signature. A
//! `Transaction` is valid exactly when its commitments sum to zero once the
//! fee and kernel offset are accounted for; see [`Committed`].

use std::cmp::Ordering;

use blake2_rfc::blake2b::blake2b;
use mw_util::secp::key::SecretKey;
use mw_util::secp::pedersen::{Commitment, RangeProof};
use mw_util::secp::{Message, Secp256k1, Signature};
use mw_util::static_secp_instance;

use mw_keychain::BlindingFactor;

use crate::core::committed::Committed;
use crate::error::Error;
use crate::ser_util::{self, commitment_from_hex, commitment_to_hex, rangeproof_from_hex, rangeproof_to_hex};

/// Options for an output's origin. A coinbase output matures only after a
/// fixed number of confirmations; a plain output is spendable as soon as
/// its containing block is on the chain the wallet trusts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFeatures {
	/// A plain, non-coinbase output.
	Plain,
	/// A block reward or fee output, subject to maturity lock-up.
	Coinbase,
}

impl OutputFeatures {
	/// Whether this is a coinbase output.
	pub fn is_coinbase(&self) -> bool {
		matches!(self, OutputFeatures::Coinbase)
	}
}

/// Options for a kernel's matching features, mirroring `OutputFeatures`
/// plus the height-locked variant used for time-locked spends.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelFeatures {
	/// No lock height, fee paid normally.
	Plain {
		/// Transaction fee.
		fee: u64,
	},
	/// A coinbase kernel, fee is implicitly zero.
	Coinbase,
	/// A kernel that can't be included in a block below `lock_height`.
	HeightLocked {
		/// Transaction fee.
		fee: u64,
		/// Minimum block height this kernel may appear in.
		lock_height: u64,
	},
}

impl KernelFeatures {
	/// The fee this kernel pays, zero for coinbase kernels.
	pub fn fee(&self) -> u64 {
		match self {
			KernelFeatures::Plain { fee } => *fee,
			KernelFeatures::Coinbase => 0,
			KernelFeatures::HeightLocked { fee, .. } => *fee,
		}
	}

	/// The lock height this kernel is bound to, zero if unlocked.
	pub fn lock_height(&self) -> u64 {
		match self {
			KernelFeatures::HeightLocked { lock_height, .. } => *lock_height,
			_ => 0,
		}
	}

	/// The byte tag this variant is encoded as in the kernel signing message.
	fn as_flag(&self) -> u8 {
		match self {
			KernelFeatures::Plain { .. } => 0,
			KernelFeatures::Coinbase => 1,
			KernelFeatures::HeightLocked { .. } => 2,
		}
	}

	/// Builds the message signed by the kernel's excess key:
	/// `H(features_flag ‖ fee ‖ lock_height)`, omitting whichever fields
	/// don't apply to this variant.
	pub fn kernel_sig_msg(&self) -> Result<Message, Error> {
		let mut bytes = vec![self.as_flag()];
		match self {
			KernelFeatures::Plain { fee } => bytes.extend_from_slice(&fee.to_be_bytes()),
			KernelFeatures::Coinbase => {}
			KernelFeatures::HeightLocked { fee, lock_height } => {
				bytes.extend_from_slice(&fee.to_be_bytes());
				bytes.extend_from_slice(&lock_height.to_be_bytes());
			}
		}
		let digest = blake2b(32, &[], &bytes);
		let hashed = Message::from_slice(digest.as_bytes())?;
		Ok(hashed)
	}
}

/// A transaction input: a reference, by commitment, to an output being
/// spent. The referenced output's range proof is not carried along; its
/// existence and maturity are checked against chain state, not recomputed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Input {
	/// Whether the output being spent is a plain or coinbase output.
	pub features: OutputFeatures,
	/// The commitment of the output being spent.
	#[serde(serialize_with = "commitment_to_hex", deserialize_with = "commitment_from_hex")]
	pub commit: Commitment,
}

impl PartialEq for Input {
	fn eq(&self, other: &Self) -> bool {
		self.commit == other.commit
	}
}
impl Eq for Input {}

impl Input {
	/// Build a new input referencing `commit`.
	pub fn new(features: OutputFeatures, commit: Commitment) -> Input {
		Input { features, commit }
	}
}

/// A fresh transaction output: a commitment to an amount, with a range
/// proof demonstrating the amount is non-negative without revealing it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Output {
	/// Whether this is a plain or coinbase output.
	pub features: OutputFeatures,
	/// The Pedersen commitment to the output's amount.
	#[serde(serialize_with = "commitment_to_hex", deserialize_with = "commitment_from_hex")]
	pub commit: Commitment,
	/// Bulletproof range proof that `commit` opens to a value in
	/// `[0, 2^64)`.
	#[serde(serialize_with = "rangeproof_to_hex", deserialize_with = "rangeproof_from_hex")]
	pub proof: RangeProof,
}

impl PartialEq for Output {
	fn eq(&self, other: &Self) -> bool {
		self.commit == other.commit
	}
}
impl Eq for Output {}

impl Output {
	/// Validate this output's range proof against its own commitment.
	pub fn verify_proof(&self, secp: &Secp256k1) -> Result<(), Error> {
		secp.verify_range_proof(self.commit, self.proof)
			.map(|_| ())
			.map_err(|_| Error::InvalidRangeProof)
	}
}

/// A transaction kernel: the public remainder of the transaction's blinding
/// factors, signed to prove the transaction sums to zero (less the fee).
/// Every finalized transaction has exactly one kernel once its slate is
/// complete.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct TxKernel {
	/// Plain, coinbase, or height-locked.
	pub features: KernelFeatures,
	/// The Pedersen commitment to zero left over once the transaction's
	/// inputs and outputs are summed; also the public key the
	/// `excess_sig` verifies against.
	#[serde(serialize_with = "commitment_to_hex", deserialize_with = "commitment_from_hex")]
	pub excess: Commitment,
	/// Schnorr signature over the kernel's signing message, proving
	/// knowledge of the excess's private key.
	#[serde(with = "ser_util::sig_serde")]
	pub excess_sig: Signature,
}

/// A syntactically valid but cryptographically meaningless DER signature
/// (`r = s = 1`), used only to give a freshly built kernel a well-formed
/// `excess_sig` placeholder before the real one is computed.
const PLACEHOLDER_SIG_DER: [u8; 8] = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01];

impl TxKernel {
	/// An otherwise-empty kernel carrying only `features`, awaiting its
	/// excess and signature once the rest of the transaction is built.
	pub fn with_features(features: KernelFeatures) -> TxKernel {
		let static_secp = static_secp_instance();
		let secp = static_secp.lock().unwrap();
		TxKernel {
			features,
			excess: Commitment::from_vec(vec![0; 33]),
			excess_sig: Signature::from_der(&secp, &PLACEHOLDER_SIG_DER)
				.expect("placeholder DER signature is well-formed"),
		}
	}

	/// Verify the kernel's excess signature against its own excess
	/// commitment, treating the commitment as the public key the
	/// signature must check out against.
	pub fn verify(&self, secp: &Secp256k1) -> Result<(), Error> {
		let msg = self.features.kernel_sig_msg()?;
		crate::libtx::aggsig::verify_completed_sig_from_commit(secp, &self.excess_sig, &msg, &self.excess)
	}
}

/// Sort order used for transaction inputs, outputs and kernels: by the
/// byte representation of their commitment (or, for kernels, signature),
/// so independently-built transaction bodies always serialize identically.
pub trait TxSort {
	/// Sort `self` in place into canonical transaction order.
	fn sort(&mut self);
}

impl TxSort for Vec<Input> {
	fn sort(&mut self) {
		self.sort_by(|a, b| a.commit.0.cmp(&b.commit.0));
	}
}

impl TxSort for Vec<Output> {
	fn sort(&mut self) {
		self.sort_by(|a, b| a.commit.0.cmp(&b.commit.0));
	}
}

impl TxSort for Vec<TxKernel> {
	fn sort(&mut self) {
		self.sort_by(|a, b| a.excess.0.cmp(&b.excess.0));
	}
}

/// The inputs, outputs and kernels making up a transaction's body, absent
/// the kernel offset (which lives on the enclosing `Transaction` so it can
/// be split and re-combined across Phase S/R/F without touching the body).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TransactionBody {
	/// List of inputs spent by the transaction.
	pub inputs: Vec<Input>,
	/// List of outputs the transaction creates.
	pub outputs: Vec<Output>,
	/// List of kernels the transaction carries (always one, once final).
	pub kernels: Vec<TxKernel>,
}

impl Committed for TransactionBody {
	fn inputs_committed(&self) -> Vec<Commitment> {
		self.inputs.iter().map(|i| i.commit).collect()
	}
	fn outputs_committed(&self) -> Vec<Commitment> {
		self.outputs.iter().map(|o| o.commit).collect()
	}
	fn kernels_committed(&self) -> Vec<Commitment> {
		self.kernels.iter().map(|k| k.excess).collect()
	}
}

impl TransactionBody {
	/// An empty body: no inputs, outputs or kernels.
	pub fn empty() -> TransactionBody {
		TransactionBody::default()
	}

	/// Builds a body from explicit parts.
	pub fn new(inputs: Vec<Input>, outputs: Vec<Output>, kernels: Vec<TxKernel>) -> TransactionBody {
		TransactionBody {
			inputs,
			outputs,
			kernels,
		}
	}

	/// Returns a new body with `input` appended.
	pub fn with_input(mut self, input: Input) -> TransactionBody {
		self.inputs.push(input);
		self
	}

	/// Returns a new body with `output` appended.
	pub fn with_output(mut self, output: Output) -> TransactionBody {
		self.outputs.push(output);
		self
	}

	/// Returns a new body with `kernel` appended.
	pub fn with_kernel(mut self, kernel: TxKernel) -> TransactionBody {
		self.kernels.push(kernel);
		self
	}

	/// Total explicit fee carried by this body's kernels.
	pub fn fee(&self) -> u64 {
		self.kernels.iter().map(|k| k.features.fee()).sum()
	}

	/// Sorts inputs, outputs and kernels into canonical order, so two
	/// independently assembled copies of the same transaction serialize
	/// identically.
	pub fn cut_through_and_sort(&mut self) {
		self.inputs.sort();
		self.outputs.sort();
		self.kernels.sort();
	}
}

/// A complete Mimblewimble transaction: a body plus the kernel offset that
/// was split out of the body's blinding factors during construction.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Transaction {
	/// Secret offset, summed with the body's kernel excesses to hide any
	/// single contributor's commitments when transactions are aggregated.
	pub offset: BlindingFactor,
	/// Inputs, outputs and kernels.
	pub body: TransactionBody,
}

impl PartialEq for Transaction {
	fn eq(&self, other: &Self) -> bool {
		self.offset == other.offset
			&& self.body.inputs == other.body.inputs
			&& self.body.outputs == other.body.outputs
	}
}

impl Committed for Transaction {
	fn inputs_committed(&self) -> Vec<Commitment> {
		self.body.inputs_committed()
	}
	fn outputs_committed(&self) -> Vec<Commitment> {
		self.body.outputs_committed()
	}
	fn kernels_committed(&self) -> Vec<Commitment> {
		self.body.kernels_committed()
	}
}

impl Transaction {
	/// An empty transaction: zero offset, empty body.
	pub fn empty() -> Transaction {
		Transaction {
			offset: BlindingFactor::zero(),
			body: TransactionBody::empty(),
		}
	}

	/// Build a transaction from an offset and a body.
	pub fn new(offset: BlindingFactor, body: TransactionBody) -> Transaction {
		Transaction { offset, body }
	}

	/// Returns a new transaction with `input` appended.
	pub fn with_input(mut self, input: Input) -> Transaction {
		self.body = self.body.with_input(input);
		self
	}

	/// Returns a new transaction with `output` appended.
	pub fn with_output(mut self, output: Output) -> Transaction {
		self.body = self.body.with_output(output);
		self
	}

	/// Returns a new transaction with `kernel` appended.
	pub fn with_kernel(mut self, kernel: TxKernel) -> Transaction {
		self.body = self.body.with_kernel(kernel);
		self
	}

	/// Total fee this transaction pays.
	pub fn fee(&self) -> u64 {
		self.body.fee()
	}

	/// Verifies the transaction is internally consistent: kernel
	/// signatures check out, range proofs check out, and the sum-to-zero
	/// invariant holds across inputs, outputs, the kernel offset and the
	/// fee.
	pub fn validate(&self) -> Result<(), Error> {
		if self.body.kernels.is_empty() {
			return Err(Error::NoKernels);
		}
		let static_secp = static_secp_instance();
		let secp = static_secp.lock().unwrap();

		for output in &self.body.outputs {
			output.verify_proof(&secp)?;
		}
		for kernel in &self.body.kernels {
			kernel.verify(&secp)?;
		}

		self.body
			.verify_kernel_sums(self.fee() as i64, self.offset, None, None)?;
		Ok(())
	}
}

impl Ord for Input {
	fn cmp(&self, other: &Self) -> Ordering {
		self.commit.0.cmp(&other.commit.0)
	}
}
impl PartialOrd for Input {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Aggregates several transactions (e.g. during a Phase R→F handoff when
/// multiple slates are being combined) into one, summing offsets and
/// concatenating bodies before a final cut-through.
pub fn aggregate(transactions: &[Transaction]) -> Result<Transaction, Error> {
	if transactions.len() == 1 {
		return Ok(transactions[0].clone());
	}

	let static_secp = static_secp_instance();
	let secp = static_secp.lock().unwrap();

	let mut inputs = vec![];
	let mut outputs = vec![];
	let mut kernels = vec![];
	let mut offsets = vec![];

	for tx in transactions {
		inputs.extend_from_slice(&tx.body.inputs);
		outputs.extend_from_slice(&tx.body.outputs);
		kernels.extend_from_slice(&tx.body.kernels);
		if tx.offset != BlindingFactor::zero() {
			offsets.push(tx.offset.secret_key(&secp)?);
		}
	}

	let offset = if offsets.is_empty() {
		BlindingFactor::zero()
	} else {
		let sum: SecretKey = secp.blind_sum(offsets, vec![])?;
		BlindingFactor::from_secret_key(sum)
	};

	let mut body = TransactionBody::new(inputs, outputs, kernels);
	body.cut_through_and_sort();

	Ok(Transaction::new(offset, body))
}

#[cfg(test)]
mod test {
	use super::*;
	use mw_keychain::{BlindSum, ExtKeychain, Identifier, Keychain, Path};

	fn test_keychain() -> ExtKeychain {
		ExtKeychain::from_seed(b"transaction module test seed!!!").unwrap()
	}

	fn test_output(keychain: &ExtKeychain, path: &[u32], value: u64) -> (Output, SecretKey) {
		let id = Identifier::from_path(&Path::new(path).unwrap());
		let commit = keychain.commit(value, &id).unwrap();
		let blind = keychain.derived_key(&id).unwrap();
		let secp = keychain.secp();
		let proof = secp.range_proof(0, value, blind, commit);
		(
			Output {
				features: OutputFeatures::Plain,
				commit,
				proof,
			},
			blind,
		)
	}

	#[test]
	fn empty_transaction_has_no_kernels() {
		assert_eq!(Transaction::empty().body.kernels.len(), 0);
		assert!(Transaction::empty().validate().is_err());
	}

	#[test]
	fn kernel_sig_msg_distinguishes_fee() {
		let a = KernelFeatures::Plain { fee: 1 }.kernel_sig_msg().unwrap();
		let b = KernelFeatures::Plain { fee: 2 }.kernel_sig_msg().unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn single_output_transaction_validates() {
		let keychain = test_keychain();
		let fee = 100u64;
		let (out, out_blind) = test_output(&keychain, &[0, 1], 900);
		let in_id = Identifier::from_path(&Path::new(&[0, 0]).unwrap());
		let in_commit = keychain.commit(1000, &in_id).unwrap();
		let in_blind = keychain.derived_key(&in_id).unwrap();

		let secp = keychain.secp();
		let excess = secp
			.blind_sum(vec![out_blind], vec![in_blind])
			.unwrap();
		let msg = KernelFeatures::Plain { fee }.kernel_sig_msg().unwrap();
		let excess_commit = secp.commit(0, excess).unwrap();
		let excess_pubkey = excess_commit.to_pubkey(&secp).unwrap();
		let sig = crate::libtx::aggsig::sign_with_blinding(
			&secp,
			&msg,
			&BlindingFactor::from_secret_key(excess),
			Some(&excess_pubkey),
		)
		.unwrap();

		let tx = Transaction::new(
			BlindingFactor::zero(),
			TransactionBody::new(
				vec![Input::new(OutputFeatures::Plain, in_commit)],
				vec![out],
				vec![TxKernel {
					features: KernelFeatures::Plain { fee },
					excess: excess_commit,
					excess_sig: sig,
				}],
			),
		);

		tx.validate().unwrap();
	}

	#[test]
	fn cut_through_and_sort_is_idempotent() {
		let keychain = test_keychain();
		let (out1, _) = test_output(&keychain, &[0, 1], 10);
		let (out2, _) = test_output(&keychain, &[0, 2], 20);
		let mut body = TransactionBody::new(vec![], vec![out2, out1], vec![]);
		body.cut_through_and_sort();
		let first = body.outputs[0].commit;
		body.cut_through_and_sort();
		assert_eq!(body.outputs[0].commit, first);
	}

	#[test]
	fn blind_sum_via_keychain_matches_manual_sum() {
		let keychain = test_keychain();
		let a = Identifier::from_path(&Path::new(&[0, 9]).unwrap());
		let b = Identifier::from_path(&Path::new(&[0, 10]).unwrap());

		let sum = BlindSum::new().add_key_id(a).add_key_id(b);
		let combined = keychain.blind_sum(&sum).unwrap();

		let ka = keychain.derived_key(&a).unwrap();
		let kb = keychain.derived_key(&b).unwrap();
		let secp = keychain.secp();
		let manual = secp.blind_sum(vec![ka, kb], vec![]).unwrap();
		assert_eq!(combined.secret_key(secp).unwrap(), manual);
	}
}
