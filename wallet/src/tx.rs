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

//! The Slate state machine (§4.4): `create_send_tx` (Phase S),
//! `receive_tx` (Phase R) and `finalize_tx` (Phase F), plus the
//! replay-protected transaction log bookkeeping and cancellation that
//! tie them together.

use blake2_rfc::blake2b::blake2b;
use chrono::Utc;
use ed25519_dalek::{PublicKey as EdPublicKey, Signature as EdSignature, Signer};
use rand::thread_rng;
use uuid::Uuid;

use mw_core::libtx::{aggsig, build};
use mw_core::{Committed, Output, OutputFeatures, Transaction};
use mw_keychain::{payment_proof_keys::payment_proof_identity_keypair, Identifier, Keychain, Path};
use mw_util::secp::key::{PublicKey, SecretKey};
use mw_util::secp::{Message, Secp256k1};

use crate::context::SlateContext;
use crate::database::{BatchWrite, WalletBackend};
use crate::error::{Error, ErrorKind};
use crate::node_client::NodeClient;
use crate::selection::{self, SelectedCoins};
use crate::slate::{ParticipantData, PaymentProof, Slate, PARTICIPANT_ID_RECEIVER, PARTICIPANT_ID_SENDER};
use crate::types::{OutputData, OutputStatus, SelectionStrategy, WalletTx, WalletTxType};

/// Derivation path a wallet's own payment-proof/Tor identity lives at. A
/// sender allocates a fresh child under this path per outgoing,
/// proof-bearing send; a receiver signs with the path itself, unextended,
/// since it's the one long-lived identity a peer addresses a proof to.
const PAYMENT_PROOF_PATH: &str = "m/0/1";

fn payment_proof_path() -> Result<Path, Error> {
	Path::from_str(PAYMENT_PROOF_PATH).map_err(|e| ErrorKind::Crypto(e.to_string()).into())
}

fn secp_err(e: mw_util::secp::Error) -> mw_core::Error {
	mw_core::Error::from(e)
}

/// Parameters for `create_send_tx`, gathering the optional payment-proof
/// request separately since it changes which side effects Phase S has.
pub struct SendArgs {
	/// Amount to send, excluding fee.
	pub amount: u64,
	/// Which spendable outputs to draw from.
	pub strategy: SelectionStrategy,
	/// Number of change outputs to create.
	pub num_change_outputs: usize,
	/// Per-weight-unit fee price the coin selector charges. `None` falls
	/// back to the network default.
	pub fee_base: Option<u64>,
	/// Free-text label for the counterparty, stored on the `WalletTx`.
	pub address: Option<String>,
	/// Optional message signed and attached to this participant's slot.
	pub message: Option<String>,
	/// The receiver's Ed25519 public key, if a payment proof is requested.
	pub payment_proof_receiver: Option<[u8; 32]>,
}

/// Builds the message a payment proof's receiver signature covers:
/// `amount ‖ kernel_excess_pubkey ‖ sender_address`. The kernel excess used
/// here is the aggregate public excess `Σ x_i·G`, which by construction is
/// the same curve point the finalized kernel's `excess` commitment opens
/// to, so the receiver can sign this at Phase R without waiting for
/// Phase F's fee/offset-adjusted commitment and the sender can re-derive
/// exactly the same message again at finalize time.
fn payment_proof_message(secp: &Secp256k1, amount: u64, kernel_commit_pubkey: &PublicKey, sender_address: &[u8; 32]) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(8 + 33 + 32);
	bytes.extend_from_slice(&amount.to_be_bytes());
	bytes.extend_from_slice(&kernel_commit_pubkey.serialize_vec(secp, true));
	bytes.extend_from_slice(sender_address);
	bytes
}

fn message_sig_msg(message: &str) -> Result<Message, Error> {
	let digest = blake2b(32, &[], message.as_bytes());
	Message::from_slice(digest.as_bytes()).map_err(|e| mw_core::Error::from(e).into())
}

/// Sign `message` with this participant's excess key, if one was given.
fn sign_message<K: Keychain>(keychain: &K, sec_key: &SecretKey, message: &Option<String>) -> Result<Option<mw_util::secp::Signature>, Error> {
	match message {
		None => Ok(None),
		Some(text) => {
			let msg = message_sig_msg(text)?;
			let blinding = mw_keychain::BlindingFactor::from_secret_key(*sec_key);
			let sig = keychain.sign_with_blinding(&msg, &blinding)?;
			Ok(Some(sig))
		}
	}
}

/// Verify every participant's `message`/`message_sig` pair present on the
/// slate so far. A participant with no message carries no signature to
/// check.
pub fn verify_message_signatures(secp: &Secp256k1, participants: &[ParticipantData]) -> Result<(), Error> {
	for p in participants {
		if let (Some(text), Some(sig)) = (&p.message, &p.message_sig) {
			let msg = message_sig_msg(text)?;
			secp.verify(&msg, sig, &p.public_blind_excess).map_err(secp_err)?;
		}
	}
	Ok(())
}

fn find_tx_by_slate_id<W: WalletBackend>(wallet: &W, slate_id: &Uuid) -> Result<Option<WalletTx>, Error> {
	Ok(wallet.transactions()?.into_iter().find(|tx| tx.slate_id.as_ref() == Some(slate_id)))
}

/// Phase S: select inputs and change, build the sender's half of a fresh
/// slate, and persist the signing context and transaction log entry that
/// let `finalize_tx` complete it later.
pub fn create_send_tx<K, W>(
	keychain: &K,
	wallet: &W,
	node: &dyn NodeClient,
	parent_key_id: &Identifier,
	args: SendArgs,
) -> Result<Slate, Error>
where
	K: Keychain,
	W: WalletBackend,
{
	let secp = keychain.secp();
	let height = node.get_chain_height()? + 1;

	let (selected, elems) = selection::select_and_build(
		keychain,
		wallet,
		parent_key_id,
		args.amount,
		args.num_change_outputs.max(1),
		&args.strategy,
		args.fee_base,
	)?;
	let SelectedCoins { coins, fee, change } = selected;

	let kernel_features = selection::kernel_features(fee, 0);
	let (tx, excess) = build::partial_transaction(kernel_features, elems, keychain)?;

	// Split the resolved excess from a fresh random offset: the slate only
	// ever carries `excess - offset` as this participant's signing key, so
	// the raw per-output blinds are never reconstructable from the kernel.
	let offset_skey = SecretKey::new(secp, &mut thread_rng());
	let offset = mw_keychain::BlindingFactor::from_secret_key(offset_skey);
	let excess_skey = excess.secret_key(secp)?;
	let sec_key = secp.blind_sum(vec![excess_skey], vec![offset_skey]).map_err(secp_err)?;

	let mut slate = Slate::blank(Uuid::new_v4());
	slate.tx = Transaction::new(offset, tx.body);
	slate.amount = args.amount;
	slate.fee = fee;
	slate.height = height;
	slate.lock_height = 0;

	let mut ctx = SlateContext::new(secp, sec_key)?;
	let mut payment_proof = None;
	if let Some(peer_pubkey) = args.payment_proof_receiver {
		let tor_path = wallet.next_child_path(&Identifier::from_path(&payment_proof_path()?))?.to_path();
		let keypair = payment_proof_identity_keypair(keychain, &tor_path)?;
		ctx = ctx.with_payment_proof(tor_path, peer_pubkey);
		payment_proof = Some(PaymentProof::new(keypair.public.to_bytes(), peer_pubkey));
	}

	let (pub_excess, pub_nonce) = ctx.public_keys(secp)?;
	let message_sig = sign_message(keychain, &sec_key, &args.message)?;
	slate.participant_data.push(ParticipantData {
		id: PARTICIPANT_ID_SENDER,
		public_blind_excess: pub_excess,
		public_nonce: pub_nonce,
		part_sig: None,
		message: args.message.clone(),
		message_sig,
	});
	slate.payment_proof = payment_proof;

	let wallet_tx_id = wallet.next_tx_id()?;
	let wallet_tx = WalletTx {
		id: wallet_tx_id,
		tx_type: WalletTxType::SendingStarted,
		slate_id: Some(slate.id),
		counterparty_address: args.address,
		message: args.message,
		created_at: Utc::now(),
		confirmed_at: None,
		confirmation_height: None,
		credited: change.iter().map(|(_, v)| v).sum(),
		debited: coins.iter().map(|c| c.value).sum(),
		fee: Some(fee),
		tx_snapshot: Some(slate.tx.clone()),
	};

	let mut batch = wallet.batch()?;
	batch.save_slate_context(slate.id, ctx)?;
	for (key_id, value) in &change {
		batch.save_output(OutputData {
			key_id: *key_id,
			commit: keychain.commit(*value, key_id)?,
			value: *value,
			status: OutputStatus::Spendable,
			block_height: None,
			mmr_index: None,
			wallet_tx_id: Some(wallet_tx_id),
			label: None,
		})?;
	}
	for coin in coins {
		let mut locked = coin;
		locked.lock();
		locked.wallet_tx_id = Some(wallet_tx_id);
		batch.save_output(locked)?;
	}
	batch.save_transaction(wallet_tx)?;
	batch.commit()?;

	Ok(slate)
}

/// Phase R: validate an incoming slate, add the receiver's output,
/// participant data and partial signature, and record the receive as
/// in-progress.
pub fn receive_tx<K, W>(
	keychain: &K,
	wallet: &W,
	slate: &Slate,
	parent_key_id: &Identifier,
	address: Option<String>,
	message: Option<String>,
) -> Result<Slate, Error>
where
	K: Keychain,
	W: WalletBackend,
{
	let secp = keychain.secp();
	let mut slate = slate.clone();

	if slate.tx.body.kernels.len() != 1 {
		return Err(ErrorKind::InvalidSlateState("expected exactly one kernel".to_string()).into());
	}
	if slate.participant(PARTICIPANT_ID_RECEIVER).is_some() {
		return Err(ErrorKind::InvalidSlateState(format!("slate {} already received", slate.id)).into());
	}
	if let Some(prior) = find_tx_by_slate_id(wallet, &slate.id)? {
		if prior.tx_type != WalletTxType::ReceivedCancelled {
			return Err(ErrorKind::InvalidSlateState(format!("slate {} already processed", slate.id)).into());
		}
	}
	verify_message_signatures(secp, &slate.participant_data)?;

	let key_id = wallet.next_child_path(parent_key_id)?;
	let wallet_tx_id = wallet.next_tx_id()?;

	let commit = keychain.commit(slate.amount, &key_id)?;
	let blind = keychain.derived_key(&key_id)?;
	let proof = secp.range_proof(0, slate.amount, blind, commit);
	slate.tx = slate.tx.clone().with_output(Output {
		features: OutputFeatures::Plain,
		commit,
		proof,
	});

	let sec_key = blind;
	let ctx = SlateContext::new(secp, sec_key)?;
	let (pub_excess, pub_nonce) = ctx.public_keys(secp)?;
	slate.participant_data.push(ParticipantData {
		id: PARTICIPANT_ID_RECEIVER,
		public_blind_excess: pub_excess,
		public_nonce: pub_nonce,
		part_sig: None,
		message: message.clone(),
		message_sig: sign_message(keychain, &sec_key, &message)?,
	});

	let nonce_sum = slate.nonce_sum(secp)?;
	let pubkey_sum = slate.pubkey_sum(secp)?;
	let kernel_msg = slate.kernel_sig_msg()?;
	let (sec_key, sec_nonce) = ctx.private_keys();
	let part_sig = aggsig::calculate_partial_sig(secp, &sec_key, &sec_nonce, &nonce_sum, Some(&pubkey_sum), &kernel_msg)?;
	aggsig::verify_partial_sig(secp, &part_sig, &nonce_sum, &pub_excess, Some(&pubkey_sum), &kernel_msg)?;

	if let Some(p) = slate.participant_data.iter_mut().find(|p| p.id == PARTICIPANT_ID_RECEIVER) {
		p.part_sig = Some(part_sig);
	}

	if let Some(proof) = &mut slate.payment_proof {
		let tor_path = payment_proof_path()?;
		let keypair = payment_proof_identity_keypair(keychain, &tor_path)?;
		if keypair.public.as_bytes() != &proof.receiver_address_bytes()? {
			return Err(ErrorKind::InvalidSlateState("payment proof not addressed to this wallet's identity".to_string()).into());
		}
		let sender_bytes = proof.sender_address_bytes()?;
		let msg = payment_proof_message(secp, slate.amount, &pubkey_sum, &sender_bytes);
		let sig = keypair.sign(&msg);
		proof.receiver_signature = Some(mw_util::to_hex(sig.to_bytes().to_vec()));
	}

	let mut batch = wallet.batch()?;
	batch.save_output(OutputData {
		key_id,
		commit,
		value: slate.amount,
		status: OutputStatus::Spendable,
		block_height: None,
		mmr_index: None,
		wallet_tx_id: Some(wallet_tx_id),
		label: None,
	})?;
	batch.save_transaction(WalletTx {
		id: wallet_tx_id,
		tx_type: WalletTxType::ReceivingInProgress,
		slate_id: Some(slate.id),
		counterparty_address: address,
		message,
		created_at: Utc::now(),
		confirmed_at: None,
		confirmation_height: None,
		credited: slate.amount,
		debited: 0,
		fee: Some(slate.fee),
		tx_snapshot: None,
	})?;
	batch.commit()?;

	Ok(slate)
}

/// Phase F: verify both partial signatures, aggregate them, compute the
/// final kernel excess, validate the resulting transaction, and mark the
/// send finalized.
pub fn finalize_tx<K, W>(keychain: &K, wallet: &W, slate: &Slate) -> Result<Slate, Error>
where
	K: Keychain,
	W: WalletBackend,
{
	let secp = keychain.secp();
	let mut slate = slate.clone();

	if slate.tx.body.kernels.len() != 1 {
		return Err(ErrorKind::InvalidSlateState("expected exactly one kernel".to_string()).into());
	}
	verify_message_signatures(secp, &slate.participant_data)?;

	let receiver = slate
		.participant(PARTICIPANT_ID_RECEIVER)
		.cloned()
		.ok_or_else(|| ErrorKind::InvalidSlateState("missing receiver contribution".to_string()))?;
	let receiver_part_sig = receiver
		.part_sig
		.ok_or_else(|| ErrorKind::InvalidSlateState("missing receiver partial signature".to_string()))?;

	let nonce_sum = slate.nonce_sum(secp)?;
	let pubkey_sum = slate.pubkey_sum(secp)?;
	let kernel_msg = slate.kernel_sig_msg()?;
	aggsig::verify_partial_sig(
		secp,
		&receiver_part_sig,
		&nonce_sum,
		&receiver.public_blind_excess,
		Some(&pubkey_sum),
		&kernel_msg,
	)?;

	let ctx = wallet
		.load_slate_context(&slate.id)?
		.ok_or_else(|| ErrorKind::InvalidSlateState(format!("no signing context for slate {}", slate.id)))?;

	if let Some(proof) = &slate.payment_proof {
		let sig_hex = proof
			.receiver_signature
			.clone()
			.ok_or_else(|| ErrorKind::InvalidSlateState("payment proof missing receiver signature".to_string()))?;
		let peer_pubkey = ctx
			.peer_pubkey
			.ok_or_else(|| ErrorKind::InvalidSlateState("no payment proof recorded for this send".to_string()))?;
		if proof.receiver_address_bytes()? != peer_pubkey {
			return Err(ErrorKind::InvalidSlateState("payment proof receiver address changed".to_string()).into());
		}
		let sender_bytes = proof.sender_address_bytes()?;
		let message = payment_proof_message(secp, slate.amount, &pubkey_sum, &sender_bytes);
		let sig_bytes = mw_util::from_hex(sig_hex).map_err(|e| ErrorKind::Deserialization(e.to_string()))?;
		let sig = EdSignature::from_bytes(&sig_bytes).map_err(|_| ErrorKind::SignatureVerification)?;
		let receiver_pub = EdPublicKey::from_bytes(&peer_pubkey).map_err(|_| ErrorKind::SignatureVerification)?;
		receiver_pub
			.verify_strict(&message, &sig)
			.map_err(|_| ErrorKind::SignatureVerification)?;
	}

	let (sec_key, sec_nonce) = ctx.private_keys();
	let sender_pub = PublicKey::from_secret_key(secp, &sec_key).map_err(secp_err)?;
	let sender_part_sig = aggsig::calculate_partial_sig(secp, &sec_key, &sec_nonce, &nonce_sum, Some(&pubkey_sum), &kernel_msg)?;
	aggsig::verify_partial_sig(secp, &sender_part_sig, &nonce_sum, &sender_pub, Some(&pubkey_sum), &kernel_msg)?;

	if let Some(p) = slate.participant_data.iter_mut().find(|p| p.id == PARTICIPANT_ID_SENDER) {
		p.part_sig = Some(sender_part_sig);
	}

	let final_sig = aggsig::add_signatures(secp, vec![&sender_part_sig, &receiver_part_sig], &nonce_sum)?;
	aggsig::verify_completed_sig(secp, &final_sig, &pubkey_sum, Some(&pubkey_sum), &kernel_msg)?;

	let fee = slate.fee;
	let offset_skey = slate.tx.offset.secret_key(secp)?;
	let offset_commit = secp.commit(0, offset_skey).map_err(secp_err)?;
	let utxo_sum = slate.tx.body.sum_commitments(fee as i64, None)?;
	let kernel_excess = secp.commit_sum(vec![utxo_sum], vec![offset_commit]).map_err(secp_err)?;

	{
		let kernel = &mut slate.tx.body.kernels[0];
		kernel.excess = kernel_excess;
		kernel.excess_sig = final_sig;
	}

	slate.tx.validate()?;

	let mut wallet_tx = find_tx_by_slate_id(wallet, &slate.id)?
		.ok_or_else(|| ErrorKind::InvalidSlateState(format!("no wallet transaction for slate {}", slate.id)))?;
	wallet_tx.tx_type = WalletTxType::SendingFinalized;
	wallet_tx.tx_snapshot = Some(slate.tx.clone());

	let mut batch = wallet.batch()?;
	batch.save_transaction(wallet_tx)?;
	batch.delete_slate_context(&slate.id)?;
	batch.commit()?;

	Ok(slate)
}

/// Broadcast a finalized transaction to the chain.
pub fn post_finalized_tx(node: &dyn NodeClient, tx: &Transaction) -> Result<(), Error> {
	node.post_tx(tx)
}

/// Cancel an in-flight send or receive: any `Locked` output matching one of
/// the snapshot's inputs returns to `Spendable`, any change/received output
/// created by this `WalletTx` is marked `Cancelled`, and the log entry
/// moves to its terminal cancelled state. Idempotent: cancelling an
/// already-cancelled transaction is a no-op.
pub fn cancel_tx<W: WalletBackend>(wallet: &W, tx_id: u32) -> Result<(), Error> {
	let wallet_tx = wallet.transaction(tx_id)?.ok_or(ErrorKind::TransactionDoesntExist(tx_id))?;

	let cancelled_type = match wallet_tx.tx_type {
		WalletTxType::SendingCancelled | WalletTxType::ReceivedCancelled => return Ok(()),
		WalletTxType::SendingStarted => WalletTxType::SendingCancelled,
		WalletTxType::ReceivingInProgress => WalletTxType::ReceivedCancelled,
		_ => return Err(ErrorKind::TransactionNotCancellable(tx_id).into()),
	};

	let mut batch = wallet.batch()?;
	if let Some(tx) = &wallet_tx.tx_snapshot {
		for input in &tx.body.inputs {
			if let Some(mut output) = wallet.output(&input.commit)? {
				if output.status == OutputStatus::Locked {
					output.mark_spendable();
					batch.save_output(output)?;
				}
			}
		}
		for output in &tx.body.outputs {
			if let Some(mut tracked) = wallet.output(&output.commit)? {
				if tracked.wallet_tx_id == Some(tx_id) && tracked.status == OutputStatus::Spendable {
					tracked.mark_cancelled();
					batch.save_output(tracked)?;
				}
			}
		}
	} else {
		for output in wallet.outputs(crate::database::OutputFilter::All)? {
			if output.wallet_tx_id == Some(tx_id) && output.status == OutputStatus::Spendable {
				let mut tracked = output;
				tracked.mark_cancelled();
				batch.save_output(tracked)?;
			}
		}
	}

	let mut updated = wallet_tx;
	updated.tx_type = cancelled_type;
	if let Some(slate_id) = updated.slate_id {
		batch.delete_slate_context(&slate_id)?;
	}
	batch.save_transaction(updated)?;
	batch.commit()?;
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::database::MemoryWalletBackend;
	use crate::node_client::MockNodeClient;
	use mw_keychain::ExtKeychain;

	fn keychains() -> (ExtKeychain, ExtKeychain) {
		(
			ExtKeychain::from_seed(b"tx module sender seed!!!!!!!!!!!").unwrap(),
			ExtKeychain::from_seed(b"tx module receiver seed!!!!!!!!!").unwrap(),
		)
	}

	fn fund(wallet: &MemoryWalletBackend, keychain: &ExtKeychain, value: u64) {
		let key_id = wallet.next_child_path(&ExtKeychain::root_key_id()).unwrap();
		let commit = keychain.commit(value, &key_id).unwrap();
		let output = OutputData {
			key_id,
			commit,
			value,
			status: OutputStatus::Spendable,
			block_height: Some(1),
			mmr_index: None,
			wallet_tx_id: None,
			label: None,
		};
		let mut batch = wallet.batch().unwrap();
		batch.save_output(output).unwrap();
		batch.commit().unwrap();
	}

	fn send_args(amount: u64) -> SendArgs {
		SendArgs {
			amount,
			strategy: SelectionStrategy::Smallest,
			num_change_outputs: 1,
			fee_base: None,
			address: Some("receiver".to_string()),
			message: Some("for lunch".to_string()),
			payment_proof_receiver: None,
		}
	}

	#[test]
	fn full_send_receive_finalize_round_trip_validates() {
		let (sender_kc, receiver_kc) = keychains();
		let sender_wallet = MemoryWalletBackend::new();
		let receiver_wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();
		node.set_height(100);

		fund(&sender_wallet, &sender_kc, 3_000_000);

		let slate = create_send_tx(
			&sender_kc,
			&sender_wallet,
			&node,
			&ExtKeychain::root_key_id(),
			send_args(1_000_000),
		)
		.unwrap();
		assert_eq!(slate.height, 101);

		let slate = receive_tx(
			&receiver_kc,
			&receiver_wallet,
			&slate,
			&ExtKeychain::root_key_id(),
			Some("sender".to_string()),
			None,
		)
		.unwrap();
		assert!(slate.participant(PARTICIPANT_ID_RECEIVER).unwrap().is_complete());

		let slate = finalize_tx(&sender_kc, &sender_wallet, &slate).unwrap();
		slate.tx.validate().unwrap();

		let wallet_tx = find_tx_by_slate_id(&sender_wallet, &slate.id).unwrap().unwrap();
		assert_eq!(wallet_tx.tx_type, WalletTxType::SendingFinalized);
		assert!(sender_wallet.load_slate_context(&slate.id).unwrap().is_none());

		post_finalized_tx(&node, &slate.tx).unwrap();
		assert_eq!(node.posted_transactions().len(), 1);
	}

	#[test]
	fn receiving_the_same_slate_twice_is_rejected() {
		let (sender_kc, receiver_kc) = keychains();
		let sender_wallet = MemoryWalletBackend::new();
		let receiver_wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();

		fund(&sender_wallet, &sender_kc, 3_000_000);
		let slate = create_send_tx(
			&sender_kc,
			&sender_wallet,
			&node,
			&ExtKeychain::root_key_id(),
			send_args(1_000_000),
		)
		.unwrap();

		let received = receive_tx(
			&receiver_kc,
			&receiver_wallet,
			&slate,
			&ExtKeychain::root_key_id(),
			None,
			None,
		)
		.unwrap();

		let err = receive_tx(
			&receiver_kc,
			&receiver_wallet,
			&received,
			&ExtKeychain::root_key_id(),
			None,
			None,
		)
		.unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::InvalidSlateState(_)));
	}

	#[test]
	fn cancelling_a_send_unlocks_its_inputs_and_drops_its_change() {
		let (sender_kc, _receiver_kc) = keychains();
		let sender_wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();

		fund(&sender_wallet, &sender_kc, 3_000_000);
		let slate = create_send_tx(
			&sender_kc,
			&sender_wallet,
			&node,
			&ExtKeychain::root_key_id(),
			send_args(1_000_000),
		)
		.unwrap();

		let wallet_tx = find_tx_by_slate_id(&sender_wallet, &slate.id).unwrap().unwrap();
		cancel_tx(&sender_wallet, wallet_tx.id).unwrap();

		let outputs = sender_wallet.outputs(crate::database::OutputFilter::All).unwrap();
		assert!(outputs.iter().all(|o| o.status != OutputStatus::Locked));
		let cancelled = find_tx_by_slate_id(&sender_wallet, &slate.id).unwrap().unwrap();
		assert_eq!(cancelled.tx_type, WalletTxType::SendingCancelled);

		// idempotent
		cancel_tx(&sender_wallet, wallet_tx.id).unwrap();
	}

	#[test]
	fn payment_proof_round_trips_from_send_through_finalize() {
		let (sender_kc, receiver_kc) = keychains();
		let sender_wallet = MemoryWalletBackend::new();
		let receiver_wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();

		fund(&sender_wallet, &sender_kc, 3_000_000);

		let receiver_identity =
			payment_proof_identity_keypair(&receiver_kc, &Path::from_str("m/0/1").unwrap()).unwrap();

		let mut args = send_args(1_000_000);
		args.payment_proof_receiver = Some(receiver_identity.public.to_bytes());

		let slate = create_send_tx(&sender_kc, &sender_wallet, &node, &ExtKeychain::root_key_id(), args).unwrap();
		assert!(slate.payment_proof.is_some());

		let slate = receive_tx(
			&receiver_kc,
			&receiver_wallet,
			&slate,
			&ExtKeychain::root_key_id(),
			None,
			None,
		)
		.unwrap();
		assert!(slate.payment_proof.as_ref().unwrap().receiver_signature.is_some());

		let slate = finalize_tx(&sender_kc, &sender_wallet, &slate).unwrap();
		slate.tx.validate().unwrap();
	}
}
