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

//! Thin wrappers around the underlying aggregated-Schnorr-signature
//! primitives, used to build a kernel excess signature one participant's
//! partial contribution at a time without any participant ever learning
//! another's blinding factor.

use mw_keychain::BlindingFactor;
use mw_util::secp::key::{PublicKey, SecretKey};
use mw_util::secp::pedersen::Commitment;
use mw_util::secp::{self, aggsig, Message, Secp256k1, Signature};

use crate::error::Error;

/// A fresh secret nonce for this participant's share of a Slate signature.
pub fn create_secnonce(secp: &Secp256k1) -> Result<SecretKey, Error> {
	let nonce = aggsig::export_secnonce_single(secp)?;
	Ok(nonce)
}

/// This participant's contribution to the final signature, given the sum of
/// every participant's public nonce and (once known) the sum of every
/// participant's public excess.
pub fn calculate_partial_sig(
	secp: &Secp256k1,
	sec_key: &SecretKey,
	sec_nonce: &SecretKey,
	nonce_sum: &PublicKey,
	pubkey_sum: Option<&PublicKey>,
	msg: &Message,
) -> Result<Signature, Error> {
	let sig = aggsig::sign_single(
		secp,
		msg,
		sec_key,
		Some(sec_nonce),
		None,
		Some(nonce_sum),
		pubkey_sum,
		Some(nonce_sum),
	)?;
	Ok(sig)
}

/// Verify one participant's partial signature against the same nonce/excess
/// sums used to build it.
pub fn verify_partial_sig(
	secp: &Secp256k1,
	sig: &Signature,
	nonce_sum: &PublicKey,
	pubkey: &PublicKey,
	pubkey_sum: Option<&PublicKey>,
	msg: &Message,
) -> Result<(), Error> {
	if !verify_single(secp, sig, msg, Some(nonce_sum), pubkey, pubkey_sum, true) {
		return Err(Error::IncorrectSignature);
	}
	Ok(())
}

/// Combine every participant's partial signature into the final kernel
/// excess signature.
pub fn add_signatures(
	secp: &Secp256k1,
	part_sigs: Vec<&Signature>,
	nonce_sum: &PublicKey,
) -> Result<Signature, Error> {
	let sig = aggsig::add_signatures_single(secp, part_sigs, nonce_sum)?;
	Ok(sig)
}

/// Verify a completed (summed) signature, recomputing the challenge from the
/// same excess used at signing time.
pub fn verify_completed_sig(
	secp: &Secp256k1,
	sig: &Signature,
	pubkey: &PublicKey,
	pubkey_sum: Option<&PublicKey>,
	msg: &Message,
) -> Result<(), Error> {
	if !verify_single(secp, sig, msg, None, pubkey, pubkey_sum, false) {
		return Err(Error::IncorrectSignature);
	}
	Ok(())
}

/// Verify a completed signature against a Pedersen commitment directly,
/// treating the commitment as a public key (the value it commits to must be
/// zero, which is the case for a kernel excess).
pub fn verify_completed_sig_from_commit(
	secp: &Secp256k1,
	sig: &Signature,
	msg: &Message,
	commit: &Commitment,
) -> Result<(), Error> {
	let pubkey = commit.to_pubkey(secp)?;
	verify_completed_sig(secp, sig, &pubkey, Some(&pubkey), msg)
}

/// Single-signer signature with no partial-signing round trip, used for a
/// coinbase kernel where one key controls the whole excess.
pub fn sign_with_blinding(
	secp: &Secp256k1,
	msg: &Message,
	blinding: &BlindingFactor,
	pubkey_sum: Option<&PublicKey>,
) -> Result<Signature, Error> {
	let skey = blinding.secret_key(secp)?;
	let sig = aggsig::sign_single(secp, msg, &skey, None, None, None, pubkey_sum, None)?;
	Ok(sig)
}

fn verify_single(
	secp: &Secp256k1,
	sig: &Signature,
	msg: &Message,
	pubnonce: Option<&PublicKey>,
	pubkey: &PublicKey,
	pubkey_sum: Option<&PublicKey>,
	is_partial: bool,
) -> bool {
	aggsig::verify_single(secp, sig, msg, pubnonce, pubkey, pubkey_sum, None, is_partial)
}

#[cfg(test)]
mod test {
	use super::*;
	use mw_util::static_secp_instance;

	#[test]
	fn partial_signatures_aggregate_to_a_valid_kernel_signature() {
		let static_secp = static_secp_instance();
		let secp = static_secp.lock().unwrap();

		let sender_skey = SecretKey::new(&secp, &mut rand::thread_rng());
		let sender_pkey = PublicKey::from_secret_key(&secp, &sender_skey).unwrap();
		let receiver_skey = SecretKey::new(&secp, &mut rand::thread_rng());
		let receiver_pkey = PublicKey::from_secret_key(&secp, &receiver_skey).unwrap();

		let sender_nonce = create_secnonce(&secp).unwrap();
		let receiver_nonce = create_secnonce(&secp).unwrap();
		let sender_pub_nonce = PublicKey::from_secret_key(&secp, &sender_nonce).unwrap();
		let receiver_pub_nonce = PublicKey::from_secret_key(&secp, &receiver_nonce).unwrap();

		// Each participant publishes only their public nonce/excess; the two
		// sides are combined by point addition, never by exchanging scalars.
		let nonce_sum =
			PublicKey::from_combination(&secp, vec![&sender_pub_nonce, &receiver_pub_nonce]).unwrap();
		let pubkey_sum =
			PublicKey::from_combination(&secp, vec![&sender_pkey, &receiver_pkey]).unwrap();

		let msg = Message::from_slice(&[7u8; 32]).unwrap();

		let sender_part = calculate_partial_sig(
			&secp,
			&sender_skey,
			&sender_nonce,
			&nonce_sum,
			Some(&pubkey_sum),
			&msg,
		)
		.unwrap();
		verify_partial_sig(
			&secp,
			&sender_part,
			&nonce_sum,
			&sender_pkey,
			Some(&pubkey_sum),
			&msg,
		)
		.unwrap();

		let receiver_part = calculate_partial_sig(
			&secp,
			&receiver_skey,
			&receiver_nonce,
			&nonce_sum,
			Some(&pubkey_sum),
			&msg,
		)
		.unwrap();
		verify_partial_sig(
			&secp,
			&receiver_part,
			&nonce_sum,
			&receiver_pkey,
			Some(&pubkey_sum),
			&msg,
		)
		.unwrap();

		let final_sig =
			add_signatures(&secp, vec![&sender_part, &receiver_part], &nonce_sum).unwrap();
		verify_completed_sig(&secp, &final_sig, &pubkey_sum, Some(&pubkey_sum), &msg).unwrap();
	}
}
