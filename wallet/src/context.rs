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

//! The sender's private signing state for one slate: the excess key, the
//! nonce it generated, and (if this send carries a payment proof) the
//! path its Tor identity and the peer's public key were derived from.
//! Persisted between Phase S and Phase F only; deleted on finalize or
//! cancellation.

use mw_keychain::Path;
use mw_util::secp::key::{PublicKey, SecretKey};
use mw_util::secp::Secp256k1;

use mw_core::libtx::aggsig;

/// Per-slate signing state, kept only for as long as a send is in flight.
#[derive(Clone, Debug)]
pub struct SlateContext {
	/// This participant's secret excess key (`x_S` or `x_R`).
	pub sec_key: SecretKey,
	/// This participant's secret nonce (`k_S` or `k_R`); generated fresh,
	/// never reused across slates.
	pub sec_nonce: SecretKey,
	/// Derivation path of the Tor identity used to sign a payment proof,
	/// if one was requested.
	pub tor_path: Option<Path>,
	/// The counterparty's Ed25519 public key, recorded so finalize can
	/// verify their payment-proof signature against the same key the
	/// send was addressed to.
	pub peer_pubkey: Option<[u8; 32]>,
}

impl SlateContext {
	/// Build a fresh context: a caller-chosen excess key and a freshly
	/// generated secure nonce.
	pub fn new(secp: &Secp256k1, sec_key: SecretKey) -> Result<SlateContext, mw_core::Error> {
		Ok(SlateContext {
			sec_key,
			sec_nonce: aggsig::create_secnonce(secp)?,
			tor_path: None,
			peer_pubkey: None,
		})
	}

	/// Attach payment-proof derivation state.
	pub fn with_payment_proof(mut self, tor_path: Path, peer_pubkey: [u8; 32]) -> SlateContext {
		self.tor_path = Some(tor_path);
		self.peer_pubkey = Some(peer_pubkey);
		self
	}

	/// This participant's `(secret excess, secret nonce)` pair.
	pub fn private_keys(&self) -> (SecretKey, SecretKey) {
		(self.sec_key, self.sec_nonce)
	}

	/// This participant's `(public excess, public nonce)` pair.
	pub fn public_keys(&self, secp: &Secp256k1) -> Result<(PublicKey, PublicKey), mw_core::Error> {
		Ok((
			PublicKey::from_secret_key(secp, &self.sec_key)?,
			PublicKey::from_secret_key(secp, &self.sec_nonce)?,
		))
	}
}
