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

//! Derivation of the Ed25519 identity keypair used to sign and verify
//! payment proofs. The wallet's Tor onion address is the base32 encoding
//! of this keypair's public key, so deriving it deterministically from the
//! same path used for the wallet's listener identity lets a sender address
//! a payment proof at a receiver it has never talked to before.

use blake2_rfc::blake2b::blake2b;
use ed25519_dalek::Keypair;

use crate::error::Error;
use crate::path::Path;
use crate::types::Keychain;

/// Derive the Ed25519 keypair used for payment proof signatures and Tor
/// identity, from the secp256k1 scalar at `path` on `keychain`.
///
/// The secp scalar is not used directly as an Ed25519 seed: it is hashed
/// through Blake2b-256 first so the two key spaces never share raw key
/// material.
pub fn payment_proof_identity_keypair<K: Keychain>(
	keychain: &K,
	path: &Path,
) -> Result<Keypair, Error> {
	let id = crate::path::Identifier::from_path(path);
	let secret = keychain.derived_key(&id)?;
	let hashed = blake2b(32, &[], secret.as_ref());

	let secret_key = ed25519_dalek::SecretKey::from_bytes(hashed.as_bytes())
		.map_err(|e| Error::ED25519(e.to_string()))?;
	let public_key = ed25519_dalek::PublicKey::from(&secret_key);
	Ok(Keypair {
		secret: secret_key,
		public: public_key,
	})
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::ext_keychain::ExtKeychain;
	use ed25519_dalek::Signer;

	#[test]
	fn identity_keypair_is_deterministic() {
		let keychain = ExtKeychain::from_seed(b"payment proof test seed").unwrap();
		let path = Path::from_str("m/0/1").unwrap();

		let kp1 = payment_proof_identity_keypair(&keychain, &path).unwrap();
		let kp2 = payment_proof_identity_keypair(&keychain, &path).unwrap();
		assert_eq!(kp1.public.as_bytes(), kp2.public.as_bytes());
	}

	#[test]
	fn identity_keypair_signs_and_verifies() {
		let keychain = ExtKeychain::from_seed(b"another payment proof seed").unwrap();
		let path = Path::from_str("m/0/2").unwrap();
		let kp = payment_proof_identity_keypair(&keychain, &path).unwrap();

		let msg = b"proof of payment for a slate";
		let sig = kp.sign(msg);
		assert!(kp.public.verify_strict(msg, &sig).is_ok());
	}
}
