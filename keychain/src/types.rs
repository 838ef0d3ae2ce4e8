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

//! The `Keychain` trait and its main supporting types. `BlindingFactor` is a
//! thin wrapper around a secret key to keep commitment/signature arithmetic
//! readable; `BlindSum` accumulates the positive and negative terms of a sum
//! of blinding factors before it is collapsed into one scalar.

use std::cmp::min;
use std::fmt;

use rand::thread_rng;

use crate::error::Error;
use crate::path::Identifier;
use crate::util::secp::constants::SECRET_KEY_SIZE;
use crate::util::secp::key::SecretKey;
use crate::util::secp::pedersen::Commitment;
use crate::util::secp::{self, Message, Secp256k1, Signature};

/// A blinding factor, i.e. a secret key used as the `r` in a Pedersen
/// commitment `C = r*G + v*H`.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlindingFactor([u8; SECRET_KEY_SIZE]);

impl BlindingFactor {
	/// Wrap a secret key.
	pub fn from_secret_key(skey: SecretKey) -> BlindingFactor {
		BlindingFactor::from_slice(skey.as_ref())
	}

	/// Build from a raw slice, zero-padding or truncating to size.
	pub fn from_slice(data: &[u8]) -> BlindingFactor {
		let mut blind = [0; SECRET_KEY_SIZE];
		for i in 0..min(SECRET_KEY_SIZE, data.len()) {
			blind[i] = data[i];
		}
		BlindingFactor(blind)
	}

	/// The additive identity. Not a valid secp scalar on its own; `secret_key`
	/// special-cases it so commitment math still works with a zero blind.
	pub fn zero() -> BlindingFactor {
		BlindingFactor([0; SECRET_KEY_SIZE])
	}

	/// Hex encoding.
	pub fn to_hex(&self) -> String {
		mw_util::to_hex(self.0.to_vec())
	}

	/// Parse from hex.
	pub fn from_hex(hex: &str) -> Result<BlindingFactor, Error> {
		let bytes =
			mw_util::from_hex(hex.to_string()).map_err(|e| Error::KeyDerivation(e.to_string()))?;
		Ok(BlindingFactor::from_slice(&bytes))
	}

	/// The underlying secret key, special-casing the zero blind (which secp
	/// itself rejects as a scalar but which legitimately arises, e.g. for a
	/// fully-offset kernel during intermediate construction).
	pub fn secret_key(&self, secp: &Secp256k1) -> Result<SecretKey, Error> {
		if *self == BlindingFactor::zero() {
			Ok(secp::key::ZERO_KEY)
		} else {
			SecretKey::from_slice(secp, &self.0).map_err(Error::Secp)
		}
	}

	/// Split into `(k1, k2)` such that `k1 + k2 == self`. Used to separate the
	/// kernel signing key from the transaction offset so summing a block's
	/// inputs/outputs/kernels can't reconstruct any one transaction.
	pub fn split(&self, secp: &Secp256k1) -> Result<SplitBlindingFactor, Error> {
		let skey_1 = SecretKey::new(secp, &mut thread_rng());
		let skey = self.secret_key(secp)?;
		let skey_2 = secp.blind_sum(vec![skey], vec![skey_1])?;

		Ok(SplitBlindingFactor {
			blind_1: BlindingFactor::from_secret_key(skey_1),
			blind_2: BlindingFactor::from_secret_key(skey_2),
		})
	}
}

impl fmt::Debug for BlindingFactor {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

impl AsRef<[u8]> for BlindingFactor {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

/// Result of [`BlindingFactor::split`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SplitBlindingFactor {
	/// Used to sign the kernel (`k1*G` contributes to the kernel excess).
	pub blind_1: BlindingFactor,
	/// Used as the transaction offset.
	pub blind_2: BlindingFactor,
}

/// Accumulator for a sum of blinding factors, tracked either directly or by
/// the `Identifier` whose derived key should be summed in.
#[derive(Clone, Debug, Default)]
pub struct BlindSum {
	/// identifiers whose derived blinding factor adds positively
	pub positive_key_ids: Vec<Identifier>,
	/// identifiers whose derived blinding factor adds negatively
	pub negative_key_ids: Vec<Identifier>,
	/// blinding factors that add positively
	pub positive_blinding_factors: Vec<BlindingFactor>,
	/// blinding factors that add negatively
	pub negative_blinding_factors: Vec<BlindingFactor>,
}

impl BlindSum {
	/// A fresh, empty sum.
	pub fn new() -> BlindSum {
		BlindSum::default()
	}

	/// Add a key identifier's derived blind.
	pub fn add_key_id(mut self, key_id: Identifier) -> BlindSum {
		self.positive_key_ids.push(key_id);
		self
	}

	/// Subtract a key identifier's derived blind.
	pub fn sub_key_id(mut self, key_id: Identifier) -> BlindSum {
		self.negative_key_ids.push(key_id);
		self
	}

	/// Add a blinding factor directly.
	pub fn add_blinding_factor(mut self, blind: BlindingFactor) -> BlindSum {
		self.positive_blinding_factors.push(blind);
		self
	}

	/// Subtract a blinding factor directly.
	pub fn sub_blinding_factor(mut self, blind: BlindingFactor) -> BlindSum {
		self.negative_blinding_factors.push(blind);
		self
	}
}

/// The keychain abstraction: derives keys and performs the commitment,
/// range-proof, and Schnorr signing operations needed to build a
/// Mimblewimble transaction, without ever exposing the master seed itself.
pub trait Keychain: Sync + Send + Clone {
	/// Restore a keychain from a raw seed.
	fn from_seed(seed: &[u8]) -> Result<Self, Error>;
	/// Build a keychain from fresh randomness (used by tests/new wallets).
	fn from_random_seed() -> Result<Self, Error>;
	/// The root identifier (empty path).
	fn root_key_id() -> Identifier;
	/// Derive the secret key for the given path.
	fn derived_key(&self, key_id: &Identifier) -> Result<SecretKey, Error>;
	/// `CommitBlinded`: commit to `amount` under the blind derived from `key_id`.
	fn commit(&self, amount: u64, key_id: &Identifier) -> Result<Commitment, Error>;
	/// Resolve a `BlindSum` into a single scalar blinding factor.
	fn blind_sum(&self, blind_sum: &BlindSum) -> Result<BlindingFactor, Error>;
	/// Schnorr-sign `msg` with the key derived from `key_id`.
	fn sign(&self, msg: &Message, key_id: &Identifier) -> Result<Signature, Error>;
	/// Schnorr-sign `msg` with an already-resolved blinding factor.
	fn sign_with_blinding(&self, msg: &Message, blinding: &BlindingFactor) -> Result<Signature, Error>;
	/// The shared secp context this keychain uses for all its arithmetic.
	fn secp(&self) -> &Secp256k1;
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::util::secp::key::ZERO_KEY;

	#[test]
	fn split_blinding_factor() {
		let secp = Secp256k1::new();
		let skey_in = SecretKey::new(&secp, &mut thread_rng());
		let blind = BlindingFactor::from_secret_key(skey_in);
		let split = blind.split(&secp).unwrap();

		let mut skey_sum = split.blind_1.secret_key(&secp).unwrap();
		let skey_2 = split.blind_2.secret_key(&secp).unwrap();
		skey_sum.add_assign(&secp, &skey_2).unwrap();
		assert_eq!(skey_in, skey_sum);
	}

	#[test]
	fn zero_key_addition() {
		let secp = Secp256k1::new();
		let skey_in = SecretKey::new(&secp, &mut thread_rng());
		let mut skey_out = skey_in;
		skey_out.add_assign(&secp, &ZERO_KEY).unwrap();
		assert_eq!(skey_in, skey_out);
	}
}
