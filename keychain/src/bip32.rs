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

// Rust Bitcoin Library
// Written in 2014 by
//     Andrew Poelstra <apoelstra@wpsoftware.net>
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to the
// public domain worldwide.

//! BIP32 hierarchical deterministic derivation, adapted to derive secp256k1
//! scalars for Mimblewimble blinding factors rather than ECDSA keys. The
//! hash function used at each derivation step is behind a trait so test
//! vectors can swap in a reference implementation.

use byteorder::{BigEndian, ByteOrder};
use digest::generic_array::GenericArray;
use hmac::{Hmac, Mac, NewMac};
use ripemd160::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Error;
use crate::path::ChildNumber;
use crate::util::secp::key::{PublicKey, SecretKey};
use crate::util::secp::Secp256k1;

type HmacSha512 = Hmac<Sha512>;

/// Seed constant mixed into the very first HMAC call, so an all-zero seed
/// does not collide with any other HMAC key used by the wallet.
const MASTER_SEED: &[u8; 12] = b"IamVoldemort";

/// Swappable hash backend for BIP32 derivation.
pub trait Bip32Hasher {
	/// Begin a new HMAC-SHA512 computation keyed by `seed`.
	fn init_sha512(&mut self, seed: &[u8]);
	/// Feed more data into the running HMAC.
	fn append_sha512(&mut self, value: &[u8]);
	/// Finalize and return the 64-byte HMAC output.
	fn result_sha512(&mut self) -> [u8; 64];
	/// SHA-256, used for the key fingerprint.
	fn sha_256(&self, input: &[u8]) -> [u8; 32];
	/// RIPEMD-160, used for the key fingerprint.
	fn ripemd_160(&self, input: &[u8]) -> [u8; 20];
}

/// Default hasher: plain HMAC-SHA512 / SHA256 / RIPEMD160.
#[derive(Clone)]
pub struct DefaultHasher {
	hmac: HmacSha512,
}

impl DefaultHasher {
	/// A hasher with no HMAC key set; `init_sha512` must be called before use.
	pub fn new() -> DefaultHasher {
		DefaultHasher {
			hmac: HmacSha512::new(GenericArray::from_slice(&[0u8; 128])),
		}
	}
}

impl Default for DefaultHasher {
	fn default() -> Self {
		Self::new()
	}
}

impl Bip32Hasher for DefaultHasher {
	fn init_sha512(&mut self, seed: &[u8]) {
		self.hmac = HmacSha512::new_from_slice(seed).expect("HMAC accepts a key of any length");
	}

	fn append_sha512(&mut self, value: &[u8]) {
		self.hmac.update(value);
	}

	fn result_sha512(&mut self) -> [u8; 64] {
		let mut out = [0u8; 64];
		out.copy_from_slice(&self.hmac.clone().finalize().into_bytes());
		out
	}

	fn sha_256(&self, input: &[u8]) -> [u8; 32] {
		let mut out = [0u8; 32];
		out.copy_from_slice(&Sha256::digest(input));
		out
	}

	fn ripemd_160(&self, input: &[u8]) -> [u8; 20] {
		let mut out = [0u8; 20];
		out.copy_from_slice(&Ripemd160::digest(input));
		out
	}
}

/// An extended private key: a secret scalar plus the chain code needed to
/// derive its children.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExtendedPrivKey {
	/// How many derivations this key is from the master (0 for master).
	pub depth: u8,
	/// Child number used to derive this key from its parent.
	pub child_number: ChildNumber,
	/// The secret scalar.
	pub secret_key: SecretKey,
	/// 32-byte chain code.
	pub chain_code: [u8; 32],
}

impl ExtendedPrivKey {
	/// Derive the master key from a raw seed.
	pub fn new_master<H: Bip32Hasher>(
		secp: &Secp256k1,
		hasher: &mut H,
		seed: &[u8],
	) -> Result<ExtendedPrivKey, Error> {
		hasher.init_sha512(MASTER_SEED);
		hasher.append_sha512(seed);
		let result = hasher.result_sha512();

		let mut chain_code = [0u8; 32];
		chain_code.copy_from_slice(&result[32..]);

		Ok(ExtendedPrivKey {
			depth: 0,
			child_number: ChildNumber::from_normal_idx(0),
			secret_key: SecretKey::from_slice(secp, &result[..32])?,
			chain_code,
		})
	}

	/// Derive the private key at `cnums`, relative to `self`.
	pub fn derive_priv<H: Bip32Hasher>(
		&self,
		secp: &Secp256k1,
		hasher: &mut H,
		cnums: &[ChildNumber],
	) -> Result<ExtendedPrivKey, Error> {
		let mut sk = self.clone();
		for cnum in cnums {
			sk = sk.ckd_priv(secp, hasher, *cnum)?;
		}
		Ok(sk)
	}

	/// Private -> private child key derivation.
	pub fn ckd_priv<H: Bip32Hasher>(
		&self,
		secp: &Secp256k1,
		hasher: &mut H,
		i: ChildNumber,
	) -> Result<ExtendedPrivKey, Error> {
		hasher.init_sha512(&self.chain_code);
		match i {
			ChildNumber::Normal { .. } => {
				let pubkey = PublicKey::from_secret_key(secp, &self.secret_key)?;
				hasher.append_sha512(&pubkey.serialize_vec(secp, true)[..]);
			}
			ChildNumber::Hardened { .. } => {
				hasher.append_sha512(&[0u8]);
				hasher.append_sha512(&self.secret_key[..]);
			}
		}
		let mut be_n = [0u8; 4];
		BigEndian::write_u32(&mut be_n, u32::from(i));
		hasher.append_sha512(&be_n);

		let result = hasher.result_sha512();
		let mut sk = SecretKey::from_slice(secp, &result[..32])?;
		sk.add_assign(secp, &self.secret_key)?;

		let mut chain_code = [0u8; 32];
		chain_code.copy_from_slice(&result[32..]);

		Ok(ExtendedPrivKey {
			depth: self.depth + 1,
			child_number: i,
			secret_key: sk,
			chain_code,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::path::ChildNumber;
	use crate::util::secp::ContextFlag;

	#[test]
	fn derivation_is_deterministic() {
		let secp = Secp256k1::with_caps(ContextFlag::Full);
		let mut h1 = DefaultHasher::new();
		let mut h2 = DefaultHasher::new();
		let seed = [7u8; 32];
		let master = ExtendedPrivKey::new_master(&secp, &mut h1, &seed).unwrap();

		let path = [ChildNumber::from_normal_idx(0), ChildNumber::from_normal_idx(3)];
		let a = master.derive_priv(&secp, &mut h1, &path).unwrap();
		let b = master.derive_priv(&secp, &mut h2, &path).unwrap();
		assert_eq!(a.secret_key, b.secret_key);
	}

	#[test]
	fn distinct_paths_diverge() {
		let secp = Secp256k1::with_caps(ContextFlag::Full);
		let mut h = DefaultHasher::new();
		let seed = [9u8; 32];
		let master = ExtendedPrivKey::new_master(&secp, &mut h, &seed).unwrap();

		let a = master
			.derive_priv(&secp, &mut h, &[ChildNumber::from_normal_idx(0)])
			.unwrap();
		let b = master
			.derive_priv(&secp, &mut h, &[ChildNumber::from_normal_idx(1)])
			.unwrap();
		assert_ne!(a.secret_key, b.secret_key);
	}
}
