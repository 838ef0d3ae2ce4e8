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

//! `ExtKeychain`: the concrete, BIP32-backed `Keychain` implementation.
//! Holds the wallet's master seed for the lifetime of an unlocked session;
//! the seed is zeroized on drop and never serialized or logged.

use rand::{thread_rng, RngCore};
use zeroize::Zeroize;

use crate::bip32::{DefaultHasher, ExtendedPrivKey};
use crate::error::Error;
use crate::path::{Identifier, Path};
use crate::types::{BlindSum, BlindingFactor, Keychain};
use crate::util::secp::key::SecretKey;
use crate::util::secp::pedersen::Commitment;
use crate::util::secp::{ContextFlag, Message, Secp256k1, Signature};

/// A BIP32-derived keychain. Cheap to clone (the seed is reference-counted
/// in all but name - in practice one `ExtKeychain` lives per unlocked
/// wallet and is passed around by reference).
#[derive(Clone)]
pub struct ExtKeychain {
	secp: Secp256k1,
	seed: Vec<u8>,
}

impl Drop for ExtKeychain {
	fn drop(&mut self) {
		self.seed.zeroize();
	}
}

impl ExtKeychain {
	fn master(&self) -> Result<ExtendedPrivKey, Error> {
		let mut hasher = DefaultHasher::new();
		ExtendedPrivKey::new_master(&self.secp, &mut hasher, &self.seed)
	}

	/// Derive the private key for an arbitrary path, without going through
	/// an `Identifier`. Used internally and by callers building a fresh
	/// `Identifier` from scratch (e.g. account root allocation).
	pub fn derive_priv(&self, path: &Path) -> Result<SecretKey, Error> {
		let master = self.master()?;
		let mut hasher = DefaultHasher::new();
		let cnums: Vec<_> = (0..path.depth as usize).map(|i| path.path[i]).collect();
		let ext = master.derive_priv(&self.secp, &mut hasher, &cnums)?;
		Ok(ext.secret_key)
	}
}

impl Keychain for ExtKeychain {
	fn from_seed(seed: &[u8]) -> Result<ExtKeychain, Error> {
		let secp = Secp256k1::with_caps(ContextFlag::Commit);
		// fail fast if the seed can't even produce a master key
		let keychain = ExtKeychain {
			secp,
			seed: seed.to_vec(),
		};
		let _ = keychain.master()?;
		Ok(keychain)
	}

	fn from_random_seed() -> Result<ExtKeychain, Error> {
		let mut seed = vec![0u8; 32];
		thread_rng().fill_bytes(&mut seed);
		ExtKeychain::from_seed(&seed)
	}

	fn root_key_id() -> Identifier {
		Identifier::from_path(&Path::zero())
	}

	fn derived_key(&self, key_id: &Identifier) -> Result<SecretKey, Error> {
		self.derive_priv(&key_id.to_path())
	}

	fn commit(&self, amount: u64, key_id: &Identifier) -> Result<Commitment, Error> {
		let skey = self.derived_key(key_id)?;
		self.secp.commit(amount, skey).map_err(Error::from)
	}

	fn blind_sum(&self, blind_sum: &BlindSum) -> Result<BlindingFactor, Error> {
		let mut pos_keys: Vec<SecretKey> = blind_sum
			.positive_key_ids
			.iter()
			.map(|id| self.derived_key(id))
			.collect::<Result<_, _>>()?;
		let neg_keys: Vec<SecretKey> = blind_sum
			.negative_key_ids
			.iter()
			.map(|id| self.derived_key(id))
			.collect::<Result<_, _>>()?;

		for b in &blind_sum.positive_blinding_factors {
			pos_keys.push(b.secret_key(&self.secp)?);
		}
		let mut neg_keys = neg_keys;
		for b in &blind_sum.negative_blinding_factors {
			neg_keys.push(b.secret_key(&self.secp)?);
		}

		let sum = self.secp.blind_sum(pos_keys, neg_keys)?;
		Ok(BlindingFactor::from_secret_key(sum))
	}

	fn sign(&self, msg: &Message, key_id: &Identifier) -> Result<Signature, Error> {
		let skey = self.derived_key(key_id)?;
		self.secp.sign(msg, &skey).map_err(Error::from)
	}

	fn sign_with_blinding(&self, msg: &Message, blinding: &BlindingFactor) -> Result<Signature, Error> {
		let skey = blinding.secret_key(&self.secp)?;
		self.secp.sign(msg, &skey).map_err(Error::from)
	}

	fn secp(&self) -> &Secp256k1 {
		&self.secp
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn commit_and_verify_roundtrip() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let key_id = Identifier::from_path(&Path::new(&[0, 1]).unwrap());

		let commit = keychain.commit(100, &key_id).unwrap();
		let msg = Message::from_slice(&[0; 32]).unwrap();
		let sig = keychain.sign(&msg, &key_id).unwrap();
		keychain.secp().verify_from_commit(&msg, &sig, &commit).unwrap();
	}

	#[test]
	fn same_path_same_key() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let id = Identifier::from_path(&Path::new(&[2, 0, 5]).unwrap());
		let k1 = keychain.derived_key(&id).unwrap();
		let k2 = keychain.derived_key(&id).unwrap();
		assert_eq!(k1, k2);
	}

	#[test]
	fn distinct_accounts_diverge() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let a = Identifier::from_path(&Path::new(&[2, 0, 0]).unwrap());
		let b = Identifier::from_path(&Path::new(&[3, 0, 0]).unwrap());
		assert_ne!(keychain.derived_key(&a).unwrap(), keychain.derived_key(&b).unwrap());
	}

	#[test]
	fn blind_sum_cancels() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let id = Identifier::from_path(&Path::new(&[0, 9]).unwrap());
		let sum = BlindSum::new().add_key_id(id).sub_key_id(id);
		let blind = keychain.blind_sum(&sum).unwrap();
		assert_eq!(blind.secret_key(keychain.secp()).unwrap(), crate::util::secp::key::ZERO_KEY);
	}
}
