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

//! Combinators for building up a transaction one element at a time,
//! threading a running [`BlindSum`] alongside it so the final signing key
//! can be derived once every input and output has been added.
//!
//! ```ignore
//! let (tx, blind) = build::partial_transaction(
//!     KernelFeatures::Plain { fee: 2 },
//!     vec![build::input(75, id1), build::output(42, id2), build::output(31, id3)],
//!     &keychain,
//! )?;
//! ```

use mw_keychain::{BlindSum, Keychain};

use crate::core::{Input, KernelFeatures, Output, OutputFeatures, Transaction, TxKernel};
use crate::error::Error;

/// State threaded through every combinator in a single build.
pub struct Context<'a, K>
where
	K: Keychain,
{
	/// Keychain used to derive blinds and commitments.
	pub keychain: &'a K,
}

/// One step of a transaction build: takes the accumulated
/// `(Transaction, TxKernel, BlindSum)` and returns it extended by whatever
/// this combinator adds.
pub type Append<K> = dyn for<'a> Fn(
	&'a mut Context<'_, K>,
	Result<(Transaction, TxKernel, BlindSum), Error>,
) -> Result<(Transaction, TxKernel, BlindSum), Error>;

fn build_input<K: Keychain>(
	value: u64,
	features: OutputFeatures,
	key_id: mw_keychain::Identifier,
) -> Box<Append<K>> {
	Box::new(move |ctx, acc| {
		let (tx, kern, sum) = acc?;
		let commit = ctx.keychain.commit(value, &key_id)?;
		let input = Input::new(features, commit);
		Ok((tx.with_input(input), kern, sum.sub_key_id(key_id.clone())))
	})
}

/// Spend a plain output of `value` derived at `key_id`.
pub fn input<K: Keychain>(value: u64, key_id: mw_keychain::Identifier) -> Box<Append<K>> {
	build_input(value, OutputFeatures::Plain, key_id)
}

/// Spend a matured coinbase output of `value` derived at `key_id`.
pub fn coinbase_input<K: Keychain>(value: u64, key_id: mw_keychain::Identifier) -> Box<Append<K>> {
	build_input(value, OutputFeatures::Coinbase, key_id)
}

/// Create a fresh plain output of `value` at `key_id`, with a range proof.
pub fn output<K: Keychain>(value: u64, key_id: mw_keychain::Identifier) -> Box<Append<K>> {
	Box::new(move |ctx, acc| {
		let (tx, kern, sum) = acc?;
		let secp = ctx.keychain.secp();
		let commit = ctx.keychain.commit(value, &key_id)?;
		let blind = ctx.keychain.derived_key(&key_id)?;
		let proof = secp.range_proof(0, value, blind, commit);
		Ok((
			tx.with_output(Output {
				features: OutputFeatures::Plain,
				commit,
				proof,
			}),
			kern,
			sum.add_key_id(key_id.clone()),
		))
	})
}

/// Fold a known blinding factor into the running sum directly, rather than
/// through a derived key (used to carry a Phase-R recipient excess into
/// the sender's Phase-F build).
pub fn with_excess<K: Keychain>(excess: mw_keychain::BlindingFactor) -> Box<Append<K>> {
	Box::new(move |_ctx, acc| acc.map(|(tx, kern, sum)| (tx, kern, sum.add_blinding_factor(excess))))
}

/// Set the kernel's fee.
pub fn with_fee<K: Keychain>(fee: u64) -> Box<Append<K>> {
	Box::new(move |_ctx, acc| {
		acc.map(|(tx, mut kern, sum)| {
			kern.features = match kern.features {
				KernelFeatures::HeightLocked { lock_height, .. } => KernelFeatures::HeightLocked { fee, lock_height },
				_ => KernelFeatures::Plain { fee },
			};
			(tx, kern, sum)
		})
	})
}

/// Set the kernel's lock height, switching it to `HeightLocked` if it
/// wasn't already.
pub fn with_lock_height<K: Keychain>(lock_height: u64) -> Box<Append<K>> {
	Box::new(move |_ctx, acc| {
		acc.map(|(tx, mut kern, sum)| {
			if lock_height > 0 {
				kern.features = KernelFeatures::HeightLocked {
					fee: kern.features.fee(),
					lock_height,
				};
			}
			(tx, kern, sum)
		})
	})
}

/// Runs every combinator in `elems` in order, folding a fresh, single-kernel
/// transaction out of an initially-empty one, and returns it alongside the
/// resolved single blinding factor that still needs to be signed (the
/// caller decides whether that's the whole excess or just this
/// participant's share).
pub fn partial_transaction<K: Keychain>(
	features: KernelFeatures,
	elems: Vec<Box<Append<K>>>,
	keychain: &K,
) -> Result<(Transaction, mw_keychain::BlindingFactor), Error> {
	let mut ctx = Context { keychain };
	let (tx, kern, sum) = elems.iter().fold(
		Ok((Transaction::empty(), TxKernel::with_features(features), BlindSum::new())),
		|acc, elem| elem(&mut ctx, acc),
	)?;
	let tx = tx.with_kernel(kern);
	let blind = keychain.blind_sum(&sum)?;
	Ok((tx, blind))
}

#[cfg(test)]
mod test {
	use super::*;
	use mw_keychain::{ExtKeychain, Identifier, Path};

	fn test_keychain() -> ExtKeychain {
		ExtKeychain::from_seed(b"libtx build module test seed!!!").unwrap()
	}

	#[test]
	fn input_and_output_sum_to_the_blinding_factor_difference() {
		let keychain = test_keychain();
		let id1 = Identifier::from_path(&Path::new(&[0, 0]).unwrap());
		let id2 = Identifier::from_path(&Path::new(&[0, 1]).unwrap());
		let id3 = Identifier::from_path(&Path::new(&[0, 2]).unwrap());

		// fund id1 with 100 so it can be spent as an input below
		let _ = keychain.commit(100, &id1).unwrap();

		let (tx, _blind) = partial_transaction(
			KernelFeatures::Plain { fee: 2 },
			vec![
				input::<ExtKeychain>(100, id1),
				output::<ExtKeychain>(60, id2),
				output::<ExtKeychain>(38, id3),
				with_fee::<ExtKeychain>(2),
			],
			&keychain,
		)
		.unwrap();

		assert_eq!(tx.body.inputs.len(), 1);
		assert_eq!(tx.body.outputs.len(), 2);
		assert_eq!(tx.fee(), 2);
	}
}
