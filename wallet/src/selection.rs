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

//! Coin selection and change-output construction (§4.3): which spendable
//! outputs a send draws from, and the fresh change output(s) it leaves
//! behind.

use mw_core::libtx::build;
use mw_core::{fee::tx_fee, KernelFeatures};
use mw_keychain::{Identifier, Keychain};

use crate::database::{OutputFilter, WalletBackend};
use crate::error::{Error, ErrorKind};
use crate::types::{OutputData, SelectionStrategy};

/// A selected set of inputs, the fee they must cover, and the combinators
/// needed to append them (plus fresh change) to a transaction under
/// construction.
pub struct SelectedCoins {
	/// Outputs chosen as inputs.
	pub coins: Vec<OutputData>,
	/// Fee the resulting transaction will carry.
	pub fee: u64,
	/// `key_id, value` for each change output allocated.
	pub change: Vec<(Identifier, u64)>,
}

/// Select inputs per `strategy` and build the matching change outputs,
/// returning both the selection and the `Append` combinators ready to fold
/// into a [`build::partial_transaction`] call.
pub fn select_and_build<K, W>(
	_keychain: &K,
	wallet: &W,
	parent_key_id: &Identifier,
	amount: u64,
	num_change_outputs: usize,
	strategy: &SelectionStrategy,
	fee_base: Option<u64>,
) -> Result<(SelectedCoins, Vec<Box<build::Append<K>>>), Error>
where
	K: Keychain,
	W: WalletBackend,
{
	let spendable = wallet.outputs(OutputFilter::Status(crate::types::OutputStatus::Spendable))?;

	let coins = choose_coins(spendable, amount, num_change_outputs, strategy, fee_base)?;
	let total: u64 = coins.iter().map(|c| c.value).sum();

	let num_outputs = num_change_outputs + 1;
	let fee = tx_fee(coins.len(), num_outputs, 1, fee_base);
	if total < amount + fee {
		return Err(ErrorKind::InsufficientFunds {
			needed: amount + fee,
			available: total,
		}
		.into());
	}

	let mut elems: Vec<Box<build::Append<K>>> = vec![build::with_fee(fee)];
	for coin in &coins {
		elems.push(build::input(coin.value, coin.key_id));
	}

	let change_total = total - amount - fee;
	let mut change = vec![];
	if change_total > 0 {
		let part = change_total / num_change_outputs as u64;
		let remainder = change_total % num_change_outputs as u64;
		for i in 0..num_change_outputs {
			let value = if i == num_change_outputs - 1 { part + remainder } else { part };
			if value == 0 {
				continue;
			}
			let key_id = wallet.next_child_path(parent_key_id)?;
			elems.push(build::output(value, key_id));
			change.push((key_id, value));
		}
	}

	Ok((SelectedCoins { coins, fee, change }, elems))
}

fn choose_coins(
	mut spendable: Vec<OutputData>,
	amount: u64,
	num_change_outputs: usize,
	strategy: &SelectionStrategy,
	fee_base: Option<u64>,
) -> Result<Vec<OutputData>, Error> {
	match strategy {
		SelectionStrategy::All => {
			if spendable.is_empty() {
				return Err(ErrorKind::InvalidStrategy.into());
			}
			Ok(spendable)
		}
		SelectionStrategy::Custom(commitments) => {
			let chosen: Vec<OutputData> = spendable
				.into_iter()
				.filter(|o| commitments.contains(&o.commit))
				.collect();
			if chosen.len() != commitments.len() {
				return Err(ErrorKind::InvalidStrategy.into());
			}
			Ok(chosen)
		}
		SelectionStrategy::Smallest => {
			spendable.sort_by_key(|o| o.value);
			let num_outputs = num_change_outputs + 1;
			let mut selected = vec![];
			let mut total = 0u64;
			for coin in spendable {
				if total >= amount + tx_fee(selected.len(), num_outputs, 1, fee_base) {
					break;
				}
				total += coin.value;
				selected.push(coin);
			}
			if selected.is_empty() {
				return Err(ErrorKind::InsufficientFunds { needed: amount, available: 0 }.into());
			}
			Ok(selected)
		}
	}
}

/// The transaction's kernel features for a plain send with the given fee
/// and lock height.
pub fn kernel_features(fee: u64, lock_height: u64) -> KernelFeatures {
	if lock_height > 0 {
		KernelFeatures::HeightLocked { fee, lock_height }
	} else {
		KernelFeatures::Plain { fee }
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::database::MemoryWalletBackend;
	use crate::types::OutputStatus;
	use mw_keychain::ExtKeychain;
	use mw_util::secp::pedersen::Commitment;

	fn seed_output(wallet: &MemoryWalletBackend, keychain: &ExtKeychain, idx: u32, value: u64) -> OutputData {
		let key_id = wallet.next_child_path(&ExtKeychain::root_key_id()).unwrap();
		let _ = idx;
		let commit = keychain.commit(value, &key_id).unwrap();
		let output = OutputData {
			key_id,
			commit,
			value,
			status: OutputStatus::Spendable,
			block_height: Some(idx as u64),
			mmr_index: None,
			wallet_tx_id: None,
			label: None,
		};
		let mut batch = wallet.batch().unwrap();
		batch.save_output(output.clone()).unwrap();
		batch.commit().unwrap();
		output
	}

	#[test]
	fn smallest_strategy_stops_as_soon_as_amount_plus_fee_is_covered() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let wallet = MemoryWalletBackend::new();
		let parent = ExtKeychain::root_key_id();
		seed_output(&wallet, &keychain, 0, 10);
		seed_output(&wallet, &keychain, 1, 1_000_000);
		seed_output(&wallet, &keychain, 2, 2_000_000);

		let (selected, _elems) =
			select_and_build(&keychain, &wallet, &parent, 1_500_000, 1, &SelectionStrategy::Smallest, None).unwrap();
		assert!(selected.coins.iter().map(|c| c.value).sum::<u64>() >= 1_500_000 + selected.fee);
	}

	#[test]
	fn insufficient_funds_is_reported() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let wallet = MemoryWalletBackend::new();
		let parent = ExtKeychain::root_key_id();
		seed_output(&wallet, &keychain, 0, 10);

		let err =
			select_and_build(&keychain, &wallet, &parent, 1_000_000, 1, &SelectionStrategy::Smallest, None).unwrap_err();
		assert!(matches!(err.kind(), crate::error::ErrorKind::InsufficientFunds { .. }));
	}

	#[test]
	fn custom_strategy_rejects_a_commitment_that_is_not_spendable() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let wallet = MemoryWalletBackend::new();
		let parent = ExtKeychain::root_key_id();
		seed_output(&wallet, &keychain, 0, 10_000);

		let bogus = Commitment::from_vec(vec![0xAB; 33]);
		let err = select_and_build(
			&keychain,
			&wallet,
			&parent,
			1,
			1,
			&SelectionStrategy::Custom(vec![bogus]),
			None,
		)
		.unwrap_err();
		assert!(matches!(err.kind(), crate::error::ErrorKind::InvalidStrategy));
	}

	#[test]
	fn an_explicit_fee_base_overrides_the_default() {
		let keychain = ExtKeychain::from_random_seed().unwrap();
		let wallet = MemoryWalletBackend::new();
		let parent = ExtKeychain::root_key_id();
		seed_output(&wallet, &keychain, 0, 10_000);

		let (selected, _elems) =
			select_and_build(&keychain, &wallet, &parent, 1_000, 1, &SelectionStrategy::All, Some(1_000)).unwrap();
		// one input, one change output plus the recipient's, one kernel:
		// fee = 1_000 * (2 * 4 + 1 - 1) = 8_000
		assert_eq!(selected.fee, 8_000);
	}
}
