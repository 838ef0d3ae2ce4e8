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

//! Reconciling the wallet's view of its own outputs and transactions with
//! the chain (§4.6): ordinary refresh against already-tracked commitments,
//! a from-genesis rescan for a wallet restored from just its seed, and
//! log-hygiene for abandoned sends/receives.

use blake2_rfc::blake2b::blake2b;
use chrono::{DateTime, Duration, Utc};

use mw_keychain::{ChildNumber, Identifier, Keychain};
use mw_util::secp::pedersen::Commitment;

use crate::database::{OutputFilter, WalletBackend};
use crate::error::Error;
use crate::keys::default_account_root;
use crate::node_client::NodeClient;
use crate::types::{OutputData, OutputStatus, WalletInfo, WalletTxType};

/// Blocks a coinbase output must wait past its confirming height before it
/// is spendable.
pub const COINBASE_MATURITY: u64 = 1_440;

/// How many consecutive un-derivable indices a rescan tries per account
/// before concluding that account has no more outputs to recover. Outputs
/// are allocated by `next_child_path` in order, so a long unbroken run of
/// misses means the account's history has been exhausted.
pub const DEFAULT_GAP_LIMIT: u32 = 20;

const COINBASE_LABEL: &str = "coinbase";

fn is_coinbase(output: &OutputData) -> bool {
	output.label.as_deref() == Some(COINBASE_LABEL)
}

/// Reconcile every tracked, non-terminal output (and the transactions that
/// created them) against the node's current view of the chain.
pub fn refresh_outputs<W, C>(wallet: &W, client: &C) -> Result<(), Error>
where
	W: WalletBackend,
	C: NodeClient,
{
	let current_height = client.get_chain_height()?;
	let tracked: Vec<OutputData> = wallet
		.outputs(OutputFilter::All)?
		.into_iter()
		.filter(|o| !matches!(o.status, OutputStatus::Spent | OutputStatus::Cancelled))
		.collect();
	if tracked.is_empty() {
		return Ok(());
	}

	let commits: Vec<Commitment> = tracked.iter().map(|o| o.commit).collect();
	let onchain = client.get_outputs_by_commitment(&commits)?;

	let mut batch = wallet.batch()?;
	for mut output in tracked {
		match onchain.get(&output.commit) {
			Some(loc) => {
				let already_confirmed = output.block_height.is_some();
				output.block_height = Some(loc.height);
				output.mmr_index = Some(loc.mmr_index);

				if output.status == OutputStatus::Immature
					&& (!is_coinbase(&output) || current_height >= loc.height + COINBASE_MATURITY)
				{
					output.status = OutputStatus::Spendable;
				}

				if !already_confirmed {
					if let Some(tx_id) = output.wallet_tx_id {
						if let Some(mut tx) = wallet.transaction(tx_id)? {
							if tx.confirmed_at.is_none() {
								let header = client.get_header_info(loc.height)?;
								tx.confirmed_at =
									Some(DateTime::from_timestamp(header.timestamp, 0).unwrap_or_else(Utc::now));
								tx.confirmation_height = Some(loc.height);
								if tx.tx_type == WalletTxType::ReceivingInProgress {
									tx.tx_type = WalletTxType::Received;
								}
								batch.save_transaction(tx)?;
							}
						}
					}
				}
			}
			None => {
				if matches!(output.status, OutputStatus::Spendable | OutputStatus::Locked) {
					log::debug!("output {:?} no longer found on chain, marking spent", output.commit);
					output.mark_spent();
				} else if output.status == OutputStatus::Immature && output.block_height.is_some() {
					log::warn!(
						"previously confirmed coinbase output {:?} has disappeared; possible reorg",
						output.commit
					);
				}
			}
		}
		batch.save_output(output)?;
	}
	batch.commit()
}

/// Summarize an account's outputs into the aggregate view a balance query
/// returns. Callers wanting up-to-date figures should `refresh_outputs`
/// first; this function only reads the wallet's current local state.
pub fn wallet_info<W: WalletBackend>(wallet: &W, current_height: u64) -> Result<WalletInfo, Error> {
	let mut info = WalletInfo {
		current_height,
		..WalletInfo::default()
	};
	for output in wallet.outputs(OutputFilter::All)? {
		match output.status {
			OutputStatus::Spendable => {
				info.total += output.value;
				info.amount_currently_spendable += output.value;
			}
			OutputStatus::Immature => {
				info.total += output.value;
				info.amount_awaiting_confirmation += output.value;
			}
			OutputStatus::Locked => {
				info.total += output.value;
				info.amount_confirmed_but_locked += output.value;
			}
			OutputStatus::Spent | OutputStatus::Cancelled => {}
		}
	}
	Ok(info)
}

/// Every account root a rescan should brute-force child indices under.
fn rescan_parents<W: WalletBackend>(wallet: &W) -> Result<Vec<Identifier>, Error> {
	let accounts = wallet.acct_path_iter()?;
	if accounts.is_empty() {
		Ok(vec![default_account_root()])
	} else {
		Ok(accounts.into_iter().map(|a| a.root_path).collect())
	}
}

/// The nonce a rewind is keyed on: the wallet's root identity hashed
/// together with the commitment being probed, so any output on chain can be
/// tested without already knowing which child key produced it.
fn rewind_nonce(root_key_id: &Identifier, commit: &Commitment) -> [u8; 32] {
	let hashed = blake2b(32, &commit.0, &root_key_id.to_bytes());
	let mut nonce = [0u8; 32];
	nonce.copy_from_slice(hashed.as_bytes());
	nonce
}

/// Match a rewound `(commit, value)` pair back to the specific child key
/// that produced it, by brute-forcing indices under each candidate parent.
/// Mimblewimble commitments bind the value as well as the blind, so this is
/// the only way to recover a `key_id`: the rewind proves the value, and a
/// commitment re-derived at the right index is the only way to prove which
/// key it belongs to.
fn locate_output_key<K: Keychain>(
	keychain: &K,
	parents: &[Identifier],
	commit: Commitment,
	value: u64,
	gap_limit: u32,
) -> Result<Option<(Identifier, Identifier)>, Error> {
	for parent in parents {
		for index in 0..gap_limit {
			let path = parent.to_path().extend(ChildNumber::from_normal_idx(index))?;
			let candidate = Identifier::from_path(&path);
			if keychain.commit(value, &candidate)? == commit {
				return Ok(Some((*parent, candidate)));
			}
		}
	}
	Ok(None)
}

/// Recover outputs a wallet restored from just its seed has no record of,
/// by rewinding every range proof on chain and testing whether this
/// wallet's nonce opens it. Returns the number of outputs recovered.
pub fn restore_from_seed<K, W, C>(keychain: &K, wallet: &W, client: &C, gap_limit: u32) -> Result<usize, Error>
where
	K: Keychain,
	W: WalletBackend,
	C: NodeClient,
{
	let parents = rescan_parents(wallet)?;
	let root_key_id = K::root_key_id();
	let current_height = client.get_chain_height()?;

	let mut recovered = 0usize;
	let mut start_index = 0u64;
	loop {
		let (highest_index, page) = client.get_unspent_outputs(start_index, 1_000)?;
		if page.is_empty() {
			break;
		}

		for chain_out in &page {
			if wallet.output(&chain_out.commit)?.is_some() {
				continue;
			}

			let nonce = rewind_nonce(&root_key_id, &chain_out.commit);
			let info = keychain
				.secp()
				.rewind_range_proof(chain_out.commit, chain_out.proof.clone(), nonce);
			if !info.success {
				continue;
			}

			let located = locate_output_key(keychain, &parents, chain_out.commit, info.value, gap_limit)?;
			let (parent, key_id) = match located {
				Some(found) => found,
				None => {
					log::warn!(
						"rewound an output at our own nonce but could not locate its key within the gap limit"
					);
					continue;
				}
			};

			let path = key_id.to_path();
			let next_index = u32::from(path.path[path.depth as usize - 1]) + 1;
			wallet.advance_child_path(&parent, next_index)?;

			let mature = !chain_out.is_coinbase || current_height >= chain_out.height + COINBASE_MATURITY;
			let mut batch = wallet.batch()?;
			batch.save_output(OutputData {
				key_id,
				commit: chain_out.commit,
				value: info.value,
				status: if mature {
					OutputStatus::Spendable
				} else {
					OutputStatus::Immature
				},
				block_height: Some(chain_out.height),
				mmr_index: None,
				wallet_tx_id: None,
				label: if chain_out.is_coinbase {
					Some(COINBASE_LABEL.to_string())
				} else {
					None
				},
			})?;
			batch.commit()?;
			recovered += 1;
		}

		start_index += page.len() as u64;
		if start_index >= highest_index {
			break;
		}
	}

	Ok(recovered)
}

/// Delete unconfirmed send/receive log entries older than `max_age`. This
/// never touches `OutputData`: an abandoned send has already unlocked its
/// inputs via `cancel_tx`, and an abandoned receive never locked anything,
/// so there is nothing left for this pass to do but stop the log from
/// growing without bound.
pub fn sweep_stale_unconfirmed<W: WalletBackend>(wallet: &W, max_age: Duration) -> Result<usize, Error> {
	let cutoff = Utc::now() - max_age;
	let stale: Vec<_> = wallet
		.transactions()?
		.into_iter()
		.filter(|tx| {
			matches!(tx.tx_type, WalletTxType::SendingStarted | WalletTxType::ReceivingInProgress)
				&& tx.confirmed_at.is_none()
				&& tx.created_at < cutoff
		})
		.collect();
	if stale.is_empty() {
		return Ok(0);
	}

	let mut batch = wallet.batch()?;
	let count = stale.len();
	for mut tx in stale {
		tx.tx_type = match tx.tx_type {
			WalletTxType::SendingStarted => WalletTxType::SendingCancelled,
			WalletTxType::ReceivingInProgress => WalletTxType::ReceivedCancelled,
			other => other,
		};
		batch.save_transaction(tx)?;
	}
	batch.commit()?;
	Ok(count)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::database::MemoryWalletBackend;
	use crate::node_client::MockNodeClient;
	use crate::types::WalletTx;
	use mw_keychain::ExtKeychain;

	fn keychain() -> ExtKeychain {
		ExtKeychain::from_seed(b"refresh test seed").unwrap()
	}

	fn seed_tracked_output(wallet: &MemoryWalletBackend, kc: &ExtKeychain, value: u64) -> OutputData {
		let parent = ExtKeychain::root_key_id();
		let key_id = wallet.next_child_path(&parent).unwrap();
		let commit = kc.commit(value, &key_id).unwrap();
		let output = OutputData {
			key_id,
			commit,
			value,
			status: OutputStatus::Immature,
			block_height: None,
			mmr_index: None,
			wallet_tx_id: None,
			label: Some(COINBASE_LABEL.to_string()),
		};
		let mut batch = wallet.batch().unwrap();
		batch.save_output(output.clone()).unwrap();
		batch.commit().unwrap();
		output
	}

	#[test]
	fn immature_coinbase_becomes_spendable_once_matured() {
		let kc = keychain();
		let wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();

		let output = seed_tracked_output(&wallet, &kc, 60_000_000_000);
		node.confirm_output(output.commit, 10, 0);
		node.set_height(10 + COINBASE_MATURITY);

		refresh_outputs(&wallet, &node).unwrap();

		let refreshed = wallet.output(&output.commit).unwrap().unwrap();
		assert_eq!(refreshed.status, OutputStatus::Spendable);
		assert_eq!(refreshed.block_height, Some(10));
	}

	#[test]
	fn immature_coinbase_stays_immature_before_maturity() {
		let kc = keychain();
		let wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();

		let output = seed_tracked_output(&wallet, &kc, 60_000_000_000);
		node.confirm_output(output.commit, 10, 0);
		node.set_height(10 + COINBASE_MATURITY - 1);

		refresh_outputs(&wallet, &node).unwrap();

		let refreshed = wallet.output(&output.commit).unwrap().unwrap();
		assert_eq!(refreshed.status, OutputStatus::Immature);
	}

	#[test]
	fn spendable_output_absent_from_chain_is_marked_spent() {
		let kc = keychain();
		let wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();
		node.set_height(100);

		let parent = ExtKeychain::root_key_id();
		let key_id = wallet.next_child_path(&parent).unwrap();
		let commit = kc.commit(10_000, &key_id).unwrap();
		let output = OutputData {
			key_id,
			commit,
			value: 10_000,
			status: OutputStatus::Spendable,
			block_height: Some(5),
			mmr_index: Some(0),
			wallet_tx_id: None,
			label: None,
		};
		let mut batch = wallet.batch().unwrap();
		batch.save_output(output).unwrap();
		batch.commit().unwrap();

		refresh_outputs(&wallet, &node).unwrap();

		let refreshed = wallet.output(&commit).unwrap().unwrap();
		assert_eq!(refreshed.status, OutputStatus::Spent);
	}

	#[test]
	fn restore_recovers_an_output_the_wallet_lost_its_own_record_of() {
		let kc = keychain();
		let wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();
		node.set_height(50);

		let parent = ExtKeychain::root_key_id();
		let key_id = wallet.next_child_path(&parent).unwrap();
		let value = 42_000_000u64;
		let commit = kc.commit(value, &key_id).unwrap();
		let skey = kc.derived_key(&key_id).unwrap();
		let root_key_id = ExtKeychain::root_key_id();
		let nonce = rewind_nonce(&root_key_id, &commit);
		let proof = kc.secp().range_proof(0, value, skey, commit);
		assert!(kc.secp().rewind_range_proof(commit, proof.clone(), nonce).success);

		node.push_chain_output(commit, proof, false, 40);

		// The wallet never recorded this output locally (e.g. restored from
		// seed alone), so the happy-path lookup below must find nothing yet.
		assert!(wallet.output(&commit).unwrap().is_none());

		let recovered = restore_from_seed(&kc, &wallet, &node, DEFAULT_GAP_LIMIT).unwrap();
		assert_eq!(recovered, 1);

		let found = wallet.output(&commit).unwrap().unwrap();
		assert_eq!(found.value, value);
		assert_eq!(found.status, OutputStatus::Spendable);
	}

	#[test]
	fn refresh_stamps_confirmation_time_on_a_newly_confirmed_send() {
		let kc = keychain();
		let wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();
		node.set_height(20);
		node.add_header(12, 1_700_000_000);

		let parent = ExtKeychain::root_key_id();
		let key_id = wallet.next_child_path(&parent).unwrap();
		let commit = kc.commit(500_000, &key_id).unwrap();
		let mut batch = wallet.batch().unwrap();
		batch
			.save_transaction(WalletTx {
				id: 0,
				tx_type: WalletTxType::SendingFinalized,
				slate_id: None,
				counterparty_address: None,
				message: None,
				created_at: Utc::now(),
				confirmed_at: None,
				confirmation_height: None,
				credited: 0,
				debited: 500_000,
				fee: Some(10),
				tx_snapshot: None,
			})
			.unwrap();
		batch
			.save_output(OutputData {
				key_id,
				commit,
				value: 500_000,
				status: OutputStatus::Spendable,
				block_height: None,
				mmr_index: None,
				wallet_tx_id: Some(0),
				label: None,
			})
			.unwrap();
		batch.commit().unwrap();

		node.confirm_output(commit, 12, 7);
		refresh_outputs(&wallet, &node).unwrap();

		let tx = wallet.transaction(0).unwrap().unwrap();
		assert_eq!(tx.confirmation_height, Some(12));
		assert!(tx.confirmed_at.is_some());
		assert_eq!(tx.tx_type, WalletTxType::SendingFinalized);
		let output = wallet.output(&commit).unwrap().unwrap();
		assert_eq!(output.mmr_index, Some(7));
	}

	#[test]
	fn refresh_moves_a_confirmed_receive_from_in_progress_to_received() {
		let kc = keychain();
		let wallet = MemoryWalletBackend::new();
		let node = MockNodeClient::new();
		node.set_height(20);
		node.add_header(12, 1_700_000_000);

		let parent = ExtKeychain::root_key_id();
		let key_id = wallet.next_child_path(&parent).unwrap();
		let commit = kc.commit(500_000, &key_id).unwrap();
		let mut batch = wallet.batch().unwrap();
		batch
			.save_transaction(WalletTx {
				id: 0,
				tx_type: WalletTxType::ReceivingInProgress,
				slate_id: None,
				counterparty_address: None,
				message: None,
				created_at: Utc::now(),
				confirmed_at: None,
				confirmation_height: None,
				credited: 500_000,
				debited: 0,
				fee: Some(10),
				tx_snapshot: None,
			})
			.unwrap();
		batch
			.save_output(OutputData {
				key_id,
				commit,
				value: 500_000,
				status: OutputStatus::Spendable,
				block_height: None,
				mmr_index: None,
				wallet_tx_id: Some(0),
				label: None,
			})
			.unwrap();
		batch.commit().unwrap();

		node.confirm_output(commit, 12, 7);
		refresh_outputs(&wallet, &node).unwrap();

		let tx = wallet.transaction(0).unwrap().unwrap();
		assert_eq!(tx.tx_type, WalletTxType::Received);
	}

	#[test]
	fn wallet_info_sums_outputs_by_status() {
		let kc = keychain();
		let wallet = MemoryWalletBackend::new();
		seed_tracked_output(&wallet, &kc, 1_000); // Immature

		let parent = ExtKeychain::root_key_id();
		let spendable_id = wallet.next_child_path(&parent).unwrap();
		let mut batch = wallet.batch().unwrap();
		batch
			.save_output(OutputData {
				key_id: spendable_id.clone(),
				commit: kc.commit(2_000, &spendable_id).unwrap(),
				value: 2_000,
				status: OutputStatus::Spendable,
				block_height: Some(1),
				mmr_index: None,
				wallet_tx_id: None,
				label: None,
			})
			.unwrap();
		let locked_id = wallet.next_child_path(&parent).unwrap();
		batch
			.save_output(OutputData {
				key_id: locked_id.clone(),
				commit: kc.commit(3_000, &locked_id).unwrap(),
				value: 3_000,
				status: OutputStatus::Locked,
				block_height: Some(1),
				mmr_index: None,
				wallet_tx_id: None,
				label: None,
			})
			.unwrap();
		batch.commit().unwrap();

		let info = wallet_info(&wallet, 100).unwrap();
		assert_eq!(info.current_height, 100);
		assert_eq!(info.amount_awaiting_confirmation, 1_000);
		assert_eq!(info.amount_currently_spendable, 2_000);
		assert_eq!(info.amount_confirmed_but_locked, 3_000);
		assert_eq!(info.total, 6_000);
	}

	#[test]
	fn sweep_removes_only_old_unconfirmed_entries_and_never_touches_outputs() {
		let wallet = MemoryWalletBackend::new();
		let output = seed_tracked_output(&wallet, &keychain(), 1_000);

		let mut batch = wallet.batch().unwrap();
		batch
			.save_transaction(WalletTx {
				id: 0,
				tx_type: WalletTxType::SendingStarted,
				slate_id: None,
				counterparty_address: None,
				message: None,
				created_at: Utc::now() - Duration::days(10),
				confirmed_at: None,
				confirmation_height: None,
				credited: 0,
				debited: 1_000,
				fee: Some(10),
				tx_snapshot: None,
			})
			.unwrap();
		batch
			.save_transaction(WalletTx {
				id: 1,
				tx_type: WalletTxType::ReceivingInProgress,
				slate_id: None,
				counterparty_address: None,
				message: None,
				created_at: Utc::now(),
				confirmed_at: None,
				confirmation_height: None,
				credited: 1_000,
				debited: 0,
				fee: None,
				tx_snapshot: None,
			})
			.unwrap();
		batch.commit().unwrap();

		let swept = sweep_stale_unconfirmed(&wallet, Duration::days(1)).unwrap();
		assert_eq!(swept, 1);

		let old = wallet.transaction(0).unwrap().unwrap();
		assert_eq!(old.tx_type, WalletTxType::SendingCancelled);
		let recent = wallet.transaction(1).unwrap().unwrap();
		assert_eq!(recent.tx_type, WalletTxType::ReceivingInProgress);

		// The output tracked by the stale transaction is untouched.
		let unchanged = wallet.output(&output.commit).unwrap().unwrap();
		assert_eq!(unchanged.status, OutputStatus::Immature);
	}
}
