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

//! The wallet's persistence contract. `WalletBackend` is the trait the rest
//! of the crate builds against; `MemoryWalletBackend` is a reader-writer
//! lock guarded reference implementation, sufficient to drive tests and
//! everything above it. A SQL-backed implementation is a drop-in
//! replacement behind the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use mw_keychain::{ChildNumber, Identifier};
use mw_util::secp::pedersen::Commitment;
use uuid::Uuid;

use crate::context::SlateContext;
use crate::error::{Error, ErrorKind};
use crate::types::{AcctPathMapping, OutputData, OutputStatus, WalletTx};

/// Selects which tracked outputs a `get_outputs` call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFilter {
	/// Every tracked output regardless of status.
	All,
	/// Only outputs with the given status.
	Status(OutputStatus),
}

impl OutputFilter {
	fn matches(&self, output: &OutputData) -> bool {
		match self {
			OutputFilter::All => true,
			OutputFilter::Status(status) => output.status == *status,
		}
	}
}

/// The wallet's persistence contract (§4.2): encrypted seed storage, path
/// cursors, the output and transaction logs, in-flight slate context, and
/// account path mappings, all behind one transactional batch handle.
pub trait WalletBackend: Send + Sync {
	/// The encrypted master seed, if one has been stored.
	fn load_seed_encrypted(&self) -> Result<Option<Vec<u8>>, Error>;
	/// Overwrite the stored encrypted seed.
	fn store_seed_encrypted(&self, seed: &[u8]) -> Result<(), Error>;

	/// Atomically allocate and return the next child index under `parent`.
	fn next_child_path(&self, parent: &Identifier) -> Result<Identifier, Error>;
	/// Ensure future `next_child_path` calls under `parent` start no earlier
	/// than `min_next_index`, without allocating or returning one. Used
	/// after a rescan recovers an output at an index the cursor hasn't
	/// caught up to yet.
	fn advance_child_path(&self, parent: &Identifier, min_next_index: u32) -> Result<(), Error>;
	/// Atomically allocate and return the next wallet-local transaction id.
	fn next_tx_id(&self) -> Result<u32, Error>;

	/// Outputs matching `filter`.
	fn outputs(&self, filter: OutputFilter) -> Result<Vec<OutputData>, Error>;
	/// The single tracked output at `commit`, if any.
	fn output(&self, commit: &Commitment) -> Result<Option<OutputData>, Error>;

	/// The transaction log entry with the given id.
	fn transaction(&self, id: u32) -> Result<Option<WalletTx>, Error>;
	/// Every logged transaction.
	fn transactions(&self) -> Result<Vec<WalletTx>, Error>;

	/// Persisted signing state for an in-flight slate, if any.
	fn load_slate_context(&self, slate_id: &Uuid) -> Result<Option<SlateContext>, Error>;

	/// Every registered account label and its root path.
	fn acct_path_iter(&self) -> Result<Vec<AcctPathMapping>, Error>;

	/// Open a transactional writer. Holds the store's exclusive lock until
	/// `commit` or `discard` is called.
	fn batch(&self) -> Result<Box<dyn BatchWrite + '_>, Error>;
}

/// A single transactional scope: every mutation queued through this handle
/// becomes visible atomically on `commit`, or not at all on `discard` (or
/// on drop without a commit).
pub trait BatchWrite {
	/// Upsert an output keyed by its commitment.
	fn save_output(&mut self, output: OutputData) -> Result<(), Error>;
	/// Upsert a transaction log entry keyed by id.
	fn save_transaction(&mut self, tx: WalletTx) -> Result<(), Error>;
	/// Persist the signing context for `slate_id`.
	fn save_slate_context(&mut self, slate_id: Uuid, ctx: SlateContext) -> Result<(), Error>;
	/// Remove the signing context for `slate_id`, if any.
	fn delete_slate_context(&mut self, slate_id: &Uuid) -> Result<(), Error>;
	/// Register a new account label, failing if it already exists.
	fn save_acct_path_mapping(&mut self, mapping: AcctPathMapping) -> Result<(), Error>;

	/// Commit every queued mutation atomically.
	fn commit(self: Box<Self>) -> Result<(), Error>;
}

#[derive(Default)]
struct Store {
	seed: Option<Vec<u8>>,
	outputs: HashMap<Commitment, OutputData>,
	transactions: HashMap<u32, WalletTx>,
	slate_contexts: HashMap<Uuid, SlateContext>,
	acct_paths: HashMap<String, AcctPathMapping>,
	path_cursors: HashMap<Identifier, u32>,
	next_tx_id: u32,
}

/// A reader-writer lock guarded, in-process `WalletBackend`. Adequate for
/// tests and for driving the rest of the core; a caller wanting durable
/// storage supplies a different `WalletBackend` implementation behind the
/// same trait.
pub struct MemoryWalletBackend {
	store: RwLock<Store>,
}

impl MemoryWalletBackend {
	/// A fresh, empty store.
	pub fn new() -> MemoryWalletBackend {
		MemoryWalletBackend {
			store: RwLock::new(Store::default()),
		}
	}
}

impl Default for MemoryWalletBackend {
	fn default() -> MemoryWalletBackend {
		MemoryWalletBackend::new()
	}
}

impl WalletBackend for MemoryWalletBackend {
	fn load_seed_encrypted(&self) -> Result<Option<Vec<u8>>, Error> {
		Ok(self.store.read().unwrap().seed.clone())
	}

	fn store_seed_encrypted(&self, seed: &[u8]) -> Result<(), Error> {
		self.store.write().unwrap().seed = Some(seed.to_vec());
		Ok(())
	}

	fn next_child_path(&self, parent: &Identifier) -> Result<Identifier, Error> {
		let mut store = self.store.write().unwrap();
		let next = store.path_cursors.entry(*parent).or_insert(0);
		let index = *next;
		*next += 1;
		let path = parent.to_path().extend(ChildNumber::from_normal_idx(index))?;
		Ok(Identifier::from_path(&path))
	}

	fn advance_child_path(&self, parent: &Identifier, min_next_index: u32) -> Result<(), Error> {
		let mut store = self.store.write().unwrap();
		let cursor = store.path_cursors.entry(*parent).or_insert(0);
		if *cursor < min_next_index {
			*cursor = min_next_index;
		}
		Ok(())
	}

	fn next_tx_id(&self) -> Result<u32, Error> {
		let mut store = self.store.write().unwrap();
		let id = store.next_tx_id;
		store.next_tx_id += 1;
		Ok(id)
	}

	fn outputs(&self, filter: OutputFilter) -> Result<Vec<OutputData>, Error> {
		Ok(self
			.store
			.read()
			.unwrap()
			.outputs
			.values()
			.filter(|o| filter.matches(o))
			.cloned()
			.collect())
	}

	fn output(&self, commit: &Commitment) -> Result<Option<OutputData>, Error> {
		Ok(self.store.read().unwrap().outputs.get(commit).cloned())
	}

	fn transaction(&self, id: u32) -> Result<Option<WalletTx>, Error> {
		Ok(self.store.read().unwrap().transactions.get(&id).cloned())
	}

	fn transactions(&self) -> Result<Vec<WalletTx>, Error> {
		Ok(self.store.read().unwrap().transactions.values().cloned().collect())
	}

	fn load_slate_context(&self, slate_id: &Uuid) -> Result<Option<SlateContext>, Error> {
		Ok(self.store.read().unwrap().slate_contexts.get(slate_id).cloned())
	}

	fn acct_path_iter(&self) -> Result<Vec<AcctPathMapping>, Error> {
		Ok(self.store.read().unwrap().acct_paths.values().cloned().collect())
	}

	fn batch(&self) -> Result<Box<dyn BatchWrite + '_>, Error> {
		Ok(Box::new(MemoryBatch {
			store: self.store.write().unwrap(),
		}))
	}
}

// Mutations are applied to the store as each method is called rather than
// queued, so `commit` only needs to release the exclusive lock; there is no
// uncommitted state to roll back if a caller drops the batch without
// calling it. A backend with real transactional semantics would buffer
// writes here instead.
struct MemoryBatch<'a> {
	store: std::sync::RwLockWriteGuard<'a, Store>,
}

impl<'a> BatchWrite for MemoryBatch<'a> {
	fn save_output(&mut self, output: OutputData) -> Result<(), Error> {
		self.store.outputs.insert(output.commit, output);
		Ok(())
	}

	fn save_transaction(&mut self, tx: WalletTx) -> Result<(), Error> {
		self.store.transactions.insert(tx.id, tx);
		Ok(())
	}

	fn save_slate_context(&mut self, slate_id: Uuid, ctx: SlateContext) -> Result<(), Error> {
		self.store.slate_contexts.insert(slate_id, ctx);
		Ok(())
	}

	fn delete_slate_context(&mut self, slate_id: &Uuid) -> Result<(), Error> {
		self.store.slate_contexts.remove(slate_id);
		Ok(())
	}

	fn save_acct_path_mapping(&mut self, mapping: AcctPathMapping) -> Result<(), Error> {
		if self.store.acct_paths.contains_key(&mapping.label) {
			return Err(ErrorKind::AccountLabelAlreadyExists(mapping.label).into());
		}
		self.store.acct_paths.insert(mapping.label.clone(), mapping);
		Ok(())
	}

	fn commit(self: Box<Self>) -> Result<(), Error> {
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use mw_keychain::Path;

	fn root() -> Identifier {
		Identifier::from_path(&Path::new(&[]).unwrap())
	}

	#[test]
	fn next_child_path_is_monotonic_per_parent() {
		let backend = MemoryWalletBackend::new();
		let a = backend.next_child_path(&root()).unwrap();
		let b = backend.next_child_path(&root()).unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn batch_writes_are_visible_only_after_commit() {
		let backend = MemoryWalletBackend::new();
		let output = OutputData {
			key_id: root(),
			commit: Commitment::from_vec(vec![1; 33]),
			value: 10,
			status: OutputStatus::Spendable,
			block_height: None,
			mmr_index: None,
			wallet_tx_id: None,
			label: None,
		};
		{
			let mut batch = backend.batch().unwrap();
			batch.save_output(output.clone()).unwrap();
			batch.commit().unwrap();
		}
		assert_eq!(backend.outputs(OutputFilter::All).unwrap().len(), 1);
	}

	#[test]
	fn duplicate_account_label_is_rejected() {
		let backend = MemoryWalletBackend::new();
		let mapping = AcctPathMapping {
			label: "default".to_string(),
			root_path: root(),
		};
		{
			let mut batch = backend.batch().unwrap();
			batch.save_acct_path_mapping(mapping.clone()).unwrap();
			batch.commit().unwrap();
		}
		let mut batch = backend.batch().unwrap();
		assert!(batch.save_acct_path_mapping(mapping).is_err());
	}
}
