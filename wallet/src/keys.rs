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

//! Account/path management (§4.1): every account is a root path `m/<account>/0`
//! that a Phase S/R call passes down as its `parent_key_id`, registered under
//! a human label so callers never have to carry a raw `Identifier` around.

use mw_keychain::{Identifier, Path};

use crate::database::WalletBackend;
use crate::error::{Error, ErrorKind};
use crate::types::AcctPathMapping;

/// The label every wallet's first account is registered under.
pub const DEFAULT_ACCOUNT_LABEL: &str = "default";

fn account_root(account_index: u32) -> Result<Identifier, Error> {
	Ok(Identifier::from_path(&Path::new(&[account_index, 0])?))
}

/// The root path of the wallet's first account, before any accounts have
/// been registered.
pub fn default_account_root() -> Identifier {
	account_root(0).expect("a two-component path is well under MAX_PATH_DEPTH")
}

/// Every registered account label and its root path.
pub fn accounts<W: WalletBackend>(wallet: &W) -> Result<Vec<AcctPathMapping>, Error> {
	wallet.acct_path_iter()
}

/// Resolve a label to its root path, falling back to the default account's
/// root if no accounts have been registered yet (a fresh wallet).
pub fn parent_key_id_by_label<W: WalletBackend>(wallet: &W, label: &str) -> Result<Identifier, Error> {
	let accounts = wallet.acct_path_iter()?;
	if accounts.is_empty() && label == DEFAULT_ACCOUNT_LABEL {
		return Ok(default_account_root());
	}
	accounts
		.into_iter()
		.find(|a| a.label == label)
		.map(|a| a.root_path)
		.ok_or_else(|| ErrorKind::UnknownAccountLabel(label.to_string()).into())
}

/// Register a new account under `label`, at the next unused account index
/// (one past the highest index among existing accounts, or `0` for the
/// first). Fails if `label` is already registered.
pub fn new_acct_path<W: WalletBackend>(wallet: &W, label: &str) -> Result<Identifier, Error> {
	let existing = wallet.acct_path_iter()?;
	if existing.iter().any(|a| a.label == label) {
		return Err(ErrorKind::AccountLabelAlreadyExists(label.to_string()).into());
	}

	let next_index = existing
		.iter()
		.map(|a| u32::from(a.root_path.to_path().path[0]))
		.max()
		.map_or(0, |highest| highest + 1);
	let root_path = account_root(next_index);

	let mut batch = wallet.batch()?;
	batch.save_acct_path_mapping(AcctPathMapping {
		label: label.to_string(),
		root_path,
	})?;
	batch.commit()?;
	Ok(root_path)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::database::MemoryWalletBackend;

	#[test]
	fn first_account_starts_at_index_zero() {
		let wallet = MemoryWalletBackend::new();
		let root = new_acct_path(&wallet, DEFAULT_ACCOUNT_LABEL).unwrap();
		assert_eq!(root, default_account_root());
	}

	#[test]
	fn accounts_are_allocated_consecutive_indices() {
		let wallet = MemoryWalletBackend::new();
		new_acct_path(&wallet, "default").unwrap();
		let second = new_acct_path(&wallet, "savings").unwrap();
		let third = new_acct_path(&wallet, "trading").unwrap();
		assert_eq!(second.to_path().path[0], mw_keychain::ChildNumber::from_normal_idx(1));
		assert_eq!(third.to_path().path[0], mw_keychain::ChildNumber::from_normal_idx(2));
	}

	#[test]
	fn duplicate_label_is_rejected() {
		let wallet = MemoryWalletBackend::new();
		new_acct_path(&wallet, "default").unwrap();
		let err = new_acct_path(&wallet, "default").unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::AccountLabelAlreadyExists(_)));
	}

	#[test]
	fn label_resolves_to_its_registered_root_path() {
		let wallet = MemoryWalletBackend::new();
		let root = new_acct_path(&wallet, "savings").unwrap();
		assert_eq!(parent_key_id_by_label(&wallet, "savings").unwrap(), root);
		assert!(parent_key_id_by_label(&wallet, "missing").is_err());
	}

	#[test]
	fn unregistered_wallet_resolves_default_label_to_the_default_root() {
		let wallet = MemoryWalletBackend::new();
		assert_eq!(
			parent_key_id_by_label(&wallet, DEFAULT_ACCOUNT_LABEL).unwrap(),
			default_account_root()
		);
	}
}
