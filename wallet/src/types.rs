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

//! Wallet-level data types: tracked outputs, the transaction log, account
//! paths, and the ambient configuration a caller loads once at startup.

use chrono::{DateTime, Utc};
use mw_core::Transaction;
use mw_keychain::Identifier;
use mw_util::secp::pedersen::Commitment;
use uuid::Uuid;

/// Lifecycle of a tracked output. An output is created Immature (coinbase,
/// awaiting maturity) or Spendable (change/received), moves to Locked while
/// it backs an in-flight send, and terminates at Spent or Cancelled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
	/// Usable as a transaction input.
	Spendable,
	/// Selected as an input for an in-progress send; not yet confirmed
	/// spent, and not available for another selection.
	Locked,
	/// Confirmed spent on chain.
	Spent,
	/// The owning `WalletTx` was cancelled before confirmation.
	Cancelled,
	/// A coinbase output not yet past the maturity height.
	Immature,
}

/// A single output the wallet knows how to reconstruct and spend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutputData {
	/// Derivation path for this output's blinding factor.
	pub key_id: Identifier,
	/// The output's Pedersen commitment; also its database key.
	pub commit: Commitment,
	/// Value committed to, kept alongside the commitment since the wallet
	/// is the only party who can open it.
	pub value: u64,
	/// Current lifecycle state.
	pub status: OutputStatus,
	/// Chain height the output was confirmed at, once known.
	pub block_height: Option<u64>,
	/// MMR position at confirmation, used by the refresher's existence
	/// queries.
	pub mmr_index: Option<u64>,
	/// The `WalletTx` that created (or, for an input, will spend) this
	/// output.
	pub wallet_tx_id: Option<u32>,
	/// Free-form label, e.g. `"coinbase"`.
	pub label: Option<String>,
}

impl OutputData {
	/// Mark as locked by an in-flight send.
	pub fn lock(&mut self) {
		self.status = OutputStatus::Locked;
	}

	/// Return a locked output to spendable, e.g. on cancellation.
	pub fn mark_spendable(&mut self) {
		self.status = OutputStatus::Spendable;
	}

	/// Mark as spent once its containing transaction confirms.
	pub fn mark_spent(&mut self) {
		self.status = OutputStatus::Spent;
	}

	/// Mark as cancelled; a terminal state.
	pub fn mark_cancelled(&mut self) {
		self.status = OutputStatus::Cancelled;
	}

	/// Whether this output may currently be selected as a spend input.
	pub fn eligible_to_spend(&self) -> bool {
		self.status == OutputStatus::Spendable
	}
}

/// A coin-selection / send strategy, chosen by the caller per send.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionStrategy {
	/// Fewest, smallest-value inputs that cover the amount.
	Smallest,
	/// Every spendable output in the account.
	All,
	/// Exactly the listed commitments.
	Custom(Vec<Commitment>),
}

/// The kind of activity a `WalletTx` records.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletTxType {
	/// Phase S has run; awaiting the peer's response.
	SendingStarted,
	/// Phase F has run; the transaction was broadcast.
	SendingFinalized,
	/// The send was cancelled before finalization.
	SendingCancelled,
	/// Phase R has run; awaiting Phase F from the sender.
	ReceivingInProgress,
	/// The receive completed (the sender's finalized tx confirmed).
	Received,
	/// The receive was cancelled.
	ReceivedCancelled,
	/// A coinbase reward output.
	Coinbase,
}

/// One entry in the wallet's transaction log.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WalletTx {
	/// Monotonically increasing, wallet-local id.
	pub id: u32,
	/// What kind of activity this is.
	pub tx_type: WalletTxType,
	/// The slate this activity is tracking, if any.
	pub slate_id: Option<Uuid>,
	/// Address or identity of the other party, if known.
	pub counterparty_address: Option<String>,
	/// Optional free-text message attached to the slate.
	pub message: Option<String>,
	/// When this log entry was first written.
	pub created_at: DateTime<Utc>,
	/// When the underlying transaction confirmed on chain.
	pub confirmed_at: Option<DateTime<Utc>>,
	/// Chain height at confirmation.
	pub confirmation_height: Option<u64>,
	/// Amount received by this wallet in the transaction.
	pub credited: u64,
	/// Amount spent by this wallet in the transaction (inputs + change is
	/// netted out; this is the amount that left the account, fee included).
	pub debited: u64,
	/// Fee paid, if this wallet is the sender.
	pub fee: Option<u64>,
	/// Snapshot of the finalized transaction, once known.
	pub tx_snapshot: Option<Transaction>,
}

/// Maps a human-chosen account label to its root derivation path.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AcctPathMapping {
	/// The label the caller refers to the account by.
	pub label: String,
	/// Root path all of the account's outputs derive from.
	pub root_path: Identifier,
}

/// Which network's consensus parameters (genesis, address HRP, base fee)
/// the wallet is operating against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
	/// Production network.
	Mainnet,
	/// Public test network.
	Floonet,
}

/// Settings a caller must provide at startup; everything else is derived.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WalletConfig {
	/// Base URL of the node's foreign-API RPC.
	pub node_url: String,
	/// Which network's parameters apply.
	pub network: Network,
	/// Directory the wallet database lives in.
	pub db_path: String,
	/// Strategy used when a send doesn't specify one explicitly.
	pub default_strategy: SelectionStrategyConfig,
}

/// `TOML`-friendly mirror of [`SelectionStrategy`] (the `Custom` variant
/// isn't meaningful as a static default, so configuration only offers the
/// two unconditional strategies).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategyConfig {
	/// See [`SelectionStrategy::Smallest`].
	Smallest,
	/// See [`SelectionStrategy::All`].
	All,
}

impl From<SelectionStrategyConfig> for SelectionStrategy {
	fn from(cfg: SelectionStrategyConfig) -> SelectionStrategy {
		match cfg {
			SelectionStrategyConfig::Smallest => SelectionStrategy::Smallest,
			SelectionStrategyConfig::All => SelectionStrategy::All,
		}
	}
}

impl WalletConfig {
	/// Parse from a TOML document.
	pub fn from_toml(s: &str) -> Result<WalletConfig, toml::de::Error> {
		toml::from_str(s)
	}

	/// Serialize to a TOML document.
	pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
		toml::to_string_pretty(self)
	}
}

/// Aggregate balance view over an account's outputs, as returned to a
/// caller asking "how much do I have".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct WalletInfo {
	/// Chain height the figures below were computed against.
	pub current_height: u64,
	/// Sum of every tracked output regardless of status.
	pub total: u64,
	/// Sum of outputs awaiting confirmation (immature or unconfirmed).
	pub amount_awaiting_confirmation: u64,
	/// Sum of confirmed outputs that are currently locked by an in-flight
	/// send.
	pub amount_confirmed_but_locked: u64,
	/// Sum of outputs eligible to spend right now.
	pub amount_currently_spendable: u64,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn selection_strategy_config_maps_to_runtime_strategy() {
		assert_eq!(
			SelectionStrategy::from(SelectionStrategyConfig::Smallest),
			SelectionStrategy::Smallest
		);
		assert_eq!(SelectionStrategy::from(SelectionStrategyConfig::All), SelectionStrategy::All);
	}

	#[test]
	fn wallet_config_round_trips_through_toml() {
		let cfg = WalletConfig {
			node_url: "http://127.0.0.1:3415".to_string(),
			network: Network::Floonet,
			db_path: "/tmp/wallet_data".to_string(),
			default_strategy: SelectionStrategyConfig::Smallest,
		};
		let toml = cfg.to_toml().unwrap();
		let back = WalletConfig::from_toml(&toml).unwrap();
		assert_eq!(back.node_url, cfg.node_url);
		assert_eq!(back.network, cfg.network);
	}
}
