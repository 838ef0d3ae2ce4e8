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

//! The Slate protocol: account and key management, coin selection,
//! send/receive/finalize, wallet storage and chain sync.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

pub mod context;
pub mod database;
pub mod error;
pub mod keys;
pub mod node_client;
pub mod refresh;
pub mod selection;
pub mod slate;
pub mod tx;
pub mod types;

pub use crate::context::SlateContext;
pub use crate::database::{BatchWrite, MemoryWalletBackend, OutputFilter, WalletBackend};
pub use crate::error::{Error, ErrorKind};
pub use crate::keys::{accounts, new_acct_path, parent_key_id_by_label, DEFAULT_ACCOUNT_LABEL};
pub use crate::node_client::{ChainOutput, HeaderInfo, HttpNodeClient, MockNodeClient, NodeClient, OutputLocation};
pub use crate::refresh::{
	refresh_outputs, restore_from_seed, sweep_stale_unconfirmed, wallet_info, COINBASE_MATURITY, DEFAULT_GAP_LIMIT,
};
pub use crate::slate::{ParticipantData, PaymentProof, Slate};
pub use crate::tx::{cancel_tx, create_send_tx, finalize_tx, post_finalized_tx, receive_tx, SendArgs};
pub use crate::types::{
	AcctPathMapping, Network, OutputData, OutputStatus, SelectionStrategy, SelectionStrategyConfig, WalletConfig,
	WalletInfo, WalletTx, WalletTxType,
};
