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

//! The narrow interface the wallet core consumes from a chain node (§4.5).
//! `MockNodeClient` drives tests without a network; `HttpNodeClient` speaks
//! JSON to a node's foreign API and is the ambient, swappable default.

use std::collections::HashMap;
use std::sync::RwLock;

use mw_core::Transaction;
use mw_util::secp::pedersen::{Commitment, RangeProof};

use crate::error::{Error, ErrorKind};

/// Chain metadata about the block an output (or a kernel) was confirmed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
	/// Block height.
	pub height: u64,
	/// Unix timestamp the block was mined at.
	pub timestamp: i64,
}

/// Where an output known to the wallet currently sits on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLocation {
	/// Confirming block height.
	pub height: u64,
	/// Position in the output MMR at that height.
	pub mmr_index: u64,
}

/// A single output as enumerated directly off the chain's output set,
/// independent of whether the wallet already knows about it. Feeds a
/// from-genesis rescan, where the wallet has no commitment list to ask
/// `get_outputs_by_commitment` about yet.
#[derive(Clone)]
pub struct ChainOutput {
	/// The output's Pedersen commitment.
	pub commit: Commitment,
	/// Its range proof, the only thing a rewind can recover a value from.
	pub proof: RangeProof,
	/// Whether this output pays a mining reward (subject to the coinbase
	/// maturity rule rather than ordinary confirmation).
	pub is_coinbase: bool,
	/// Confirming block height.
	pub height: u64,
}

/// The narrow interface the wallet core consumes from a chain node.
pub trait NodeClient: Send + Sync {
	/// Current chain tip height.
	fn get_chain_height(&self) -> Result<u64, Error>;

	/// Resolve a set of commitments the wallet is tracking to their current
	/// on-chain location; absent from the returned map means not found
	/// (spent or never confirmed).
	fn get_outputs_by_commitment(
		&self,
		commitments: &[Commitment],
	) -> Result<HashMap<Commitment, OutputLocation>, Error>;

	/// Broadcast a finalized transaction. `Ok(())` means the node accepted
	/// it into its pool; an `Err` carries the node's rejection reason.
	fn post_tx(&self, tx: &Transaction) -> Result<(), Error>;

	/// Header metadata for `height`, used to stamp confirmation timestamps.
	fn get_header_info(&self, height: u64) -> Result<HeaderInfo, Error>;

	/// A page of the chain's full, unspent output set starting at
	/// `start_index` (a node-defined, stable ordinal, not a block height),
	/// for a from-genesis rescan. Returns the highest index the node knows
	/// about alongside the page, so a caller knows when it has reached the
	/// tip.
	fn get_unspent_outputs(&self, start_index: u64, max: u64) -> Result<(u64, Vec<ChainOutput>), Error>;
}

#[derive(Default)]
struct MockChain {
	height: u64,
	outputs: HashMap<Commitment, OutputLocation>,
	headers: HashMap<u64, HeaderInfo>,
	posted: Vec<Transaction>,
	chain_outputs: Vec<ChainOutput>,
}

/// An in-memory `NodeClient` substitute, for tests and for driving the rest
/// of the core without a live node.
pub struct MockNodeClient {
	chain: RwLock<MockChain>,
}

impl MockNodeClient {
	/// A mock chain starting at height 0 with no known outputs.
	pub fn new() -> MockNodeClient {
		MockNodeClient {
			chain: RwLock::new(MockChain::default()),
		}
	}

	/// Advance the mock chain's tip.
	pub fn set_height(&self, height: u64) {
		self.chain.write().unwrap().height = height;
	}

	/// Record a header at `height`, so `get_header_info` can resolve it.
	pub fn add_header(&self, height: u64, timestamp: i64) {
		self.chain
			.write()
			.unwrap()
			.headers
			.insert(height, HeaderInfo { height, timestamp });
	}

	/// Mark `commit` as confirmed at `(height, mmr_index)`.
	pub fn confirm_output(&self, commit: Commitment, height: u64, mmr_index: u64) {
		self.chain
			.write()
			.unwrap()
			.outputs
			.insert(commit, OutputLocation { height, mmr_index });
	}

	/// Every transaction accepted by a prior `post_tx` call, in order.
	pub fn posted_transactions(&self) -> Vec<Transaction> {
		self.chain.read().unwrap().posted.clone()
	}

	/// Append an output to the chain's full, rescan-visible output set (in
	/// addition to `confirm_output`, which only makes it resolvable by
	/// commitment).
	pub fn push_chain_output(&self, commit: Commitment, proof: RangeProof, is_coinbase: bool, height: u64) {
		self.chain.write().unwrap().chain_outputs.push(ChainOutput {
			commit,
			proof,
			is_coinbase,
			height,
		});
	}
}

impl Default for MockNodeClient {
	fn default() -> MockNodeClient {
		MockNodeClient::new()
	}
}

impl NodeClient for MockNodeClient {
	fn get_chain_height(&self) -> Result<u64, Error> {
		Ok(self.chain.read().unwrap().height)
	}

	fn get_outputs_by_commitment(
		&self,
		commitments: &[Commitment],
	) -> Result<HashMap<Commitment, OutputLocation>, Error> {
		let chain = self.chain.read().unwrap();
		Ok(commitments
			.iter()
			.filter_map(|c| chain.outputs.get(c).map(|loc| (*c, *loc)))
			.collect())
	}

	fn post_tx(&self, tx: &Transaction) -> Result<(), Error> {
		self.chain.write().unwrap().posted.push(tx.clone());
		Ok(())
	}

	fn get_header_info(&self, height: u64) -> Result<HeaderInfo, Error> {
		self.chain
			.read()
			.unwrap()
			.headers
			.get(&height)
			.copied()
			.ok_or_else(|| ErrorKind::Node(format!("no header known at height {}", height)).into())
	}

	fn get_unspent_outputs(&self, start_index: u64, max: u64) -> Result<(u64, Vec<ChainOutput>), Error> {
		let chain = self.chain.read().unwrap();
		let highest = chain.chain_outputs.len() as u64;
		let page = chain
			.chain_outputs
			.iter()
			.skip(start_index as usize)
			.take(max as usize)
			.cloned()
			.collect();
		Ok((highest, page))
	}
}

#[derive(serde::Deserialize)]
struct TipResponse {
	height: u64,
}

#[derive(serde::Deserialize)]
struct HeaderResponse {
	height: u64,
	timestamp: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct OutputByCommitResponse {
	commit: String,
	height: u64,
	mmr_index: u64,
}

#[derive(serde::Deserialize)]
struct UnspentOutputsResponse {
	highest_index: u64,
	outputs: Vec<UnspentOutputResponse>,
}

#[derive(serde::Deserialize)]
struct UnspentOutputResponse {
	#[serde(deserialize_with = "mw_core::ser_util::commitment_from_hex")]
	commit: Commitment,
	#[serde(deserialize_with = "mw_core::ser_util::rangeproof_from_hex")]
	proof: RangeProof,
	is_coinbase: bool,
	height: u64,
}

/// A `reqwest`-backed `NodeClient` speaking JSON to a node's foreign API.
/// Blocking rather than async, matching the rest of this crate's
/// synchronous, lock-based concurrency model (§5); the teacher's own
/// hyper/tokio client is replaced here since that transport layer isn't
/// part of what this crate's concurrency model asks for.
#[derive(Clone)]
pub struct HttpNodeClient {
	node_url: String,
	client: reqwest::blocking::Client,
}

impl HttpNodeClient {
	/// Build a client talking to the node rooted at `node_url` (no trailing
	/// slash).
	pub fn new(node_url: &str) -> HttpNodeClient {
		HttpNodeClient {
			node_url: node_url.trim_end_matches('/').to_string(),
			client: reqwest::blocking::Client::new(),
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.node_url, path)
	}
}

impl NodeClient for HttpNodeClient {
	fn get_chain_height(&self) -> Result<u64, Error> {
		let resp: TipResponse = self
			.client
			.get(self.url("/v1/chain"))
			.send()
			.map_err(|e| ErrorKind::Node(e.to_string()))?
			.error_for_status()
			.map_err(|e| ErrorKind::Node(e.to_string()))?
			.json()
			.map_err(|e| ErrorKind::Node(e.to_string()))?;
		Ok(resp.height)
	}

	fn get_outputs_by_commitment(
		&self,
		commitments: &[Commitment],
	) -> Result<HashMap<Commitment, OutputLocation>, Error> {
		let mut result = HashMap::new();
		for chunk in commitments.chunks(500) {
			let ids: Vec<String> = chunk.iter().map(|c| mw_util::to_hex(c.0.to_vec())).collect();
			let query = ids.iter().map(|id| format!("id={}", id)).collect::<Vec<_>>().join("&");
			let url = self.url(&format!("/v1/chain/outputs/byids?{}", query));
			let found: Vec<OutputByCommitResponse> = self
				.client
				.get(&url)
				.send()
				.map_err(|e| ErrorKind::Node(e.to_string()))?
				.error_for_status()
				.map_err(|e| ErrorKind::Node(e.to_string()))?
				.json()
				.map_err(|e| ErrorKind::Node(e.to_string()))?;
			for out in found {
				let bytes = mw_util::from_hex(out.commit).map_err(|e| ErrorKind::Deserialization(e.to_string()))?;
				let commit = Commitment::from_vec(bytes);
				result.insert(
					commit,
					OutputLocation {
						height: out.height,
						mmr_index: out.mmr_index,
					},
				);
			}
		}
		Ok(result)
	}

	fn post_tx(&self, tx: &Transaction) -> Result<(), Error> {
		self.client
			.post(self.url("/v1/pool/push?fluff"))
			.json(tx)
			.send()
			.map_err(|e| ErrorKind::Node(e.to_string()))?
			.error_for_status()
			.map_err(|e| ErrorKind::Node(e.to_string()))?;
		Ok(())
	}

	fn get_header_info(&self, height: u64) -> Result<HeaderInfo, Error> {
		let resp: HeaderResponse = self
			.client
			.get(self.url(&format!("/v1/headers/{}", height)))
			.send()
			.map_err(|e| ErrorKind::Node(e.to_string()))?
			.error_for_status()
			.map_err(|e| ErrorKind::Node(e.to_string()))?
			.json()
			.map_err(|e| ErrorKind::Node(e.to_string()))?;
		let timestamp = resp
			.timestamp
			.parse()
			.map_err(|_| ErrorKind::Deserialization("non-numeric header timestamp".to_string()))?;
		Ok(HeaderInfo {
			height: resp.height,
			timestamp,
		})
	}

	fn get_unspent_outputs(&self, start_index: u64, max: u64) -> Result<(u64, Vec<ChainOutput>), Error> {
		let url = self.url(&format!(
			"/v1/txhashset/outputs?start_index={}&max={}",
			start_index, max
		));
		let resp: UnspentOutputsResponse = self
			.client
			.get(&url)
			.send()
			.map_err(|e| ErrorKind::Node(e.to_string()))?
			.error_for_status()
			.map_err(|e| ErrorKind::Node(e.to_string()))?
			.json()
			.map_err(|e| ErrorKind::Node(e.to_string()))?;
		let outputs = resp
			.outputs
			.into_iter()
			.map(|o| ChainOutput {
				commit: o.commit,
				proof: o.proof,
				is_coinbase: o.is_coinbase,
				height: o.height,
			})
			.collect();
		Ok((resp.highest_index, outputs))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn mock_reports_outputs_confirmed_after_the_fact() {
		let client = MockNodeClient::new();
		let commit = Commitment::from_vec(vec![9; 33]);
		assert!(client.get_outputs_by_commitment(&[commit]).unwrap().is_empty());

		client.confirm_output(commit, 100, 42);
		let found = client.get_outputs_by_commitment(&[commit]).unwrap();
		assert_eq!(found[&commit].height, 100);
		assert_eq!(found[&commit].mmr_index, 42);
	}

	#[test]
	fn mock_records_posted_transactions() {
		let client = MockNodeClient::new();
		client.post_tx(&Transaction::empty()).unwrap();
		assert_eq!(client.posted_transactions().len(), 1);
	}
}
