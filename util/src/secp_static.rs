// Copyright 2018 The Grin Developers
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

//! Globally accessible static instance of secp256k1, to avoid
//! initialisation overhead.

use crate::secp_ as secp;
use rand::thread_rng;
use std::sync::{Arc, Mutex};

lazy_static! {
	/// Static reference to secp instance
	pub static ref SECP256K1: Arc<Mutex<secp::Secp256k1>> =
		Arc::new(Mutex::new(secp::Secp256k1::with_caps(secp::ContextFlag::Commit)));

	/// A commitment to the value zero, with a zero blinding factor. Filtered
	/// out wherever a sum of commitments is computed, since summing it in
	/// would be a no-op but allocating it fresh on every sum is wasteful.
	pub static ref ZERO_COMMITMENT: secp::pedersen::Commitment = {
		let secp_inst = SECP256K1.lock().unwrap();
		secp_inst.commit_value(0).unwrap()
	};
}

/// Returns the static instance, randomizing it first (recommended to avoid
/// side-channel attacks).
pub fn static_secp_instance() -> Arc<Mutex<secp::Secp256k1>> {
	let mut secp_inst = SECP256K1.lock().unwrap();
	secp_inst.randomize(&mut thread_rng());
	SECP256K1.clone()
}

/// The commitment to a value of zero, used to filter out no-op commitments
/// when summing.
pub fn commit_to_zero_value() -> secp::pedersen::Commitment {
	*ZERO_COMMITMENT
}
