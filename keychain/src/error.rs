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

//! Keychain-level error kinds. Folded into `mw_wallet::libwallet::error::ErrorKind::Keychain`
//! by the wallet crate.

use crate::util::secp;
use failure::Fail;

/// All the ways a keychain/crypto-primitive operation can fail.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum Error {
	/// Underlying secp256k1 failure (bad scalar, bad point, etc).
	#[fail(display = "Secp error: {:?}", _0)]
	Secp(secp::Error),
	/// Key derivation along a path failed.
	#[fail(display = "Key derivation error: {}", _0)]
	KeyDerivation(String),
	/// Range proof creation or verification failed.
	#[fail(display = "Range proof error: {}", _0)]
	RangeProof(String),
	/// A path had too many components for the fixed-depth `Identifier` encoding.
	#[fail(display = "Invalid key derivation path (too deep)")]
	InvalidPathDepth,
	/// Ed25519 signing/verification failure, used by payment proofs.
	#[fail(display = "Ed25519 error: {}", _0)]
	ED25519(String),
}

impl From<secp::Error> for Error {
	fn from(e: secp::Error) -> Error {
		Error::Secp(e)
	}
}
