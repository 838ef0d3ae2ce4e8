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

//! Errors raised while building or validating a transaction's commitment
//! sums.

use failure::Fail;
use mw_keychain::Error as KeychainError;
use mw_util::secp;

/// Errors from summing and verifying kernel/output commitments.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum Error {
	/// Keychain related error.
	#[fail(display = "Keychain error: {}", _0)]
	Keychain(KeychainError),
	/// Secp related error.
	#[fail(display = "Secp error: {:?}", _0)]
	Secp(secp::Error),
	/// Input, output and kernel commitments do not balance to zero.
	#[fail(display = "Kernel sum mismatch")]
	KernelSumMismatch,
	/// A kernel's signature does not verify against its excess.
	#[fail(display = "Kernel signature does not verify")]
	IncorrectSignature,
	/// A range proof failed verification.
	#[fail(display = "Invalid range proof")]
	InvalidRangeProof,
	/// Transaction carries no kernels.
	#[fail(display = "Transaction has no kernels")]
	NoKernels,
}

impl From<secp::Error> for Error {
	fn from(e: secp::Error) -> Error {
		Error::Secp(e)
	}
}

impl From<KeychainError> for Error {
	fn from(e: KeychainError) -> Error {
		Error::Keychain(e)
	}
}
