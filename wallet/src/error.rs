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

//! Error types for the wallet core: one `ErrorKind` per failure domain,
//! wrapped in a `failure::Context` so a backtrace is captured at the point
//! an error is first raised rather than where it's finally handled.

use std::fmt::{self, Display};

use failure::{Backtrace, Context, Fail};

/// Wallet errors.
#[derive(Debug)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// The wallet's failure taxonomy. Lower-layer errors are folded in via
/// `From` impls rather than ever being downcast by a caller.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// Malformed slate/JSON on the wire.
	#[fail(display = "Deserialization error: {}", _0)]
	Deserialization(String),

	/// Coin selection could not cover `amount + fee`.
	#[fail(
		display = "Insufficient funds: needed {}, available {}",
		needed, available
	)]
	InsufficientFunds {
		/// Amount the operation needed, including fee.
		needed: u64,
		/// Amount actually spendable.
		available: u64,
	},

	/// No selection strategy could satisfy the request (e.g. empty output
	/// set, or an empty `CUSTOM` commitment list).
	#[fail(display = "Invalid selection strategy")]
	InvalidStrategy,

	/// Slate already received; receiver signature missing at finalize;
	/// wrong kernel count; any other violation of the phase ordering.
	#[fail(display = "Invalid slate state: {}", _0)]
	InvalidSlateState(String),

	/// A partial, aggregate, message, or payment-proof signature failed to
	/// verify.
	#[fail(display = "Signature verification failed")]
	SignatureVerification,

	/// A range proof, key derivation, or other primitive-level crypto
	/// operation failed.
	#[fail(display = "Crypto error: {}", _0)]
	Crypto(String),

	/// The wallet database failed; always fatal to the containing batch.
	#[fail(display = "Store error: {}", _0)]
	Store(String),

	/// Node RPC unreachable, or returned a rejection.
	#[fail(display = "Node error: {}", _0)]
	Node(String),

	/// Operation deadline expired or was explicitly cancelled.
	#[fail(display = "Operation cancelled")]
	Cancelled,

	/// `keychain` crate error.
	#[fail(display = "Keychain error: {}", _0)]
	Keychain(mw_keychain::Error),

	/// `core` transaction-validation error.
	#[fail(display = "Transaction error: {}", _0)]
	Transaction(mw_core::Error),

	/// An account label was registered twice.
	#[fail(display = "Account label '{}' already exists", _0)]
	AccountLabelAlreadyExists(String),

	/// An account label has no matching root path.
	#[fail(display = "Unknown account label '{}'", _0)]
	UnknownAccountLabel(String),

	/// A `WalletTx` referenced by id does not exist.
	#[fail(display = "Transaction with id {} does not exist", _0)]
	TransactionDoesntExist(u32),

	/// Cancel requested on a transaction that is not in a cancellable
	/// state (already finalized or already cancelled).
	#[fail(display = "Transaction with id {} is not cancellable", _0)]
	TransactionNotCancellable(u32),

	/// Catch-all for conditions with no dedicated variant.
	#[fail(display = "{}", _0)]
	GenericError(String),
}

impl Fail for Error {
	fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}

	fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.inner, f)
	}
}

impl Error {
	/// The `ErrorKind` this error wraps.
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}

	/// A human-readable rendering of the immediate cause, if any.
	pub fn cause_string(&self) -> String {
		match self.cause() {
			Some(c) => format!("{}", c),
			None => "Unknown".to_string(),
		}
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<Context<ErrorKind>> for Error {
	fn from(inner: Context<ErrorKind>) -> Error {
		Error { inner }
	}
}

impl From<mw_keychain::Error> for Error {
	fn from(error: mw_keychain::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Keychain(error)),
		}
	}
}

impl From<mw_core::Error> for Error {
	fn from(error: mw_core::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Transaction(error)),
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(error: serde_json::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Deserialization(error.to_string())),
		}
	}
}
