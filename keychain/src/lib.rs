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

//! Hierarchical deterministic keychain and the Mimblewimble crypto
//! primitives (commitments, blinding factors, Schnorr signing) built on
//! top of it. `ExtKeychain` is the only concrete `Keychain` implementation
//! and is what the wallet crate holds for the lifetime of an unlocked
//! session.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

pub use mw_util as util;

mod bip32;
mod error;
mod ext_keychain;
mod path;
mod payment_proof_keys;
mod types;

pub use crate::bip32::{Bip32Hasher, DefaultHasher, ExtendedPrivKey};
pub use crate::error::Error;
pub use crate::ext_keychain::ExtKeychain;
pub use crate::path::{ChildNumber, Identifier, Path, IDENTIFIER_SIZE, MAX_PATH_DEPTH};
pub use crate::payment_proof_keys::payment_proof_identity_keypair;
pub use crate::types::{BlindSum, BlindingFactor, Keychain, SplitBlindingFactor};
