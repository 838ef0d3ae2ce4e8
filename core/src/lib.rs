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

//! Transaction primitives: inputs, outputs, kernels and the sum-to-zero
//! invariant that makes a Mimblewimble transaction self-validating without
//! revealing any amount.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

pub mod core;
pub mod error;
pub mod fee;
pub mod libtx;
pub mod ser_util;

pub use crate::core::committed::Committed;
pub use crate::core::transaction::{
	aggregate, Input, KernelFeatures, Output, OutputFeatures, Transaction, TransactionBody, TxKernel, TxSort,
};
pub use crate::error::Error;
pub use crate::fee::{tx_fee, DEFAULT_BASE_FEE};
