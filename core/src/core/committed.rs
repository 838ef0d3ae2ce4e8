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

//! The `Committed` trait: shared sum-to-zero bookkeeping for anything that
//! holds a set of input/output/kernel Pedersen commitments (a `Transaction`
//! or a slate's in-progress `TransactionBody`).

use mw_keychain::BlindingFactor;
use mw_util::secp::pedersen::Commitment;
use mw_util::{secp_static, static_secp_instance};

use crate::error::Error;

/// Implemented by types that hold inputs, outputs and kernels containing
/// Pedersen commitments. Handles summing the commitments, taking the
/// kernel offset and any explicit overage (the transaction fee) into
/// account.
pub trait Committed {
	/// Vector of input commitments to verify.
	fn inputs_committed(&self) -> Vec<Commitment>;
	/// Vector of output commitments to verify.
	fn outputs_committed(&self) -> Vec<Commitment>;
	/// Vector of kernel excesses to verify.
	fn kernels_committed(&self) -> Vec<Commitment>;

	/// Sum of kernel excesses, plus a commitment to the offset's value (so
	/// it can be compared directly against the input/output commitment
	/// sum).
	fn sum_kernel_excesses(
		&self,
		offset: &BlindingFactor,
		extra_excess: Option<&Commitment>,
	) -> Result<(Commitment, Commitment), Error> {
		let zero_commit = secp_static::commit_to_zero_value();

		let mut kernel_commits = self.kernels_committed();
		if let Some(extra) = extra_excess {
			kernel_commits.push(*extra);
		}
		kernel_commits.retain(|x| *x != zero_commit);

		let kernel_sum = {
			let secp = static_secp_instance();
			let secp = secp.lock().unwrap();
			secp.commit_sum(kernel_commits, vec![])?
		};

		let kernel_sum_plus_offset = {
			let secp = static_secp_instance();
			let secp = secp.lock().unwrap();
			let mut commits = vec![kernel_sum];
			if *offset != BlindingFactor::zero() {
				let key = offset.secret_key(&secp)?;
				let offset_commit = secp.commit(0, key)?;
				commits.push(offset_commit);
			}
			secp.commit_sum(commits, vec![])?
		};

		Ok((kernel_sum, kernel_sum_plus_offset))
	}

	/// Sum of output commitments minus input commitments, with `overage`
	/// (the fee) folded in as an implicit input commitment to zero value
	/// plus `overage`.
	fn sum_commitments(
		&self,
		overage: i64,
		extra_commit: Option<&Commitment>,
	) -> Result<Commitment, Error> {
		let zero_commit = secp_static::commit_to_zero_value();

		let mut input_commits = self.inputs_committed();
		let mut output_commits = self.outputs_committed();

		if overage != 0 {
			let over_commit = {
				let secp = static_secp_instance();
				let secp = secp.lock().unwrap();
				secp.commit_value(overage.unsigned_abs())?
			};
			if overage < 0 {
				input_commits.push(over_commit);
			} else {
				output_commits.push(over_commit);
			}
		}

		if let Some(extra) = extra_commit {
			output_commits.push(*extra);
		}

		output_commits.retain(|x| *x != zero_commit);
		input_commits.retain(|x| *x != zero_commit);

		let secp = static_secp_instance();
		let secp = secp.lock().unwrap();
		Ok(secp.commit_sum(output_commits, input_commits)?)
	}

	/// Verifies that `Σ outputs − Σ inputs − Σ kernel.excess − offset·G −
	/// fee·H == 0`, the defining Mimblewimble invariant.
	fn verify_kernel_sums(
		&self,
		overage: i64,
		kernel_offset: BlindingFactor,
		prev_output_sum: Option<&Commitment>,
		prev_kernel_sum: Option<&Commitment>,
	) -> Result<(Commitment, Commitment), Error> {
		let utxo_sum = self.sum_commitments(overage, prev_output_sum)?;
		let (kernel_sum, kernel_sum_plus_offset) =
			self.sum_kernel_excesses(&kernel_offset, prev_kernel_sum)?;

		if utxo_sum != kernel_sum_plus_offset {
			return Err(Error::KernelSumMismatch);
		}

		Ok((utxo_sum, kernel_sum))
	}
}
