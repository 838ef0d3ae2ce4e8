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

//! Transaction fee calculation.

/// Fee base unit used when a caller doesn't supply one of its own, in the
/// smallest indivisible amount (a nanogrin-style unit). One transaction
/// "weight unit" costs this many units of fee.
pub const DEFAULT_BASE_FEE: u64 = 1_000_000;

/// Computes the minimum fee for a transaction with the given shape.
///
/// `fee = base_fee * max(1, num_outputs * 4 + num_kernels - num_inputs)`
///
/// Outputs and kernels are weighted more heavily than inputs because they
/// persist in the UTXO/kernel set forever, while a spent input eventually
/// drops out of it. `base_fee` is the coin selector's per-weight-unit price;
/// `None` falls back to [`DEFAULT_BASE_FEE`].
pub fn tx_fee(num_inputs: usize, num_outputs: usize, num_kernels: usize, base_fee: Option<u64>) -> u64 {
	let base_fee = base_fee.unwrap_or(DEFAULT_BASE_FEE);
	let scale = (num_outputs * 4 + num_kernels) as i64 - num_inputs as i64;
	base_fee * std::cmp::max(1, scale) as u64
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn fee_floor_is_one_base_unit() {
		assert_eq!(tx_fee(10, 0, 1, None), DEFAULT_BASE_FEE);
	}

	#[test]
	fn fee_scales_with_outputs_and_kernels() {
		assert_eq!(tx_fee(1, 1, 1, None), DEFAULT_BASE_FEE * 4);
		assert_eq!(tx_fee(1, 2, 1, None), DEFAULT_BASE_FEE * 8);
	}

	#[test]
	fn fee_honors_an_explicit_base() {
		assert_eq!(tx_fee(1, 1, 1, Some(1_000)), 4_000);
		assert_eq!(tx_fee(10, 0, 1, Some(1_000)), 1_000);
	}

	#[test]
	fn fee_matches_its_formula_over_random_shapes() {
		use rand::Rng;
		let mut rng = rand::thread_rng();
		for _ in 0..1_000 {
			let num_inputs: usize = rng.gen_range(0, 50);
			let num_outputs: usize = rng.gen_range(0, 50);
			let num_kernels: usize = rng.gen_range(0, 10);
			let base_fee: u64 = rng.gen_range(1, 10_000);

			let fee = tx_fee(num_inputs, num_outputs, num_kernels, Some(base_fee));
			assert_eq!(fee % base_fee, 0, "fee must be a whole multiple of the base unit");
			assert!(fee >= base_fee, "fee never drops below the floor");

			let scale = (num_outputs * 4 + num_kernels) as i64 - num_inputs as i64;
			let expected = base_fee * std::cmp::max(1, scale) as u64;
			assert_eq!(fee, expected);

			// Adding one more output can only raise the fee, never lower it.
			assert!(tx_fee(num_inputs, num_outputs + 1, num_kernels, Some(base_fee)) >= fee);
		}
	}
}
