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

//! Sane serialization and deserialization of cryptographic structs to and
//! from hex, for use with `#[serde(with = "...")]` on transaction/slate
//! fields. JSON is the wire format for slates, so every secp type that
//! crosses that boundary needs one of these.

use mw_util::secp::pedersen::{Commitment, RangeProof};
use mw_util::{from_hex, to_hex};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

/// Serializes a secp `Signature` to and from hex.
pub mod sig_serde {
	use super::*;
	use mw_util::secp::Signature;
	use mw_util::static_secp_instance;

	/// Hex-encode a signature for serde.
	pub fn serialize<S>(sig: &Signature, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let static_secp = static_secp_instance();
		let static_secp = static_secp.lock().unwrap();
		serializer.serialize_str(&to_hex(sig.serialize_der(&static_secp)))
	}

	/// Decode a signature from its hex serde representation.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<Signature, D::Error>
	where
		D: Deserializer<'de>,
	{
		let static_secp = static_secp_instance();
		let static_secp = static_secp.lock().unwrap();
		String::deserialize(deserializer)
			.and_then(|s| from_hex(s).map_err(|e| Error::custom(e.to_string())))
			.and_then(|bytes: Vec<u8>| {
				Signature::from_der(&static_secp, &bytes).map_err(|e| Error::custom(e.to_string()))
			})
	}
}

/// Serializes an `Option<Signature>` to and from hex.
pub mod option_sig_serde {
	use super::*;
	use mw_util::secp::Signature;
	use mw_util::static_secp_instance;

	/// Hex-encode `Some(sig)`, or emit `null`.
	pub fn serialize<S>(sig: &Option<Signature>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match sig {
			Some(sig) => {
				let static_secp = static_secp_instance();
				let static_secp = static_secp.lock().unwrap();
				serializer.serialize_str(&to_hex(sig.serialize_der(&static_secp)))
			}
			None => serializer.serialize_none(),
		}
	}

	/// Decode an optional signature from its hex serde representation.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Signature>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let static_secp = static_secp_instance();
		let static_secp = static_secp.lock().unwrap();
		Option::<String>::deserialize(deserializer).and_then(|opt| match opt {
			Some(s) => from_hex(s)
				.map_err(|e| Error::custom(e.to_string()))
				.and_then(|bytes: Vec<u8>| {
					Signature::from_der(&static_secp, &bytes)
						.map(Some)
						.map_err(|e| Error::custom(e.to_string()))
				}),
			None => Ok(None),
		})
	}
}

/// Serializes a secp `PublicKey` to and from hex.
pub mod pubkey_serde {
	use super::*;
	use mw_util::secp::key::PublicKey;
	use mw_util::static_secp_instance;

	/// Hex-encode a compressed public key.
	pub fn serialize<S>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let static_secp = static_secp_instance();
		let static_secp = static_secp.lock().unwrap();
		serializer.serialize_str(&to_hex(key.serialize_vec(&static_secp, true).to_vec()))
	}

	/// Decode a compressed public key from its hex serde representation.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<PublicKey, D::Error>
	where
		D: Deserializer<'de>,
	{
		let static_secp = static_secp_instance();
		let static_secp = static_secp.lock().unwrap();
		String::deserialize(deserializer)
			.and_then(|s| from_hex(s).map_err(|e| Error::custom(e.to_string())))
			.and_then(|bytes: Vec<u8>| {
				PublicKey::from_slice(&static_secp, &bytes).map_err(|e| Error::custom(e.to_string()))
			})
	}
}

/// Accepts a `u64` as either a JSON number or a decimal string on input,
/// always emits a number. Lets a slate round-trip against peers that encode
/// big integers as strings (a common JS-side precaution) without this crate
/// ever doing so itself.
pub mod num_or_string_u64 {
	use serde::{de, Deserializer, Serializer};
	use std::fmt;

	/// Emit the value as a JSON number.
	pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(*value)
	}

	/// Accept either a JSON number or a decimal string.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct Visitor;
		impl<'de> de::Visitor<'de> for Visitor {
			type Value = u64;

			fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
				write!(formatter, "a u64 or a decimal string")
			}

			fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
				Ok(v)
			}

			fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				s.parse().map_err(de::Error::custom)
			}
		}
		deserializer.deserialize_any(Visitor)
	}
}

/// As [`num_or_string_u64`], for an `Option<u64>` that serializes as `null`
/// when absent.
pub mod opt_num_or_string_u64 {
	use serde::{de, Deserializer, Serializer};
	use std::fmt;

	/// Emit `Some(value)` as a JSON number, or `null`.
	pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(v) => serializer.serialize_u64(*v),
			None => serializer.serialize_none(),
		}
	}

	/// Accept `null`, a JSON number, or a decimal string.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct Visitor;
		impl<'de> de::Visitor<'de> for Visitor {
			type Value = Option<u64>;

			fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
				write!(formatter, "null, a u64, or a decimal string")
			}

			fn visit_unit<E>(self) -> Result<Self::Value, E> {
				Ok(None)
			}

			fn visit_none<E>(self) -> Result<Self::Value, E> {
				Ok(None)
			}

			fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
			where
				D2: Deserializer<'de>,
			{
				super::num_or_string_u64::deserialize(deserializer).map(Some)
			}

			fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
				Ok(Some(v))
			}

			fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				s.parse().map(Some).map_err(de::Error::custom)
			}
		}
		deserializer.deserialize_option(Visitor)
	}
}

/// Hex-encode a Pedersen commitment for serde.
pub fn commitment_to_hex<S>(commit: &Commitment, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&to_hex(commit.0.to_vec()))
}

/// Decode a Pedersen commitment from its hex serde representation.
pub fn commitment_from_hex<'de, D>(deserializer: D) -> Result<Commitment, D::Error>
where
	D: Deserializer<'de>,
{
	String::deserialize(deserializer)
		.and_then(|s| from_hex(s).map_err(|e| Error::custom(e.to_string())))
		.map(Commitment::from_vec)
}

/// Hex-encode a bulletproof range proof for serde.
pub fn rangeproof_to_hex<S>(proof: &RangeProof, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&to_hex(proof.bytes()))
}

/// Decode a bulletproof range proof from its hex serde representation.
pub fn rangeproof_from_hex<'de, D>(deserializer: D) -> Result<RangeProof, D::Error>
where
	D: Deserializer<'de>,
{
	use serde::de::IntoDeserializer;

	let bytes = String::deserialize(deserializer)
		.and_then(|s| from_hex(s).map_err(|e| Error::custom(e.to_string())))?;
	RangeProof::deserialize(bytes.into_deserializer())
}
