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

//! Keychain paths and the `Identifier` that encodes them.
//!
//! Grin-style wallets don't track an arbitrary-depth BIP32 path per output;
//! every path used by the wallet core is at most [`MAX_PATH_DEPTH`] levels
//! deep (account / change-branch / index / unused), so `Identifier` packs
//! `(depth, [ChildNumber; MAX_PATH_DEPTH])` into a fixed-size, hex-serializable
//! value that doubles as the database key for an output.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use serde::{de, ser};

use crate::error::Error;

/// Maximum derivation depth representable by an `Identifier`.
pub const MAX_PATH_DEPTH: usize = 4;

/// `1` depth byte + `MAX_PATH_DEPTH` `u32` indices.
pub const IDENTIFIER_SIZE: usize = 1 + 4 * MAX_PATH_DEPTH;

/// A single level of a keychain derivation path. Hardened indices (high bit
/// set on the wire) mix in the parent's private key material rather than
/// just its public key; the wallet only ever allocates normal indices for
/// output derivation, but account roots may be hardened.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ChildNumber {
	/// Non-hardened child, index within `[0, 2^31)`.
	Normal {
		/// child index
		index: u32,
	},
	/// Hardened child, index within `[0, 2^31)`.
	Hardened {
		/// child index
		index: u32,
	},
}

impl ChildNumber {
	/// Build a normal child number.
	pub fn from_normal_idx(index: u32) -> Self {
		assert_eq!(index & (1 << 31), 0, "child index out of range: {}", index);
		ChildNumber::Normal { index }
	}

	/// Build a hardened child number.
	pub fn from_hardened_idx(index: u32) -> Self {
		assert_eq!(index & (1 << 31), 0, "child index out of range: {}", index);
		ChildNumber::Hardened { index }
	}

	/// True for `Normal`.
	pub fn is_normal(self) -> bool {
		!self.is_hardened()
	}

	/// True for `Hardened`.
	pub fn is_hardened(self) -> bool {
		matches!(self, ChildNumber::Hardened { .. })
	}
}

impl From<u32> for ChildNumber {
	fn from(n: u32) -> Self {
		if n & (1 << 31) != 0 {
			ChildNumber::Hardened {
				index: n ^ (1 << 31),
			}
		} else {
			ChildNumber::Normal { index: n }
		}
	}
}

impl From<ChildNumber> for u32 {
	fn from(cn: ChildNumber) -> Self {
		match cn {
			ChildNumber::Normal { index } => index,
			ChildNumber::Hardened { index } => index | (1 << 31),
		}
	}
}

impl Default for ChildNumber {
	fn default() -> Self {
		ChildNumber::Normal { index: 0 }
	}
}

/// An ordered, fixed-depth derivation path from the keychain root.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Path {
	/// Number of path components actually in use; the remainder of `path`
	/// is zero-filled and ignored.
	pub depth: u8,
	/// Fixed-size backing array for the path components.
	pub path: [ChildNumber; MAX_PATH_DEPTH],
}

impl Path {
	/// Build a path from a slice of indices (depth = slice length).
	pub fn new(indices: &[u32]) -> Result<Path, Error> {
		if indices.len() > MAX_PATH_DEPTH {
			return Err(Error::InvalidPathDepth);
		}
		let mut path = [ChildNumber::default(); MAX_PATH_DEPTH];
		for (i, idx) in indices.iter().enumerate() {
			path[i] = ChildNumber::from(*idx);
		}
		Ok(Path {
			depth: indices.len() as u8,
			path,
		})
	}

	/// The root (empty) path.
	pub fn zero() -> Path {
		Path {
			depth: 0,
			path: [ChildNumber::default(); MAX_PATH_DEPTH],
		}
	}

	/// Returns a new path with one more component appended.
	pub fn extend(&self, child: ChildNumber) -> Result<Path, Error> {
		if self.depth as usize >= MAX_PATH_DEPTH {
			return Err(Error::InvalidPathDepth);
		}
		let mut path = self.path;
		path[self.depth as usize] = child;
		Ok(Path {
			depth: self.depth + 1,
			path,
		})
	}

	/// Parse a `"m/0/1/2"`-style path string.
	pub fn from_str(s: &str) -> Result<Path, Error> {
		let trimmed = s.strip_prefix("m/").unwrap_or(s);
		if trimmed.is_empty() {
			return Ok(Path::zero());
		}
		let mut indices = vec![];
		for part in trimmed.split('/') {
			let idx: u32 = part
				.parse()
				.map_err(|_| Error::KeyDerivation(format!("invalid path component: {}", part)))?;
			indices.push(idx);
		}
		Path::new(&indices)
	}

	/// Render as `"m/0/1/2"`.
	pub fn to_path_string(&self) -> String {
		let mut s = String::from("m");
		for i in 0..self.depth as usize {
			s.push('/');
			s.push_str(&u32::from(self.path[i]).to_string());
		}
        s
	}

	/// Encode into the fixed-size `Identifier` representation.
	pub fn to_identifier(&self) -> Identifier {
		let mut bytes = [0u8; IDENTIFIER_SIZE];
		bytes[0] = self.depth;
		for i in 0..MAX_PATH_DEPTH {
			BigEndian::write_u32(&mut bytes[1 + i * 4..5 + i * 4], u32::from(self.path[i]));
		}
		Identifier(bytes)
	}
}

/// Fixed-size, wire-stable handle for a derivation path. Doubles as the
/// database key under which an `OutputData` records its owning path.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier([u8; IDENTIFIER_SIZE]);

impl Identifier {
	/// The zero (root) identifier.
	pub fn zero() -> Identifier {
		Identifier([0; IDENTIFIER_SIZE])
	}

	/// Build from a `Path`.
	pub fn from_path(path: &Path) -> Identifier {
		path.to_identifier()
	}

	/// Decode back into a `Path`.
	pub fn to_path(&self) -> Path {
		let mut path = [ChildNumber::default(); MAX_PATH_DEPTH];
		for i in 0..MAX_PATH_DEPTH {
			let idx = BigEndian::read_u32(&self.0[1 + i * 4..5 + i * 4]);
			path[i] = ChildNumber::from(idx);
		}
		Path {
			depth: self.0[0],
			path,
		}
	}

	/// Raw bytes.
	pub fn to_bytes(&self) -> [u8; IDENTIFIER_SIZE] {
		self.0
	}

	/// Hex encoding, used on the wire and as the log-friendly representation.
	pub fn to_hex(&self) -> String {
		mw_util::to_hex(self.0.to_vec())
	}

	/// Parse from a hex string.
	pub fn from_hex(hex: &str) -> Result<Identifier, Error> {
		let bytes =
			mw_util::from_hex(hex.to_string()).map_err(|e| Error::KeyDerivation(e.to_string()))?;
		if bytes.len() != IDENTIFIER_SIZE {
			return Err(Error::KeyDerivation("wrong identifier length".to_string()));
		}
		let mut out = [0u8; IDENTIFIER_SIZE];
		out.copy_from_slice(&bytes);
		Ok(Identifier(out))
	}
}

impl AsRef<[u8]> for Identifier {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Debug for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Identifier({})", self.to_path().to_path_string())
	}
}

impl fmt::Display for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.to_path().to_path_string())
	}
}

impl ser::Serialize for Identifier {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: ser::Serializer,
	{
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> de::Deserialize<'de> for Identifier {
	fn deserialize<D>(deserializer: D) -> Result<Identifier, D::Error>
	where
		D: de::Deserializer<'de>,
	{
		struct IdVisitor;
		impl<'de> de::Visitor<'de> for IdVisitor {
			type Value = Identifier;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a hex-encoded keychain identifier")
			}

			fn visit_str<E>(self, s: &str) -> Result<Identifier, E>
			where
				E: de::Error,
			{
				Identifier::from_hex(s).map_err(de::Error::custom)
			}
		}
		deserializer.deserialize_str(IdVisitor)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn path_roundtrips_through_identifier() {
		let p = Path::new(&[2, 0, 7]).unwrap();
		let id = p.to_identifier();
		let p2 = id.to_path();
		assert_eq!(p, p2);
	}

	#[test]
	fn path_string_roundtrip() {
		let p = Path::from_str("m/2/0/7").unwrap();
		assert_eq!(p.to_path_string(), "m/2/0/7");
	}

	#[test]
	fn identifier_hex_roundtrip() {
		let p = Path::new(&[1, 2, 3, 4]).unwrap();
		let id = p.to_identifier();
		let hex = id.to_hex();
		let back = Identifier::from_hex(&hex).unwrap();
		assert_eq!(id, back);
	}
}
