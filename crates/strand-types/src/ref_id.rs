use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;
use crate::hash::{Sha1Hash, Sha3Hash};

/// The digest family of a [`RefId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlg {
    Sha1,
    Sha3,
}

impl HashAlg {
    /// The literal tag used in the canonical text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha3 => "sha3",
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlg {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha1" => Ok(Self::Sha1),
            "sha3" => Ok(Self::Sha3),
            other => Err(TypeError::UnknownHashAlg(other.to_string())),
        }
    }
}

/// A tagged digest naming a stored blob.
///
/// Two `RefId`s are equal iff both the algorithm and the digest match. The
/// canonical text form is `"<alg>:<hex>"` (e.g. `"sha3:1c8aff…"`), which is
/// what the persistent missing set keys on and what peers exchange.
///
/// The enum carries the exact-width digest for each family, so a `RefId`
/// with an out-of-range algorithm tag cannot be constructed; bad tags are
/// rejected when parsing the text form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefId {
    Sha1(Sha1Hash),
    Sha3(Sha3Hash),
}

impl RefId {
    /// The algorithm tag of this reference.
    pub fn alg(&self) -> HashAlg {
        match self {
            Self::Sha1(_) => HashAlg::Sha1,
            Self::Sha3(_) => HashAlg::Sha3,
        }
    }

    /// Hex-encoded digest, without the algorithm tag.
    pub fn hex(&self) -> String {
        match self {
            Self::Sha1(hash) => hash.to_hex(),
            Self::Sha3(hash) => hash.to_hex(),
        }
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alg(), self.hex())
    }
}

impl fmt::Debug for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1(hash) => write!(f, "RefId(sha1:{})", hash.short_hex()),
            Self::Sha3(hash) => write!(f, "RefId(sha3:{})", hash.short_hex()),
        }
    }
}

impl FromStr for RefId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (alg, hex) = s
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedRefId(s.to_string()))?;
        match alg.parse::<HashAlg>()? {
            HashAlg::Sha1 => Ok(Self::Sha1(Sha1Hash::from_hex(hex)?)),
            HashAlg::Sha3 => Ok(Self::Sha3(Sha3Hash::from_hex(hex)?)),
        }
    }
}

impl From<Sha1Hash> for RefId {
    fn from(hash: Sha1Hash) -> Self {
        Self::Sha1(hash)
    }
}

impl From<Sha3Hash> for RefId {
    fn from(hash: Sha3Hash) -> Self {
        Self::Sha3(hash)
    }
}

// Serialized as the canonical text form rather than an enum tree, so that a
// serialized RefId is exactly the string peers and the missing set use.
impl Serialize for RefId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RefId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
