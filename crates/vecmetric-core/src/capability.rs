//! Hardware capability bitmask.
//!
//! Every named feature owns a fixed bit. Positions are part of the public
//! contract: new features take unused bits, existing ones are never moved.
//!
//! | Feature       | Bit |
//! |---------------|-----|
//! | `neon`        | 0   |
//! | `sve`         | 1   |
//! | `sve2`        | 2   |
//! | `avx2`        | 10  |
//! | `avx512`      | 11  |
//! | `avx2fp16`    | 12  |
//! | `avx512fp16`  | 13  |
//! | `amx`         | 20  |
//! | `sme`         | 21  |

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Set of vector-instruction features, either detected or permitted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    /// Portable baseline only.
    pub const NONE: Self = Self(0);
    /// ARM Advanced SIMD.
    pub const NEON: Self = Self(1 << 0);
    /// ARM Scalable Vector Extension.
    pub const SVE: Self = Self(1 << 1);
    /// ARM Scalable Vector Extension 2.
    pub const SVE2: Self = Self(1 << 2);
    /// x86 AVX2 with FMA.
    pub const AVX2: Self = Self(1 << 10);
    /// x86 AVX-512 Foundation with Byte/Word instructions.
    pub const AVX512: Self = Self(1 << 11);
    /// x86 AVX2 with F16C half-precision conversion.
    pub const AVX2_FP16: Self = Self(1 << 12);
    /// x86 AVX-512 with native FP16 arithmetic.
    pub const AVX512_FP16: Self = Self(1 << 13);
    /// x86 Advanced Matrix Extensions.
    pub const AMX: Self = Self(1 << 20);
    /// ARM Scalable Matrix Extension.
    pub const SME: Self = Self(1 << 21);

    const NAMED: [(Self, &'static str); 9] = [
        (Self::NEON, "neon"),
        (Self::SVE, "sve"),
        (Self::SVE2, "sve2"),
        (Self::AVX2, "avx2"),
        (Self::AVX512, "avx512"),
        (Self::AVX2_FP16, "avx2fp16"),
        (Self::AVX512_FP16, "avx512fp16"),
        (Self::AMX, "amx"),
        (Self::SME, "sme"),
    ];

    /// Every named feature.
    #[must_use]
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < Self::NAMED.len() {
            bits |= Self::NAMED[i].0 .0;
            i += 1;
        }
        Self(bits)
    }

    /// Builds a mask from raw bits, keeping only named positions.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true when no feature is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true when every feature of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true when `self` and `other` share a feature.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Bitwise AND, usable in const contexts.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bitwise OR, usable in const contexts.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Features of `self` not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Sets `other` in `self` when `enabled` is true.
    pub fn set(&mut self, other: Self, enabled: bool) {
        if enabled {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    /// Iterates over the names of the set features, lowest bit first.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }

    /// Looks up a single feature by name.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let needle = name.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Self::NAMED
            .into_iter()
            .find(|(_, n)| *n == needle)
            .map(|(flag, _)| flag)
            .ok_or_else(|| Error::UnknownCapability(name.to_string()))
    }
}

impl BitAnd for Capabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for Capabilities {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Not for Capabilities {
    type Output = Self;

    fn not(self) -> Self {
        Self::all().difference(self)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities({:#x}: {})", self.0, self)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for name in self.names() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

/// Parses a comma-separated list of feature names; `all`, and `none` or
/// `serial` for the empty mask, are accepted.
impl FromStr for Capabilities {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "serial" => return Ok(Self::NONE),
            "all" => return Ok(Self::all()),
            _ => {}
        }
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .try_fold(Self::NONE, |acc, part| Ok(acc | Self::from_name(part)?))
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CapabilitiesVisitor;

        impl<'de> Visitor<'de> for CapabilitiesVisitor {
            type Value = Capabilities;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of capability names or a comma-separated string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                let bits = u32::try_from(v).map_err(E::custom)?;
                Ok(Capabilities::from_bits_truncate(bits))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                let bits = u32::try_from(v).map_err(E::custom)?;
                Ok(Capabilities::from_bits_truncate(bits))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut caps = Capabilities::NONE;
                while let Some(name) = seq.next_element::<String>()? {
                    caps |= Capabilities::from_name(&name).map_err(de::Error::custom)?;
                }
                Ok(caps)
            }
        }

        deserializer.deserialize_any(CapabilitiesVisitor)
    }
}
