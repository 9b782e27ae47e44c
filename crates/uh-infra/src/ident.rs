//! Composite product identifiers.
//!
//! Two shapes are in use:
//!
//! - control panels: `FAMILY.tier_name.index`, e.g. `CP_PLESK.plesk_12_license.1`,
//!   where `index` is the zero-based enum index of the license tier;
//! - VMs: a four-character family followed by a one-based tier number,
//!   e.g. `VM-A2`. The vendor indexes VM packages from zero, so `VM-A2` is
//!   enum index 1 of family `VM-A`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const VM_FAMILY_WIDTH: usize = 4;

/// Decoded `FAMILY.tier_name.index` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductSelector {
    pub family: String,
    pub tier: String,
    pub index: u32,
}

impl ProductSelector {
    pub fn new(family: impl Into<String>, tier: impl Into<String>, index: u32) -> Self {
        Self {
            family: family.into(),
            tier: tier.into(),
            index,
        }
    }
}

pub fn encode(family: &str, tier: &str, index: u32) -> String {
    format!("{family}.{tier}.{index}")
}

pub fn decode(value: &str) -> Result<ProductSelector> {
    let malformed = |reason| Error::MalformedIdentifier {
        value: value.to_string(),
        reason,
    };

    let mut parts = value.split('.');
    let (Some(family), Some(tier), Some(index), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed("expected three dot-separated segments"));
    };
    if family.is_empty() || tier.is_empty() {
        return Err(malformed("family and tier must not be empty"));
    }

    let index = parse_canonical::<u32>(index)
        .ok_or_else(|| malformed("enum index is not a non-negative integer"))?;

    Ok(ProductSelector::new(family, tier, index))
}

impl fmt::Display for ProductSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.family, &self.tier, self.index))
    }
}

impl FromStr for ProductSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}

impl TryFrom<String> for ProductSelector {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        decode(&value)
    }
}

impl From<ProductSelector> for String {
    fn from(value: ProductSelector) -> Self {
        value.to_string()
    }
}

/// Decoded VM product id: family plus zero-based package index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VmSelector {
    pub family: String,
    pub index: u32,
}

impl VmSelector {
    /// Build from the zero-based `vm_type` index found on an order.
    pub fn from_index(family: impl Into<String>, index: i64) -> Result<Self> {
        let family = family.into();
        match u32::try_from(index) {
            Ok(index) if index < u32::MAX => Ok(Self { family, index }),
            _ => Err(Error::InvalidTier {
                value: format!("{family}{}", index.saturating_add(1)),
                tier: index.saturating_add(1),
            }),
        }
    }

    /// One-based tier number as shown to users.
    pub fn tier(&self) -> u32 {
        self.index + 1
    }
}

pub fn encode_vm(family: &str, tier: u32) -> String {
    format!("{family}{tier}")
}

pub fn decode_vm(value: &str) -> Result<VmSelector> {
    let malformed = |reason| Error::MalformedIdentifier {
        value: value.to_string(),
        reason,
    };

    if value.len() <= VM_FAMILY_WIDTH || !value.is_char_boundary(VM_FAMILY_WIDTH) {
        return Err(malformed("expected a four-character family followed by a tier number"));
    }
    let (family, tier) = value.split_at(VM_FAMILY_WIDTH);

    let tier = parse_canonical::<i64>(tier).ok_or_else(|| malformed("tier is not an integer"))?;
    if tier < 1 {
        return Err(Error::InvalidTier {
            value: value.to_string(),
            tier,
        });
    }
    let index = u32::try_from(tier - 1)
        .ok()
        .filter(|index| *index < u32::MAX)
        .ok_or_else(|| malformed("tier is out of range"))?;

    Ok(VmSelector {
        family: family.to_string(),
        index,
    })
}

impl fmt::Display for VmSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_vm(&self.family, self.tier()))
    }
}

impl FromStr for VmSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_vm(s)
    }
}

impl TryFrom<String> for VmSelector {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        decode_vm(&value)
    }
}

impl From<VmSelector> for String {
    fn from(value: VmSelector) -> Self {
        value.to_string()
    }
}

/// Parse an integer, rejecting forms that would not round-trip (`+2`, `02`).
fn parse_canonical<T: FromStr + ToString>(s: &str) -> Option<T> {
    let n: T = s.parse().ok()?;
    (n.to_string() == s).then_some(n)
}
