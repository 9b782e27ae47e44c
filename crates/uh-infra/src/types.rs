use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ident::{ProductSelector, VmSelector};

/// Opaque vendor order identifier. Every provisioned entity is backed by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value that may not be resolved yet.
///
/// Locally planned records can carry `Unknown` for vendor-derived fields.
/// Reconciliation turns every `Unknown` into `Absent` before a record is
/// handed back, so callers never see an unresolved value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Planned<T> {
    Known(T),
    #[default]
    Unknown,
    Absent,
}

impl<T> Planned<T> {
    pub fn normalized(self) -> Self {
        match self {
            Planned::Unknown => Planned::Absent,
            other => other,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Planned::Unknown)
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            Planned::Known(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Planned<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Planned::Absent, Planned::Known)
    }
}

impl<T: Serialize> Serialize for Planned<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_known().serialize(serializer)
    }
}

/// `null` reads as `Absent`; a missing field (via `#[serde(default)]`) as `Unknown`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Planned<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Planned::from)
    }
}

// ── Virtual machine ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vm {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Hypervisor-side uuid, assigned once the vendor has provisioned the VM.
    #[serde(default)]
    pub instance_id: Option<String>,
    /// Product id such as `VM-A2`.
    pub product: VmSelector,
    /// Operating system tag, e.g. `ubuntu-24.04`.
    #[serde(default)]
    pub os: Option<String>,
    pub hostname: String,
    /// Location code, e.g. `AMS1`.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub ram_mb: i64,
    #[serde(default)]
    pub cores: i64,
    /// Never decreases across updates.
    #[serde(default)]
    pub disk_gb: i64,
    #[serde(default)]
    pub network: NetworkMode,
    #[serde(default)]
    pub vpc_only: bool,
    /// VxLAN numbers this VM is attached to. At most one is tracked.
    #[serde(default)]
    pub vpcs: Vec<u32>,
    #[serde(default)]
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NetworkMode {
    #[default]
    Dhcp,
    Static(StaticNetwork),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticNetwork {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub subnet_mask: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub dns_server: Option<String>,
}

// ── Control panel ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPanel {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Order of the VM this license is attached to. Not owned.
    pub vm_id: OrderId,
    /// Composite product id such as `CP_PLESK.plesk_12_license.1`.
    pub product: ProductSelector,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

/// An add-on toggled by a flag option. Description and price come from the
/// vendor catalog and are never authoritative locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub id: String,
    #[serde(default)]
    pub description: Planned<String>,
    #[serde(default)]
    pub price: Planned<f64>,
}

impl Extension {
    pub fn planned(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: Planned::Unknown,
            price: Planned::Unknown,
        }
    }
}

// ── VPC ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Vendor-assigned VxLAN number.
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub removable: bool,
    #[serde(default)]
    pub members: Vec<VpcMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcMember {
    pub order_id: OrderId,
    pub mac_address: String,
}
