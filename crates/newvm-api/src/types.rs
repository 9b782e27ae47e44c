use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse "option id → quantity" set sent with orders and change requests.
pub type OptionAmounts = BTreeMap<String, i64>;

// ── Auth ────────────────────────────────────────────────────────────

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub totp: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

// ── Orders ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrderEnvelope {
    pub order: Order,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(default, rename = "parentid")]
    pub parent_id: i64,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub options: Vec<OrderOption>,
    #[serde(default, rename = "prov_options")]
    pub provisioning_options: ProvisioningOptions,
    #[serde(default, rename = "prov_data")]
    pub provisioning_data: ProvisioningData,
    #[serde(default)]
    pub billed_until: Option<String>,
    #[serde(default)]
    pub needs_change: i64,
}

impl Order {
    /// The vendor flags orders with a queued, not-yet-applied change request.
    pub fn has_pending_change(&self) -> bool {
        self.needs_change == 1
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderOption {
    #[serde(default)]
    pub option_id: String,
    #[serde(default)]
    pub item_count: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub is_setup: i64,
    #[serde(default)]
    pub meta: Vec<String>,
}

impl OrderOption {
    pub fn is_flag(&self) -> bool {
        self.kind == "flag"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningOptions {
    #[serde(default)]
    pub provisioning: Provisioning,
    #[serde(default)]
    pub auto_provision: bool,
    #[serde(default)]
    pub comments: String,
}

/// Provisioning attributes. Read back from orders and sent with new VM orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provisioning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, rename = "sshkey", skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
    #[serde(default, rename = "vxlanid", skip_serializing_if = "Option::is_none")]
    pub vxlan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, rename = "vm_locations", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, rename = "isVpcOnly", skip_serializing_if = "std::ops::Not::not")]
    pub vpc_only: bool,
    #[serde(default, rename = "useDhcp", skip_serializing_if = "std::ops::Not::not")]
    pub use_dhcp: bool,
    #[serde(default, rename = "ipaddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, rename = "subnetmask", skip_serializing_if = "Option::is_none")]
    pub subnet_mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(default, rename = "dnsserver", skip_serializing_if = "Option::is_none")]
    pub dns_server: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningData {
    #[serde(default)]
    pub vm_uuid: Option<String>,
    #[serde(default, rename = "vm_ipaddress")]
    pub vm_ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    pub amount: OptionAmounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_description: Option<String>,
    #[serde(rename = "parentid", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning: Option<Provisioning>,
    #[serde(rename = "autoProvision")]
    pub auto_provision: bool,
    #[serde(rename = "finishOrderGroup")]
    pub finish_order_group: bool,
    #[serde(rename = "promoCodes", skip_serializing_if = "Vec::is_empty")]
    pub promo_codes: Vec<String>,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlacedOrder {
    #[serde(rename = "orderid")]
    pub order_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeOrderRequest {
    pub options: OptionAmounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndDateRequest {
    /// Civil date, `YYYY-MM-DD`.
    pub end_date: String,
    #[serde(rename = "includeSubOrders")]
    pub include_sub_orders: bool,
}

// ── Change requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChangeRequestList {
    #[serde(default)]
    pub result: Vec<ChangeRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeRequest {
    pub id: i64,
    #[serde(default)]
    pub order_id: i64,
    #[serde(default)]
    pub scheduled_date: Option<String>,
    /// JSON-encoded option set, e.g. `{"vm_core":4,"vm_mem":8192}`.
    #[serde(default, rename = "new_option")]
    pub new_options: String,
    #[serde(default, rename = "provisionerror")]
    pub provisioning_error: Option<String>,
    #[serde(default, rename = "isprovisionerrorinternal")]
    pub is_internal_error: i64,
}

// ── Catalog ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub base_price: f64,
    #[serde(default)]
    pub pricing: Vec<Pricing>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default, rename = "product_option_properties")]
    pub option_properties: Vec<OptionProperty>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pricing {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub min: i64,
    #[serde(default)]
    pub max: i64,
    #[serde(default)]
    pub enum_options: Vec<EnumOption>,
    #[serde(default)]
    pub default_price: f64,
}

impl Pricing {
    pub fn is_flag(&self) -> bool {
        self.kind == "flag"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnumOption {
    #[serde(rename = "enum_index")]
    pub index: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionProperty {
    #[serde(rename = "optionindex")]
    pub option_index: i64,
    pub property_id: String,
    #[serde(rename = "product_option_id")]
    pub pricing_id: String,
    #[serde(default)]
    pub value: String,
}

// ── Directory listings ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OperatingSystemList {
    #[serde(default)]
    pub result: Vec<OperatingSystem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperatingSystem {
    pub id: String,
    #[serde(default, rename = "idtag")]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LocationList {
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "extcode")]
    pub code: String,
    #[serde(default, rename = "productIds")]
    pub product_ids: Vec<String>,
    #[serde(default)]
    pub provisionable: i64,
}

impl Location {
    pub fn is_provisionable(&self) -> bool {
        self.provisionable == 1
    }
}

// ── VxLAN (VPC) ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VxlanList {
    #[serde(default)]
    pub vxlan: Vec<Vxlan>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VxlanEnvelope {
    pub vxlan: Vxlan,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vxlan {
    pub id: String,
    #[serde(default, rename = "vxlan")]
    pub number: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "ownerid")]
    pub owner_id: i64,
    #[serde(default, rename = "removablebycustomer")]
    pub removable: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VxlanMemberList {
    #[serde(default)]
    pub members: Vec<VxlanMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VxlanMember {
    pub id: String,
    #[serde(default, rename = "vxlan")]
    pub number: i64,
    #[serde(default, rename = "macaddress")]
    pub mac_address: String,
    #[serde(default, rename = "orderid")]
    pub order_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct VxlanLabel<'a> {
    pub label: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreatedVxlan {
    pub id: String,
}

// ── VM power state ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VmStateEnvelope {
    pub vm: VmState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmState {
    #[serde(default)]
    pub status: String,
}

impl VmState {
    pub fn is_stopped(&self) -> bool {
        self.status == "STOPPED"
    }
}
