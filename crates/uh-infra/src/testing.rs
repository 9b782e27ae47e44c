//! In-memory vendor used by the unit tests. Serves canned records and keeps
//! every write so tests can assert on request bodies.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use newvm_api::{
    CatalogProduct, ChangeOrderRequest, ChangeRequest, EndDateRequest, Location, OperatingSystem,
    Order, OrderOption, PlaceOrderRequest, VmState, Vxlan, VxlanMember,
};
use serde_json::json;

use crate::options::is_known_flag;
use crate::types::OrderId;
use crate::{Catalog, Directory, Error, Network, Orders, Result};

pub(crate) const BILLED_UNTIL: &str = "2025-03-31T22:00:00.000Z";

#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

#[derive(Default)]
pub(crate) struct State {
    pub orders: HashMap<i64, Order>,
    pub change_requests: HashMap<i64, Vec<ChangeRequest>>,
    pub products: HashMap<String, CatalogProduct>,
    pub operating_systems: Vec<OperatingSystem>,
    pub locations: Vec<Location>,
    pub vxlans: Vec<Vxlan>,
    pub members: Vec<VxlanMember>,
    pub vm_status: HashMap<String, String>,
    pub next_order_id: i64,
    pub next_vxlan: i64,
    pub fail_directory: bool,
    pub undecodable_products: Vec<String>,
    pub fail_order_reads_after: Option<usize>,
    pub apply_changes: bool,

    pub placed: Vec<(String, PlaceOrderRequest)>,
    pub changes: Vec<(OrderId, ChangeOrderRequest)>,
    pub end_dates: Vec<(OrderId, EndDateRequest)>,
    pub powered_off: Vec<String>,
    pub deleted_vxlans: Vec<String>,
    pub order_reads: usize,
    pub list_fetches: usize,
    pub product_fetches: usize,
}

fn unavailable() -> Error {
    Error::Transport(newvm_api::Error::Unexpected {
        endpoint: "fake",
        body: "service unavailable".into(),
    })
}

impl FakeBackend {
    /// A VM order (4711) with a Plesk license (4800) on top, plus directories
    /// and catalog entries for both VM families and both panel families.
    pub fn seeded() -> Self {
        let backend = Self::default();
        {
            let mut s = backend.state();
            s.next_order_id = 5000;
            s.next_vxlan = 1400;

            s.operating_systems = serde_json::from_value(json!([
                {"id": "os-24", "idtag": "ubuntu-24.04", "name": "Ubuntu 24.04", "platform": "linux"},
                {"id": "os-12", "idtag": "debian-12", "name": "Debian 12", "platform": "linux"}
            ]))
            .unwrap();
            s.locations = serde_json::from_value(json!([
                {"id": "loc-1", "name": "Amsterdam", "extcode": "AMS1", "provisionable": 1},
                {"id": "loc-9", "name": "Frankfurt", "extcode": "FRA9", "provisionable": 0}
            ]))
            .unwrap();
            s.vxlans = serde_json::from_value(json!([
                {"id": "vx-1", "vxlan": 1201, "label": "backend", "ownerid": 55, "removablebycustomer": 1},
                {"id": "vx-2", "vxlan": 1301, "label": "frontend", "ownerid": 55, "removablebycustomer": 0}
            ]))
            .unwrap();
            s.members = serde_json::from_value(json!([
                {"id": "m-1", "vxlan": 1201, "macaddress": "52:54:00:00:00:01", "orderid": 4711},
                {"id": "m-2", "vxlan": 1301, "macaddress": "52:54:00:00:00:02", "orderid": 4712}
            ]))
            .unwrap();

            s.orders.insert(
                4711,
                order(json!({
                    "id": 4711,
                    "product_id": "VM-A",
                    "billed_until": BILLED_UNTIL,
                    "options": [
                        {"option_id": "vm_type", "item_count": 1, "type": "enum"},
                        {"option_id": "vm_mem", "item_count": 2048, "type": "quantity"},
                        {"option_id": "vm_core", "item_count": 2, "type": "quantity"},
                        {"option_id": "vm_diskspace", "item_count": 40, "type": "quantity"},
                        {"option_id": "vm_backup", "item_count": 1, "type": "flag"}
                    ],
                    "prov_options": {"provisioning": {
                        "hostname": "web-1",
                        "os": "os-24",
                        "vm_locations": "loc-1",
                        "sshkey": "ssh-ed25519 AAAA",
                        "useDhcp": true
                    }},
                    "prov_data": {"vm_uuid": "uuid-4711"}
                })),
            );
            s.vm_status.insert("uuid-4711".into(), "RUNNING".into());

            s.orders.insert(
                4800,
                order(json!({
                    "id": 4800,
                    "parentid": 4711,
                    "product_id": "CP_PLESK",
                    "billed_until": BILLED_UNTIL,
                    "options": [
                        {"option_id": "plesk_12_license", "item_count": 1, "type": "enum"},
                        {"option_id": "plesk_extension_dnssec", "item_count": 1, "type": "flag",
                         "description": "DNSSEC support"},
                        {"option_id": "plesk_extension_powerpack", "item_count": 0, "type": "flag"}
                    ]
                })),
            );

            for product in [
                vm_product("VM-A", 1.0),
                vm_product("VM-B", 2.0),
                panel_product("CP_PLESK", "Plesk", "plesk_12_license", true),
                panel_product("CP_DIRECTADMIN", "DirectAdmin", "da_license", false),
            ] {
                s.products.insert(product.id.clone(), product);
            }
        }
        backend
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Queue a change request carrying `payload` and flag the order as changed.
    pub fn with_pending_change(self, order_id: i64, payload: &str) -> Self {
        {
            let mut s = self.state();
            if let Some(order) = s.orders.get_mut(&order_id) {
                order.needs_change = 1;
            }
            s.change_requests.entry(order_id).or_default().insert(
                0,
                ChangeRequest {
                    id: 900 + order_id,
                    order_id,
                    new_options: payload.to_string(),
                    ..Default::default()
                },
            );
        }
        self
    }

    pub fn add_member(&self, id: &str, number: i64, mac: &str, order_id: i64) {
        self.state().members.push(VxlanMember {
            id: id.into(),
            number,
            mac_address: mac.into(),
            order_id,
        });
    }

    pub fn fail_directory(&self) {
        self.state().fail_directory = true;
    }

    /// Let `n` more order reads succeed, then fail every one after.
    pub fn fail_order_reads_after(&self, n: usize) {
        let mut s = self.state();
        s.fail_order_reads_after = Some(s.order_reads + n);
    }

    /// Apply change requests to the order immediately instead of queueing them.
    pub fn apply_changes_immediately(&self) {
        self.state().apply_changes = true;
    }

    pub fn list_fetches(&self) -> usize {
        self.state().list_fetches
    }

    pub fn product_fetches(&self) -> usize {
        self.state().product_fetches
    }
}

pub(crate) fn order(value: serde_json::Value) -> Order {
    serde_json::from_value(value).unwrap()
}

fn vm_product(code: &str, base_price: f64) -> CatalogProduct {
    serde_json::from_value(json!({
        "id": code,
        "description": format!("Virtual machine {code}"),
        "base_price": base_price,
        "pricing": [
            {"id": "vm_type", "type": "enum", "enum_options": [
                {"enum_index": 0, "name": format!("{code}1"), "price": 5.0},
                {"enum_index": 1, "name": format!("{code}2"), "price": 10.0}
            ]},
            {"id": "vm_backup", "type": "flag", "description": "Backups", "default_price": 3.0}
        ],
        "properties": [
            {"id": "p-mem", "key": "memory", "label": "Memory", "unit": "MB"},
            {"id": "p-cpu", "key": "cpu", "label": "Cores"},
            {"id": "p-disk", "key": "diskspace", "label": "Disk", "unit": "GB"},
            {"id": "p-net", "key": "traffic", "label": "Traffic"}
        ],
        "product_option_properties": [
            {"optionindex": 0, "property_id": "p-mem", "product_option_id": "vm_type", "value": "1024"},
            {"optionindex": 0, "property_id": "p-cpu", "product_option_id": "vm_type", "value": "1"},
            {"optionindex": 0, "property_id": "p-disk", "product_option_id": "vm_type", "value": "20"},
            {"optionindex": 0, "property_id": "p-net", "product_option_id": "vm_type", "value": "unlimited"},
            {"optionindex": 1, "property_id": "p-mem", "product_option_id": "vm_type", "value": "2048"},
            {"optionindex": 1, "property_id": "p-cpu", "product_option_id": "vm_type", "value": "2"},
            {"optionindex": 1, "property_id": "p-disk", "product_option_id": "vm_type", "value": "40"}
        ]
    }))
    .unwrap()
}

fn panel_product(code: &str, description: &str, license: &str, extensions: bool) -> CatalogProduct {
    let mut pricing = vec![json!({"id": license, "type": "enum", "enum_options": [
        {"enum_index": 0, "name": "web_admin", "description": "Web Admin", "price": 10.0},
        {"enum_index": 1, "name": "web_pro", "description": "Web Pro", "price": 15.0}
    ]})];
    if extensions {
        pricing.push(json!({"id": "plesk_extension_dnssec", "type": "flag",
                            "description": "DNSSEC", "default_price": 1.5}));
        pricing.push(json!({"id": "plesk_extension_powerpack", "type": "flag",
                            "description": "Power Pack", "default_price": 6.0}));
    }
    serde_json::from_value(json!({
        "id": code,
        "description": description,
        "base_price": 0.5,
        "pricing": pricing
    }))
    .unwrap()
}

#[async_trait]
impl Catalog for FakeBackend {
    async fn product(&self, code: &str) -> Result<CatalogProduct> {
        let mut s = self.state();
        s.product_fetches += 1;
        if s.undecodable_products.iter().any(|p| p == code) {
            return Err(Error::Transport(newvm_api::Error::Decode {
                endpoint: "product",
                source: serde_json::from_str::<CatalogProduct>("[]").unwrap_err(),
            }));
        }
        s.products.get(code).cloned().ok_or_else(|| Error::NotFound {
            kind: "product",
            id: code.to_string(),
        })
    }
}

#[async_trait]
impl Orders for FakeBackend {
    async fn order(&self, order_id: OrderId) -> Result<Order> {
        let mut s = self.state();
        s.order_reads += 1;
        if s.fail_order_reads_after.is_some_and(|limit| s.order_reads > limit) {
            return Err(unavailable());
        }
        s.orders.get(&order_id.0).cloned().ok_or_else(|| Error::NotFound {
            kind: "order",
            id: order_id.to_string(),
        })
    }

    async fn change_requests(&self, order_id: OrderId) -> Result<Vec<ChangeRequest>> {
        Ok(self
            .state()
            .change_requests
            .get(&order_id.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn place_order(&self, product_code: &str, req: &PlaceOrderRequest) -> Result<OrderId> {
        let mut s = self.state();
        s.next_order_id += 1;
        let id = s.next_order_id;

        let options = req
            .amount
            .iter()
            .map(|(option_id, count)| OrderOption {
                option_id: option_id.clone(),
                item_count: *count,
                kind: if is_known_flag(option_id) { "flag" } else { "quantity" }.into(),
                ..Default::default()
            })
            .collect();

        let mut placed = Order {
            id,
            parent_id: req
                .parent_id
                .as_deref()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            product_id: product_code.to_string(),
            options,
            billed_until: Some(BILLED_UNTIL.into()),
            ..Default::default()
        };
        if let Some(provisioning) = &req.provisioning {
            placed.provisioning_options.provisioning = provisioning.clone();
        }

        s.orders.insert(id, placed);
        s.placed.push((product_code.to_string(), req.clone()));
        Ok(OrderId(id))
    }

    async fn change_order(&self, order_id: OrderId, req: &ChangeOrderRequest) -> Result<()> {
        let mut guard = self.state();
        let s = &mut *guard;
        let apply = s.apply_changes;
        let Some(existing) = s.orders.get_mut(&order_id.0) else {
            return Err(Error::NotFound {
                kind: "order",
                id: order_id.to_string(),
            });
        };

        if apply {
            for option in &mut existing.options {
                if let Some(count) = req.options.get(&option.option_id) {
                    option.item_count = *count;
                } else if option.is_flag() {
                    option.item_count = 0;
                }
            }
            for (option_id, count) in &req.options {
                if !existing.options.iter().any(|o| &o.option_id == option_id) {
                    existing.options.push(OrderOption {
                        option_id: option_id.clone(),
                        item_count: *count,
                        kind: if is_known_flag(option_id) { "flag" } else { "quantity" }.into(),
                        ..Default::default()
                    });
                }
            }
        } else {
            existing.needs_change = 1;
            let payload = serde_json::to_string(&req.options).unwrap();
            s.change_requests.entry(order_id.0).or_default().insert(
                0,
                ChangeRequest {
                    id: 700 + order_id.0,
                    order_id: order_id.0,
                    new_options: payload,
                    ..Default::default()
                },
            );
        }

        s.changes.push((order_id, req.clone()));
        Ok(())
    }

    async fn set_end_date(&self, order_id: OrderId, req: &EndDateRequest) -> Result<()> {
        self.state().end_dates.push((order_id, req.clone()));
        Ok(())
    }
}

#[async_trait]
impl Directory for FakeBackend {
    async fn operating_systems(&self) -> Result<Vec<OperatingSystem>> {
        let mut s = self.state();
        s.list_fetches += 1;
        if s.fail_directory {
            return Err(unavailable());
        }
        Ok(s.operating_systems.clone())
    }

    async fn locations(&self) -> Result<Vec<Location>> {
        let mut s = self.state();
        s.list_fetches += 1;
        if s.fail_directory {
            return Err(unavailable());
        }
        Ok(s.locations.iter().filter(|l| l.is_provisionable()).cloned().collect())
    }

    async fn vxlans(&self) -> Result<Vec<Vxlan>> {
        let mut s = self.state();
        s.list_fetches += 1;
        if s.fail_directory {
            return Err(unavailable());
        }
        Ok(s.vxlans.clone())
    }

    async fn vxlan_members(&self) -> Result<Vec<VxlanMember>> {
        let mut s = self.state();
        s.list_fetches += 1;
        if s.fail_directory {
            return Err(unavailable());
        }
        Ok(s.members.clone())
    }
}

#[async_trait]
impl Network for FakeBackend {
    async fn vxlan(&self, id: &str) -> Result<Vxlan> {
        self.state()
            .vxlans
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "vpc",
                id: id.to_string(),
            })
    }

    async fn create_vxlan(&self, label: &str) -> Result<String> {
        let mut s = self.state();
        s.next_vxlan += 1;
        let id = format!("vx-{}", s.next_vxlan);
        let vxlan = Vxlan {
            id: id.clone(),
            number: s.next_vxlan,
            label: label.to_string(),
            owner_id: 55,
            removable: 1,
        };
        s.vxlans.push(vxlan);
        Ok(id)
    }

    async fn rename_vxlan(&self, id: &str, label: &str) -> Result<()> {
        let mut s = self.state();
        let vxlan = s
            .vxlans
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| Error::NotFound {
                kind: "vpc",
                id: id.to_string(),
            })?;
        vxlan.label = label.to_string();
        Ok(())
    }

    async fn delete_vxlan(&self, id: &str) -> Result<()> {
        let mut s = self.state();
        s.vxlans.retain(|v| v.id != id);
        s.deleted_vxlans.push(id.to_string());
        Ok(())
    }

    async fn vm_state(&self, vm_uuid: &str) -> Result<VmState> {
        let s = self.state();
        let status = s.vm_status.get(vm_uuid).cloned().ok_or_else(|| Error::NotFound {
            kind: "vm",
            id: vm_uuid.to_string(),
        })?;
        Ok(VmState { status })
    }

    async fn power_off_vm(&self, vm_uuid: &str) -> Result<()> {
        let mut s = self.state();
        s.vm_status.insert(vm_uuid.to_string(), "STOPPED".into());
        s.powered_off.push(vm_uuid.to_string());
        Ok(())
    }
}
