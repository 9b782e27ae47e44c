//! Builds domain records from vendor orders.
//!
//! An order carries a flat list of options (id plus integer quantity). When
//! the vendor still has a change request queued against the order, the most
//! recent one is laid over the base snapshot field by field: it is the state
//! the caller asked for and will be applied eventually.

use std::collections::BTreeSet;

use newvm_api::{ChangeRequest, Order, OrderOption};
use serde_json::{Map, Value};

use crate::ident::{ProductSelector, VmSelector};
use crate::options::{self, EXTENSION_FLAGS, FlagCatalog};
use crate::resolve::Resolver;
use crate::types::{ControlPanel, NetworkMode, OrderId, StaticNetwork, Vm};
use crate::{Backend, Error, Result};

/// A known option id and how its integer value lands on the record being built.
pub struct Field<T> {
    pub key: &'static str,
    pub set: fn(&mut T, &str, i64),
}

/// Sizing options of a VM order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmSizing {
    /// Zero-based package index within the product family.
    pub vm_type: Option<i64>,
    pub ram_mb: i64,
    pub cores: i64,
    pub disk_gb: i64,
}

pub const VM_FIELDS: &[Field<VmSizing>] = &[
    Field {
        key: "vm_type",
        set: |s: &mut VmSizing, _: &str, v: i64| s.vm_type = Some(v),
    },
    Field {
        key: "vm_mem",
        set: |s: &mut VmSizing, _: &str, v: i64| s.ram_mb = v,
    },
    Field {
        key: "vm_core",
        set: |s: &mut VmSizing, _: &str, v: i64| s.cores = v,
    },
    Field {
        key: "vm_diskspace",
        set: |s: &mut VmSizing, _: &str, v: i64| s.disk_gb = v,
    },
];

/// License tier and enabled flags of a control-panel order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelSelection {
    pub license: Option<i64>,
    pub flags: BTreeSet<String>,
}

fn panel_fields(license: &'static str) -> Vec<Field<PanelSelection>> {
    let mut fields = vec![Field {
        key: license,
        set: |s: &mut PanelSelection, _: &str, v: i64| s.license = Some(v),
    }];
    fields.extend(EXTENSION_FLAGS.iter().map(|flag| Field {
        key: *flag,
        set: |s: &mut PanelSelection, key: &str, v: i64| {
            if v == 1 {
                s.flags.insert(key.to_string());
            } else {
                s.flags.remove(key);
            }
        },
    }));
    fields
}

/// Copy the values of known options onto `target`. Other options are ignored.
pub fn apply_options<T>(options: &[OrderOption], fields: &[Field<T>], target: &mut T) {
    for option in options {
        if let Some(field) = fields.iter().find(|f| f.key == option.option_id) {
            (field.set)(target, field.key, option.item_count);
        }
    }
}

/// The latest queued change request of an order, decoded.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub request_id: i64,
    pub fields: Map<String, Value>,
    pub provisioning_error: Option<String>,
    pub internal_error: bool,
}

impl PendingChange {
    pub fn parse(order_id: OrderId, request: &ChangeRequest) -> Result<Self> {
        let fields: Map<String, Value> =
            serde_json::from_str(&request.new_options).map_err(|source| {
                Error::MalformedPayload {
                    order_id,
                    field: "new_option",
                    source,
                }
            })?;

        let provisioning_error = request
            .provisioning_error
            .clone()
            .filter(|e| !e.is_empty());
        if let Some(error) = &provisioning_error {
            tracing::warn!(
                %order_id,
                change_request = request.id,
                internal = request.is_internal_error == 1,
                error = %error,
                "pending change reports a provisioning error"
            );
        }

        Ok(Self {
            request_id: request.id,
            fields,
            provisioning_error,
            internal_error: request.is_internal_error == 1,
        })
    }

    /// Overwrite `target` with every payload value that has a field in
    /// `fields`, in the order `fields` declares them.
    ///
    /// Values that are not integers are logged and skipped, as are keys with
    /// no field.
    pub fn overlay<T>(&self, order_id: OrderId, fields: &[Field<T>], target: &mut T) {
        for field in fields {
            let Some(value) = self.fields.get(field.key) else {
                continue;
            };
            match value.as_i64() {
                Some(v) => (field.set)(target, field.key, v),
                None => {
                    let skipped = Error::PartialData {
                        order_id,
                        field: field.key.to_string(),
                        kind: value_kind(value),
                    };
                    tracing::warn!(change_request = self.request_id, "{skipped}");
                }
            }
        }

        for key in self.fields.keys() {
            if !fields.iter().any(|f| f.key == key.as_str()) {
                tracing::debug!(%order_id, field = %key, "ignoring unrecognised change request field");
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "non-integer number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

pub struct Materializer<'a, B: ?Sized> {
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> Materializer<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    async fn pending_change(&self, order_id: OrderId, order: &Order) -> Result<Option<PendingChange>> {
        if !order.has_pending_change() {
            return Ok(None);
        }
        let requests = self.backend.change_requests(order_id).await?;
        let Some(latest) = requests.first() else {
            tracing::warn!(%order_id, "order is flagged as changing but has no change request");
            return Ok(None);
        };
        PendingChange::parse(order_id, latest).map(Some)
    }

    pub async fn vm(&self, order_id: OrderId) -> Result<Vm> {
        let order = self.backend.order(order_id).await?;

        let mut sizing = VmSizing::default();
        apply_options(&order.options, VM_FIELDS, &mut sizing);
        if let Some(change) = self.pending_change(order_id, &order).await? {
            change.overlay(order_id, VM_FIELDS, &mut sizing);
        }

        let index = sizing.vm_type.ok_or(Error::MissingField {
            order_id,
            field: "vm_type",
        })?;
        let product = VmSelector::from_index(order.product_id.clone(), index).map_err(|_| {
            Error::InvalidOrderValue {
                order_id,
                field: "vm_type",
                value: index.to_string(),
                reason: "is not a package index",
            }
        })?;

        let provisioning = &order.provisioning_options.provisioning;
        let resolver = Resolver::new(self.backend);
        let os = match non_empty(provisioning.os.as_deref()) {
            Some(id) => resolver.operating_system_tag(&id).await?,
            None => None,
        };
        let location = match non_empty(provisioning.location.as_deref()) {
            Some(id) => resolver.location_code(&id).await?,
            None => None,
        };
        let vpcs = resolver.vxlan_membership(order_id).await?.into_iter().collect();

        let network = if provisioning.use_dhcp {
            NetworkMode::Dhcp
        } else {
            NetworkMode::Static(StaticNetwork {
                ip_address: non_empty(provisioning.ip_address.as_deref()),
                subnet_mask: non_empty(provisioning.subnet_mask.as_deref()),
                gateway: non_empty(provisioning.gateway.as_deref()),
                dns_server: non_empty(provisioning.dns_server.as_deref()),
            })
        };

        Ok(Vm {
            order_id: Some(order_id),
            instance_id: non_empty(order.provisioning_data.vm_uuid.as_deref()),
            product,
            os,
            hostname: provisioning.hostname.clone().unwrap_or_default(),
            location,
            ram_mb: sizing.ram_mb,
            cores: sizing.cores,
            disk_gb: sizing.disk_gb,
            network,
            vpc_only: provisioning.vpc_only,
            vpcs,
            ssh_key: non_empty(provisioning.ssh_key.as_deref()),
        })
    }

    pub async fn control_panel(&self, order_id: OrderId) -> Result<ControlPanel> {
        let order = self.backend.order(order_id).await?;
        let family = order.product_id.as_str();
        let license = options::license_option(family).ok_or_else(|| Error::InvalidOrderValue {
            order_id,
            field: "product_id",
            value: family.to_string(),
            reason: "is not a control panel family",
        })?;
        let fields = panel_fields(license);

        let mut selection = PanelSelection {
            license: None,
            flags: options::enabled_flags(&order.options),
        };
        apply_options(&order.options, &fields[..1], &mut selection);

        if let Some(change) = self.pending_change(order_id, &order).await? {
            // The payload is the complete option set: flags it leaves out are off.
            selection.flags.clear();
            change.overlay(order_id, &fields, &mut selection);
        }

        let index = selection.license.ok_or(Error::MissingField {
            order_id,
            field: license,
        })?;
        let index = u32::try_from(index).map_err(|_| Error::InvalidOrderValue {
            order_id,
            field: license,
            value: index.to_string(),
            reason: "is not a license index",
        })?;

        let catalog = if selection.flags.is_empty() {
            FlagCatalog::default()
        } else {
            FlagCatalog::from_product(&self.backend.product(family).await?)
        };

        Ok(ControlPanel {
            order_id: Some(order_id),
            vm_id: OrderId(order.parent_id),
            product: ProductSelector::new(family, license, index),
            extensions: options::decode_extensions(&selection.flags, &catalog, &order.options),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, order};
    use crate::types::{Extension, Planned};
    use serde_json::json;

    #[tokio::test]
    async fn materializes_a_vm_from_its_order() {
        let backend = FakeBackend::seeded();
        let vm = Materializer::new(&backend).vm(OrderId(4711)).await.unwrap();

        assert_eq!(vm.product.to_string(), "VM-A2");
        assert_eq!(vm.instance_id.as_deref(), Some("uuid-4711"));
        assert_eq!((vm.ram_mb, vm.cores, vm.disk_gb), (2048, 2, 40));
        assert_eq!(vm.os.as_deref(), Some("ubuntu-24.04"));
        assert_eq!(vm.location.as_deref(), Some("AMS1"));
        assert_eq!(vm.hostname, "web-1");
        assert_eq!(vm.network, NetworkMode::Dhcp);
        assert_eq!(vm.vpcs, vec![1201]);
        assert_eq!(vm.ssh_key.as_deref(), Some("ssh-ed25519 AAAA"));
    }

    #[tokio::test]
    async fn pending_change_overrides_base_snapshot() {
        let backend = FakeBackend::seeded().with_pending_change(4711, r#"{"vm_core":4}"#);
        let vm = Materializer::new(&backend).vm(OrderId(4711)).await.unwrap();

        assert_eq!(vm.cores, 4);
        assert_eq!(vm.ram_mb, 2048);
    }

    #[tokio::test]
    async fn pending_change_can_switch_package() {
        let backend = FakeBackend::seeded()
            .with_pending_change(4711, r#"{"vm_type":0,"vm_mem":1024,"vm_diskspace":60}"#);
        let vm = Materializer::new(&backend).vm(OrderId(4711)).await.unwrap();

        assert_eq!(vm.product.to_string(), "VM-A1");
        assert_eq!((vm.ram_mb, vm.disk_gb), (1024, 60));
    }

    #[tokio::test]
    async fn unsupported_values_and_unknown_keys_are_skipped() {
        let backend = FakeBackend::seeded().with_pending_change(
            4711,
            r#"{"vm_core":"eight","vm_mem":4096.5,"vm_diskspace":80,"vm_gpu":1}"#,
        );
        let vm = Materializer::new(&backend).vm(OrderId(4711)).await.unwrap();

        assert_eq!(vm.cores, 2);
        assert_eq!(vm.ram_mb, 2048);
        assert_eq!(vm.disk_gb, 80);
    }

    #[tokio::test]
    async fn malformed_change_payload_is_fatal() {
        let backend = FakeBackend::seeded().with_pending_change(4711, "vm_core=4");
        let err = Materializer::new(&backend).vm(OrderId(4711)).await.unwrap_err();

        assert!(matches!(
            err,
            Error::MalformedPayload { order_id: OrderId(4711), field: "new_option", .. }
        ));

        let backend = FakeBackend::seeded().with_pending_change(4711, "[4]");
        assert!(Materializer::new(&backend).vm(OrderId(4711)).await.is_err());
    }

    #[tokio::test]
    async fn flagged_order_without_change_request_reads_base() {
        let backend = FakeBackend::seeded();
        backend.state().orders.get_mut(&4711).unwrap().needs_change = 1;

        let vm = Materializer::new(&backend).vm(OrderId(4711)).await.unwrap();
        assert_eq!(vm.cores, 2);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let backend = FakeBackend::seeded();
        let err = Materializer::new(&backend).vm(OrderId(1)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "order", .. }));
    }

    #[tokio::test]
    async fn static_network_is_read_when_dhcp_is_off() {
        let backend = FakeBackend::seeded();
        backend.state().orders.insert(
            4720,
            order(json!({
                "id": 4720,
                "product_id": "VM-B",
                "options": [{"option_id": "vm_type", "item_count": 0}],
                "prov_options": {"provisioning": {
                    "hostname": "db-1",
                    "os": "os-unknown",
                    "ipaddress": "10.0.0.5",
                    "subnetmask": "255.255.255.0",
                    "gateway": "",
                    "isVpcOnly": true
                }}
            })),
        );

        let vm = Materializer::new(&backend).vm(OrderId(4720)).await.unwrap();
        assert_eq!(vm.product.to_string(), "VM-B1");
        assert_eq!(vm.os, None);
        assert_eq!(vm.location, None);
        assert!(vm.vpc_only);
        assert!(vm.vpcs.is_empty());
        assert_eq!(
            vm.network,
            NetworkMode::Static(StaticNetwork {
                ip_address: Some("10.0.0.5".into()),
                subnet_mask: Some("255.255.255.0".into()),
                gateway: None,
                dns_server: None,
            })
        );
    }

    #[tokio::test]
    async fn vm_order_without_package_is_incomplete() {
        let backend = FakeBackend::seeded();
        backend
            .state()
            .orders
            .insert(4721, order(json!({"id": 4721, "product_id": "VM-A"})));

        let err = Materializer::new(&backend).vm(OrderId(4721)).await.unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "vm_type", .. }));
    }

    #[tokio::test]
    async fn vendor_values_that_cannot_be_decoded_name_the_order() {
        let backend = FakeBackend::seeded();
        {
            let mut state = backend.state();
            state.orders.insert(
                4802,
                order(json!({"id": 4802, "parentid": 4711, "product_id": "CP_CPANEL"})),
            );
            state.orders.insert(
                4803,
                order(json!({
                    "id": 4803,
                    "parentid": 4711,
                    "product_id": "CP_PLESK",
                    "options": [{"option_id": "plesk_12_license", "item_count": -1, "type": "enum"}]
                })),
            );
            state.orders.insert(
                4804,
                order(json!({
                    "id": 4804,
                    "product_id": "VM-A",
                    "options": [{"option_id": "vm_type", "item_count": -1}]
                })),
            );
        }
        let m = Materializer::new(&backend);

        let err = m.control_panel(OrderId(4802)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOrderValue { field: "product_id", .. }));
        assert_eq!(
            err.to_string(),
            r#"order 4802: product_id value "CP_CPANEL" is not a control panel family"#
        );

        let err = m.control_panel(OrderId(4803)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"order 4803: plesk_12_license value "-1" is not a license index"#
        );

        let err = m.vm(OrderId(4804)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"order 4804: vm_type value "-1" is not a package index"#
        );
    }

    #[tokio::test]
    async fn materializes_a_control_panel_with_catalog_descriptions() {
        let backend = FakeBackend::seeded();
        let cp = Materializer::new(&backend)
            .control_panel(OrderId(4800))
            .await
            .unwrap();

        assert_eq!(cp.vm_id, OrderId(4711));
        assert_eq!(cp.product.to_string(), "CP_PLESK.plesk_12_license.1");
        assert_eq!(
            cp.extensions,
            vec![Extension {
                id: "plesk_extension_dnssec".into(),
                description: Planned::Known("DNSSEC".into()),
                price: Planned::Known(1.5),
            }]
        );
    }

    #[tokio::test]
    async fn control_panel_change_replaces_license_and_flags() {
        let backend = FakeBackend::seeded().with_pending_change(
            4800,
            r#"{"plesk_12_license":0,"plesk_extension_powerpack":1}"#,
        );
        let cp = Materializer::new(&backend)
            .control_panel(OrderId(4800))
            .await
            .unwrap();

        assert_eq!(cp.product.index, 0);
        let ids: Vec<_> = cp.extensions.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["plesk_extension_powerpack"]);
    }

    #[tokio::test]
    async fn control_panel_without_flags_skips_the_catalog() {
        let backend = FakeBackend::seeded();
        backend.state().orders.insert(
            4801,
            order(json!({
                "id": 4801,
                "parentid": 4711,
                "product_id": "CP_DIRECTADMIN",
                "options": [{"option_id": "da_license", "item_count": 0, "type": "enum"}]
            })),
        );

        let cp = Materializer::new(&backend)
            .control_panel(OrderId(4801))
            .await
            .unwrap();
        assert_eq!(cp.product.to_string(), "CP_DIRECTADMIN.da_license.0");
        assert!(cp.extensions.is_empty());
        assert_eq!(backend.product_fetches(), 0);
    }

    #[test]
    fn overlay_follows_declared_field_order() {
        let change = PendingChange {
            request_id: 1,
            fields: serde_json::from_str(r#"{"vm_diskspace":100,"vm_type":3}"#).unwrap(),
            provisioning_error: None,
            internal_error: false,
        };
        let mut sizing = VmSizing::default();
        change.overlay(OrderId(1), VM_FIELDS, &mut sizing);

        assert_eq!(
            sizing,
            VmSizing {
                vm_type: Some(3),
                disk_gb: 100,
                ..Default::default()
            }
        );
    }
}
