use newvm_api::{ChangeOrderRequest, OptionAmounts, PlaceOrderRequest, Provisioning};

use crate::schedule;
use crate::types::{NetworkMode, OrderId, Vm};
use crate::{Backend, Error, Provisioner, Result};

fn sizing_amounts(vm: &Vm, include_zero: bool) -> OptionAmounts {
    let mut amounts = OptionAmounts::new();
    amounts.insert("vm_type".into(), i64::from(vm.product.index));
    for (key, value) in [
        ("vm_mem", vm.ram_mb),
        ("vm_core", vm.cores),
        ("vm_diskspace", vm.disk_gb),
    ] {
        if include_zero || value != 0 {
            amounts.insert(key.into(), value);
        }
    }
    amounts
}

impl<B: Backend> Provisioner<B> {
    /// Order a VM and return it as the vendor reports it afterwards.
    pub async fn create_vm(&self, vm: &Vm) -> Result<Vm> {
        let resolver = self.resolver();

        let os = match vm.os.as_deref() {
            Some(tag) => {
                let id = resolver.operating_system_id(tag).await?;
                if id.is_none() {
                    tracing::warn!(os = tag, "unknown operating system, ordering without one");
                }
                id
            }
            None => None,
        };
        let location = match vm.location.as_deref() {
            Some(code) => {
                let id = resolver.location_id(code).await?;
                if id.is_none() {
                    tracing::warn!(location = code, "unknown or closed location, ordering without one");
                }
                id
            }
            None => None,
        };
        if vm.vpcs.len() > 1 {
            tracing::warn!(vpcs = ?&vm.vpcs[1..], "only one vpc can be attached on order, ignoring the rest");
        }
        let vxlan_id = match vm.vpcs.first() {
            Some(number) => resolver.vxlan_id(*number).await?,
            None => None,
        };

        let mut provisioning = Provisioning {
            hostname: Some(vm.hostname.clone()).filter(|h| !h.is_empty()),
            ssh_key: vm.ssh_key.clone().filter(|k| !k.is_empty()),
            vxlan_id,
            os,
            location,
            vpc_only: vm.vpc_only,
            use_dhcp: matches!(vm.network, NetworkMode::Dhcp),
            ..Default::default()
        };
        if let NetworkMode::Static(net) = &vm.network {
            provisioning.ip_address = net.ip_address.clone();
            provisioning.subnet_mask = net.subnet_mask.clone();
            provisioning.gateway = net.gateway.clone();
            provisioning.dns_server = net.dns_server.clone();
        }

        let req = PlaceOrderRequest {
            amount: sizing_amounts(vm, false),
            custom_description: None,
            parent_id: None,
            provisioning: Some(provisioning),
            auto_provision: true,
            finish_order_group: true,
            promo_codes: Vec::new(),
            reference: self.next_reference(),
        };

        let order_id = self.backend.place_order(&vm.product.family, &req).await?;
        tracing::info!(
            %order_id,
            product = %vm.product,
            hostname = %vm.hostname,
            reference = %req.reference,
            "vm ordered"
        );

        self.read_vm(order_id).await
    }

    pub async fn read_vm(&self, order_id: OrderId) -> Result<Vm> {
        self.materializer().vm(order_id).await
    }

    /// Resize a VM in place.
    ///
    /// Only the package and sizing can change. Moving to another product
    /// family or operating system needs a new order, and disks never shrink.
    pub async fn update_vm(&self, order_id: OrderId, vm: &Vm) -> Result<Vm> {
        let current = self.read_vm(order_id).await?;

        if current.product.family != vm.product.family {
            return Err(Error::RequiresReplacement {
                order_id,
                field: "product",
                from: current.product.to_string(),
                to: vm.product.to_string(),
            });
        }
        if vm.os.is_some() && current.os != vm.os {
            return Err(Error::RequiresReplacement {
                order_id,
                field: "os",
                from: current.os.unwrap_or_default(),
                to: vm.os.clone().unwrap_or_default(),
            });
        }
        if vm.disk_gb < current.disk_gb {
            return Err(Error::DiskShrink {
                order_id,
                current: current.disk_gb,
                requested: vm.disk_gb,
            });
        }

        let req = ChangeOrderRequest {
            options: sizing_amounts(vm, true),
        };
        self.backend.change_order(order_id, &req).await?;
        tracing::info!(%order_id, product = %vm.product, "vm change requested");

        self.read_vm(order_id).await
    }

    /// Power the VM off, then end its order with the current billing period.
    pub async fn delete_vm(&self, order_id: OrderId) -> Result<()> {
        let order = self.backend.order(order_id).await?;

        if let Some(uuid) = order
            .provisioning_data
            .vm_uuid
            .as_deref()
            .filter(|u| !u.is_empty())
        {
            let state = self.backend.vm_state(uuid).await?;
            if state.is_stopped() {
                tracing::debug!(%order_id, vm_uuid = uuid, "vm already stopped");
            } else {
                self.backend.power_off_vm(uuid).await?;
                tracing::info!(%order_id, vm_uuid = uuid, status = %state.status, "vm powered off");
            }
        }

        let req = schedule::end_date_request(order_id, order.billed_until.as_deref())?;
        self.backend.set_end_date(order_id, &req).await?;
        tracing::info!(%order_id, end_date = %req.end_date, "vm scheduled for termination");
        Ok(())
    }
}
