//! Collaborator traits backed by the live NewVM API.

use async_trait::async_trait;
use newvm_api::{
    CatalogProduct, ChangeOrderRequest, ChangeRequest, EndDateRequest, Location, NewVmClient,
    OperatingSystem, Order, PlaceOrderRequest, VmState, Vxlan, VxlanMember,
};

use crate::types::OrderId;
use crate::{Catalog, Directory, Error, Network, Orders, Result};

/// Map a vendor 404 to [`Error::NotFound`]; everything else passes through.
fn not_found(kind: &'static str, id: impl ToString) -> impl FnOnce(newvm_api::Error) -> Error {
    move |err| {
        if err.is_not_found() {
            Error::NotFound {
                kind,
                id: id.to_string(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

#[async_trait]
impl Catalog for NewVmClient {
    async fn product(&self, code: &str) -> Result<CatalogProduct> {
        self.get_product(code)
            .await
            .map_err(not_found("product", code))
    }
}

#[async_trait]
impl Orders for NewVmClient {
    async fn order(&self, order_id: OrderId) -> Result<Order> {
        self.get_order(order_id.0)
            .await
            .map_err(not_found("order", order_id))
    }

    async fn change_requests(&self, order_id: OrderId) -> Result<Vec<ChangeRequest>> {
        Ok(self.list_change_requests(order_id.0).await?)
    }

    async fn place_order(&self, product_code: &str, req: &PlaceOrderRequest) -> Result<OrderId> {
        let id = NewVmClient::place_order(self, product_code, req).await?;
        Ok(OrderId(id))
    }

    async fn change_order(&self, order_id: OrderId, req: &ChangeOrderRequest) -> Result<()> {
        NewVmClient::change_order(self, order_id.0, req)
            .await
            .map_err(not_found("order", order_id))
    }

    async fn set_end_date(&self, order_id: OrderId, req: &EndDateRequest) -> Result<()> {
        NewVmClient::set_end_date(self, order_id.0, req)
            .await
            .map_err(not_found("order", order_id))
    }
}

#[async_trait]
impl Directory for NewVmClient {
    async fn operating_systems(&self) -> Result<Vec<OperatingSystem>> {
        Ok(self.list_operating_systems().await?)
    }

    async fn locations(&self) -> Result<Vec<Location>> {
        let mut locations = self.list_locations().await?;
        locations.retain(Location::is_provisionable);
        Ok(locations)
    }

    async fn vxlans(&self) -> Result<Vec<Vxlan>> {
        Ok(self.list_vxlans().await?)
    }

    async fn vxlan_members(&self) -> Result<Vec<VxlanMember>> {
        Ok(self.list_vxlan_members().await?)
    }
}

#[async_trait]
impl Network for NewVmClient {
    async fn vxlan(&self, id: &str) -> Result<Vxlan> {
        self.get_vxlan(id).await.map_err(not_found("vpc", id))
    }

    async fn create_vxlan(&self, label: &str) -> Result<String> {
        Ok(NewVmClient::create_vxlan(self, label).await?)
    }

    async fn rename_vxlan(&self, id: &str, label: &str) -> Result<()> {
        NewVmClient::rename_vxlan(self, id, label)
            .await
            .map_err(not_found("vpc", id))
    }

    async fn delete_vxlan(&self, id: &str) -> Result<()> {
        NewVmClient::delete_vxlan(self, id)
            .await
            .map_err(not_found("vpc", id))
    }

    async fn vm_state(&self, vm_uuid: &str) -> Result<VmState> {
        self.get_vm_state(vm_uuid)
            .await
            .map_err(not_found("vm", vm_uuid))
    }

    async fn power_off_vm(&self, vm_uuid: &str) -> Result<()> {
        Ok(self.power_off_vm(vm_uuid).await?)
    }
}
