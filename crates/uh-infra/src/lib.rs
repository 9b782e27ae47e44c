pub mod catalog;
pub mod config;
pub mod control_panel;
pub mod ident;
pub mod materialize;
pub mod merge;
pub mod newvm;
pub mod options;
pub mod reference;
pub mod resolve;
pub mod schedule;
pub mod types;
pub mod vm;
pub mod vpc;

#[cfg(test)]
mod testing;

use async_trait::async_trait;
use newvm_api::{
    CatalogProduct, ChangeOrderRequest, ChangeRequest, EndDateRequest, Location, OperatingSystem,
    Order, PlaceOrderRequest, VmState, Vxlan, VxlanMember,
};

use materialize::Materializer;
use reference::{RandomReference, ReferenceGenerator};
use resolve::Resolver;
use types::OrderId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed identifier {value:?}: {reason}")]
    MalformedIdentifier { value: String, reason: &'static str },

    #[error("invalid tier {tier} in identifier {value:?}: tiers are numbered from 1")]
    InvalidTier { value: String, tier: i64 },

    #[error(transparent)]
    Transport(#[from] newvm_api::Error),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("order {order_id}: skipped field {field:?} with unsupported value kind {kind}")]
    PartialData {
        order_id: OrderId,
        field: String,
        kind: &'static str,
    },

    #[error("order {order_id}: malformed {field} payload: {source}")]
    MalformedPayload {
        order_id: OrderId,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("product {product}: {property} value {value:?} is not an integer")]
    MalformedCatalog {
        product: String,
        property: String,
        value: String,
    },

    #[error("order {order_id}: {field} is not a valid timestamp: {value:?}")]
    InvalidDateFormat {
        order_id: OrderId,
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("order {order_id}: {field} value {value:?} {reason}")]
    InvalidOrderValue {
        order_id: OrderId,
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("order {order_id}: vendor record has no {field}")]
    MissingField { order_id: OrderId, field: &'static str },

    #[error("order {order_id}: disk cannot shrink from {current} GB to {requested} GB")]
    DiskShrink {
        order_id: OrderId,
        current: i64,
        requested: i64,
    },

    #[error("order {order_id}: changing {field} from {from:?} to {to:?} requires a new order")]
    RequiresReplacement {
        order_id: OrderId,
        field: &'static str,
        from: String,
        to: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Product catalog: families, enum options and flag metadata.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn product(&self, code: &str) -> Result<CatalogProduct>;
}

/// Order records, their change requests, and the order-level writes.
#[async_trait]
pub trait Orders: Send + Sync {
    /// Fails with [`Error::NotFound`] when the vendor has no such order.
    async fn order(&self, order_id: OrderId) -> Result<Order>;

    /// Pending change requests, most recent first.
    async fn change_requests(&self, order_id: OrderId) -> Result<Vec<ChangeRequest>>;

    async fn place_order(&self, product_code: &str, req: &PlaceOrderRequest) -> Result<OrderId>;

    async fn change_order(&self, order_id: OrderId, req: &ChangeOrderRequest) -> Result<()>;

    async fn set_end_date(&self, order_id: OrderId, req: &EndDateRequest) -> Result<()>;
}

/// Flat lists used to translate between human-facing codes and vendor ids.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn operating_systems(&self) -> Result<Vec<OperatingSystem>>;

    /// Provisionable locations only.
    async fn locations(&self) -> Result<Vec<Location>>;

    async fn vxlans(&self) -> Result<Vec<Vxlan>>;

    async fn vxlan_members(&self) -> Result<Vec<VxlanMember>>;
}

/// VxLAN lifecycle and VM power control.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fails with [`Error::NotFound`] when the vendor has no such VxLAN.
    async fn vxlan(&self, id: &str) -> Result<Vxlan>;

    async fn create_vxlan(&self, label: &str) -> Result<String>;

    async fn rename_vxlan(&self, id: &str, label: &str) -> Result<()>;

    async fn delete_vxlan(&self, id: &str) -> Result<()>;

    async fn vm_state(&self, vm_uuid: &str) -> Result<VmState>;

    async fn power_off_vm(&self, vm_uuid: &str) -> Result<()>;
}

/// Everything the provisioner needs from the vendor.
pub trait Backend: Catalog + Orders + Directory + Network {}

impl<T: Catalog + Orders + Directory + Network> Backend for T {}

/// Entry point for the per-entity create/read/update/delete operations.
///
/// Holds no state between calls beyond its collaborators, so independent
/// entities can be handled concurrently through one instance.
pub struct Provisioner<B> {
    backend: B,
    references: Box<dyn ReferenceGenerator>,
}

impl<B: Backend> Provisioner<B> {
    pub fn new(backend: B) -> Self {
        Self::with_references(backend, Box::new(RandomReference))
    }

    pub fn with_references(backend: B, references: Box<dyn ReferenceGenerator>) -> Self {
        Self {
            backend,
            references,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn materializer(&self) -> Materializer<'_, B> {
        Materializer::new(&self.backend)
    }

    pub(crate) fn resolver(&self) -> Resolver<'_, B> {
        Resolver::new(&self.backend)
    }

    pub(crate) fn next_reference(&self) -> String {
        self.references.next_reference()
    }
}
