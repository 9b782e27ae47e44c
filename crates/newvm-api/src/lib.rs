//! Typed Rust client for the NewVM REST API.
//!
//! Covers the subset needed to provision VMs, control-panel licenses and
//! VPCs: identity (login, token check, logout), orders and change requests,
//! the product catalog, provisioning directories (OS, locations) and VxLANs.

mod types;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use types::*;

pub const DEFAULT_HOST: &str = "https://api.newvm.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const NETWORK: &str = "/backend/com.newvm.network/v1";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("newvm api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("newvm api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("newvm api {endpoint} returned an undecodable body: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("newvm api {endpoint} did not acknowledge: {body}")]
    Unexpected { endpoint: &'static str, body: String },

    #[error("username and password are required to log in")]
    MissingCredentials,
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }

    /// The vendor answered, but with a body that does not match its schema.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the NewVM REST API.
#[derive(Clone)]
pub struct NewVmClient {
    host: String,
    token: String,
    http: reqwest::Client,
}

impl NewVmClient {
    /// Client with no token. Only the public catalog endpoints will answer.
    pub fn anonymous(host: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            host: host.into(),
            token: String::new(),
            http: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Log in, then verify the token, which also refreshes the account's roles.
    pub async fn login(
        host: impl Into<String>,
        timeout: Duration,
        credentials: &Credentials,
    ) -> Result<Self> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(Error::MissingCredentials);
        }

        let mut client = Self::anonymous(host, timeout)?;
        let resp = client
            .http
            .post(client.url("/identity/v1"))
            .json(credentials)
            .send()
            .await?;
        let token: TokenResponse = Self::decode(resp, "login").await?;
        client.token = token.token;

        let resp = client.request(reqwest::Method::GET, "/account/v1/token").send().await?;
        Self::check(resp, "verify token").await?;

        Ok(client)
    }

    pub async fn logout(&self) -> Result<()> {
        let resp = self.request(reqwest::Method::DELETE, "/identity/v1").send().await?;
        Self::acknowledged(resp, "logout").await
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response, endpoint: &'static str) -> Result<T> {
        let body = Self::check(resp, endpoint).await?.text().await?;
        serde_json::from_str(&body).map_err(|source| Error::Decode { endpoint, source })
    }

    /// Several endpoints answer `{"success": true}` instead of a resource.
    async fn acknowledged(resp: reqwest::Response, endpoint: &'static str) -> Result<()> {
        let body = Self::check(resp, endpoint).await?.text().await?;
        match serde_json::from_str::<SuccessResponse>(&body) {
            Ok(ack) if ack.success => Ok(()),
            _ => Err(Error::Unexpected { endpoint, body }),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, endpoint: &'static str) -> Result<T> {
        let resp = self.request(reqwest::Method::GET, path).send().await?;
        Self::decode(resp, endpoint).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        Ok(self.request(method, path).json(body).send().await?)
    }

    // ── Orders ──────────────────────────────────────────────────────

    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        let envelope: OrderEnvelope = self
            .get(&format!("/account/v1/order/{order_id}"), "get order")
            .await?;
        Ok(envelope.order)
    }

    /// Pending change requests for an order, most recent first.
    pub async fn list_change_requests(&self, order_id: i64) -> Result<Vec<ChangeRequest>> {
        let list: ChangeRequestList = self
            .get(
                &format!("/account/v1/order/changerequest?orderId={order_id}"),
                "list change requests",
            )
            .await?;
        Ok(list.result)
    }

    /// Place an order for a product family and return the new order id.
    pub async fn place_order(&self, product_code: &str, req: &PlaceOrderRequest) -> Result<i64> {
        let resp = self
            .send_json(
                reqwest::Method::POST,
                &format!("/account/v1/customer/self/order/{product_code}"),
                req,
            )
            .await?;
        let placed: PlacedOrder = Self::decode(resp, "place order").await?;
        Ok(placed.order_id)
    }

    /// Queue a change request against an order.
    pub async fn change_order(&self, order_id: i64, req: &ChangeOrderRequest) -> Result<()> {
        let resp = self
            .send_json(reqwest::Method::PUT, &format!("/account/v1/order/{order_id}"), req)
            .await?;
        Self::check(resp, "change order").await?;
        Ok(())
    }

    /// Schedule termination of an order (and optionally its sub-orders).
    pub async fn set_end_date(&self, order_id: i64, req: &EndDateRequest) -> Result<()> {
        let resp = self
            .send_json(
                reqwest::Method::PUT,
                &format!("/account/v1/order/{order_id}/enddate"),
                req,
            )
            .await?;
        Self::acknowledged(resp, "set end date").await
    }

    // ── Catalog ─────────────────────────────────────────────────────

    pub async fn get_product(&self, product_code: &str) -> Result<CatalogProduct> {
        self.get(&format!("/account/v1/product/{product_code}"), "get product")
            .await
    }

    // ── Directories ─────────────────────────────────────────────────

    pub async fn list_operating_systems(&self) -> Result<Vec<OperatingSystem>> {
        let list: OperatingSystemList = self
            .get("/account/v1/provisioning/os", "list operating systems")
            .await?;
        Ok(list.result)
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        let list: LocationList = self
            .get(&format!("{NETWORK}/location"), "list locations")
            .await?;
        Ok(list.locations)
    }

    // ── VxLANs ──────────────────────────────────────────────────────

    pub async fn list_vxlans(&self) -> Result<Vec<Vxlan>> {
        let list: VxlanList = self.get(&format!("{NETWORK}/vxlan"), "list vxlans").await?;
        Ok(list.vxlan)
    }

    pub async fn list_vxlan_members(&self) -> Result<Vec<VxlanMember>> {
        let list: VxlanMemberList = self
            .get(&format!("{NETWORK}/vxlan/member"), "list vxlan members")
            .await?;
        Ok(list.members)
    }

    pub async fn get_vxlan(&self, id: &str) -> Result<Vxlan> {
        let envelope: VxlanEnvelope = self
            .get(&format!("{NETWORK}/vxlan/{id}"), "get vxlan")
            .await?;
        Ok(envelope.vxlan)
    }

    /// Create a VxLAN and return its id. The VxLAN number is assigned by the vendor.
    pub async fn create_vxlan(&self, label: &str) -> Result<String> {
        let resp = self
            .send_json(reqwest::Method::POST, &format!("{NETWORK}/vxlan"), &VxlanLabel { label })
            .await?;
        let created: CreatedVxlan = Self::decode(resp, "create vxlan").await?;
        Ok(created.id)
    }

    pub async fn rename_vxlan(&self, id: &str, label: &str) -> Result<()> {
        let resp = self
            .send_json(
                reqwest::Method::PUT,
                &format!("{NETWORK}/vxlan/{id}"),
                &VxlanLabel { label },
            )
            .await?;
        Self::acknowledged(resp, "rename vxlan").await
    }

    pub async fn delete_vxlan(&self, id: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("{NETWORK}/vxlan/{id}"))
            .send()
            .await?;
        Self::acknowledged(resp, "delete vxlan").await
    }

    // ── VM power ────────────────────────────────────────────────────

    pub async fn get_vm_state(&self, vm_uuid: &str) -> Result<VmState> {
        let envelope: VmStateEnvelope = self
            .get(&format!("{NETWORK}/vm/{vm_uuid}"), "get vm state")
            .await?;
        Ok(envelope.vm)
    }

    pub async fn power_off_vm(&self, vm_uuid: &str) -> Result<()> {
        let resp = self
            .request(
                reqwest::Method::PATCH,
                &format!("{NETWORK}/vm2/{vm_uuid}/changeState/off"),
            )
            .send()
            .await?;
        Self::check(resp, "power off vm").await?;
        Ok(())
    }
}
