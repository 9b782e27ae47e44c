//! Lookups between human-facing codes and vendor ids.
//!
//! Every lookup fetches the full list and takes the first exact match. A miss
//! is `Ok(None)`: these fields are optional enrichments on the domain records.

use crate::types::OrderId;
use crate::{Directory, Result};

pub struct Resolver<'a, D: ?Sized> {
    directory: &'a D,
}

impl<'a, D: Directory + ?Sized> Resolver<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    // ── Operating systems ───────────────────────────────────────────

    pub async fn operating_system_id(&self, tag: &str) -> Result<Option<String>> {
        if tag.is_empty() {
            return Ok(None);
        }
        let found = self
            .directory
            .operating_systems()
            .await?
            .into_iter()
            .find(|os| os.tag == tag)
            .map(|os| os.id);
        tracing::debug!(tag, found = ?found, "resolved operating system");
        Ok(found)
    }

    pub async fn operating_system_tag(&self, id: &str) -> Result<Option<String>> {
        if id.is_empty() {
            return Ok(None);
        }
        let found = self
            .directory
            .operating_systems()
            .await?
            .into_iter()
            .find(|os| os.id == id)
            .map(|os| os.tag);
        tracing::debug!(id, found = ?found, "resolved operating system tag");
        Ok(found)
    }

    // ── Locations ───────────────────────────────────────────────────

    pub async fn location_id(&self, code: &str) -> Result<Option<String>> {
        if code.is_empty() {
            return Ok(None);
        }
        let found = self
            .directory
            .locations()
            .await?
            .into_iter()
            .find(|loc| loc.code == code)
            .map(|loc| loc.id);
        tracing::debug!(code, found = ?found, "resolved location");
        Ok(found)
    }

    pub async fn location_code(&self, id: &str) -> Result<Option<String>> {
        if id.is_empty() {
            return Ok(None);
        }
        let found = self
            .directory
            .locations()
            .await?
            .into_iter()
            .find(|loc| loc.id == id)
            .map(|loc| loc.code);
        tracing::debug!(id, found = ?found, "resolved location code");
        Ok(found)
    }

    // ── VxLANs ──────────────────────────────────────────────────────

    pub async fn vxlan_id(&self, number: u32) -> Result<Option<String>> {
        if number == 0 {
            return Ok(None);
        }
        let found = self
            .directory
            .vxlans()
            .await?
            .into_iter()
            .find(|v| v.number == i64::from(number))
            .map(|v| v.id);
        tracing::debug!(vxlan = number, found = ?found, "resolved vxlan");
        Ok(found)
    }

    pub async fn vxlan_number(&self, id: &str) -> Result<Option<u32>> {
        if id.is_empty() {
            return Ok(None);
        }
        let found = self
            .directory
            .vxlans()
            .await?
            .into_iter()
            .find(|v| v.id == id)
            .and_then(|v| u32::try_from(v.number).ok())
            .filter(|n| *n > 0);
        tracing::debug!(id, found = ?found, "resolved vxlan number");
        Ok(found)
    }

    /// VxLAN number of the first membership record for an order.
    ///
    /// Only one membership per order is tracked; further records are ignored.
    pub async fn vxlan_membership(&self, order_id: OrderId) -> Result<Option<u32>> {
        let found = self
            .directory
            .vxlan_members()
            .await?
            .into_iter()
            .find(|m| m.order_id == order_id.0)
            .and_then(|m| u32::try_from(m.number).ok())
            .filter(|n| *n > 0);
        tracing::debug!(%order_id, found = ?found, "resolved vxlan membership");
        Ok(found)
    }
}
