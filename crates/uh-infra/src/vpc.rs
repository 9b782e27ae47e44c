use newvm_api::Vxlan;

use crate::merge::merge_by_key;
use crate::types::{OrderId, Vpc, VpcMember};
use crate::{Backend, Provisioner, Result};

/// A VPC as listed, without members.
impl From<Vxlan> for Vpc {
    fn from(vxlan: Vxlan) -> Self {
        Self {
            id: Some(vxlan.id),
            name: vxlan.label,
            number: u32::try_from(vxlan.number).ok().filter(|n| *n > 0),
            owner_id: Some(vxlan.owner_id).filter(|o| *o != 0),
            removable: vxlan.removable == 1,
            members: Vec::new(),
        }
    }
}

impl<B: Backend> Provisioner<B> {
    /// Create a VPC. The vendor assigns its VxLAN number.
    pub async fn create_vpc(&self, vpc: &Vpc) -> Result<Vpc> {
        let id = self.backend.create_vxlan(&vpc.name).await?;
        tracing::info!(vpc = %id, name = %vpc.name, "vpc created");
        self.read_vpc(&id, &vpc.members).await
    }

    /// Read a VPC with its members, keeping `known` members the vendor has
    /// not reported yet.
    pub async fn read_vpc(&self, id: &str, known: &[VpcMember]) -> Result<Vpc> {
        let vxlan = self.backend.vxlan(id).await?;

        let observed = self
            .backend
            .vxlan_members()
            .await?
            .into_iter()
            .filter(|m| m.number == vxlan.number)
            .map(|m| VpcMember {
                order_id: OrderId(m.order_id),
                mac_address: m.mac_address,
            })
            .collect();

        Ok(Vpc {
            members: merge_by_key(known.to_vec(), observed),
            ..Vpc::from(vxlan)
        })
    }

    pub async fn update_vpc(&self, id: &str, vpc: &Vpc) -> Result<Vpc> {
        self.backend.rename_vxlan(id, &vpc.name).await?;
        tracing::info!(vpc = id, name = %vpc.name, "vpc renamed");
        self.read_vpc(id, &vpc.members).await
    }

    /// VPCs are not billed orders, so they are removed outright.
    pub async fn delete_vpc(&self, id: &str) -> Result<()> {
        self.backend.delete_vxlan(id).await?;
        tracing::info!(vpc = id, "vpc deleted");
        Ok(())
    }
}
