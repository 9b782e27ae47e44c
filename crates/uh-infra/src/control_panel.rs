use newvm_api::{ChangeOrderRequest, PlaceOrderRequest};

use crate::merge::merge_by_key;
use crate::options::control_panel_amounts;
use crate::schedule;
use crate::types::{ControlPanel, Extension, OrderId};
use crate::{Backend, Error, Provisioner, Result};

impl<B: Backend> Provisioner<B> {
    /// Order a control-panel license on top of an existing VM.
    pub async fn create_control_panel(&self, panel: &ControlPanel) -> Result<ControlPanel> {
        let req = PlaceOrderRequest {
            amount: control_panel_amounts(&panel.product, &panel.extensions)?,
            custom_description: None,
            parent_id: Some(panel.vm_id.to_string()),
            provisioning: None,
            auto_provision: true,
            finish_order_group: true,
            promo_codes: Vec::new(),
            reference: self.next_reference(),
        };

        let order_id = self.backend.place_order(&panel.product.family, &req).await?;
        tracing::info!(
            %order_id,
            vm_id = %panel.vm_id,
            product = %panel.product,
            extensions = panel.extensions.len(),
            "control panel ordered"
        );

        self.read_control_panel(order_id, &panel.extensions).await
    }

    /// Read a control panel, keeping `known` extensions the vendor has not
    /// reported yet.
    pub async fn read_control_panel(
        &self,
        order_id: OrderId,
        known: &[Extension],
    ) -> Result<ControlPanel> {
        let mut panel = self.materializer().control_panel(order_id).await?;
        panel.extensions = merge_by_key(known.to_vec(), panel.extensions);
        Ok(panel)
    }

    /// Change the license tier or extension set.
    ///
    /// The panel stays on its control-panel family and VM; moving it needs a
    /// new order. The change has taken effect once the vendor queues it. If
    /// reading the panel back fails afterwards, the requested state is
    /// returned instead.
    pub async fn update_control_panel(
        &self,
        order_id: OrderId,
        panel: &ControlPanel,
    ) -> Result<ControlPanel> {
        let current = self.materializer().control_panel(order_id).await?;

        if current.product.family != panel.product.family {
            return Err(Error::RequiresReplacement {
                order_id,
                field: "product",
                from: current.product.to_string(),
                to: panel.product.to_string(),
            });
        }
        if current.vm_id != panel.vm_id {
            return Err(Error::RequiresReplacement {
                order_id,
                field: "vm_id",
                from: current.vm_id.to_string(),
                to: panel.vm_id.to_string(),
            });
        }

        let req = ChangeOrderRequest {
            options: control_panel_amounts(&panel.product, &panel.extensions)?,
        };
        self.backend.change_order(order_id, &req).await?;
        tracing::info!(%order_id, product = %panel.product, "control panel change requested");

        match self.read_control_panel(order_id, &panel.extensions).await {
            Ok(updated) => Ok(updated),
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "could not read control panel back, returning requested state");
                Ok(ControlPanel {
                    order_id: Some(order_id),
                    vm_id: current.vm_id,
                    product: panel.product.clone(),
                    extensions: merge_by_key(panel.extensions.clone(), Vec::new()),
                })
            }
        }
    }

    /// End the license with the current billing period.
    pub async fn delete_control_panel(&self, order_id: OrderId) -> Result<()> {
        let order = self.backend.order(order_id).await?;
        let req = schedule::end_date_request(order_id, order.billed_until.as_deref())?;
        self.backend.set_end_date(order_id, &req).await?;
        tracing::info!(%order_id, end_date = %req.end_date, "control panel scheduled for termination");
        Ok(())
    }
}
