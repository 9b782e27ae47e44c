//! Orderable products and the provisioning directories.

use newvm_api::CatalogProduct;
use serde::Serialize;

use crate::ident::{VmSelector, encode};
use crate::options::{CONTROL_PANEL_LICENSES, FlagCatalog};
use crate::types::{Extension, Vpc};
use crate::{Backend, Error, Provisioner, Result};

/// VM families, in listing order. Only the first is required to load.
pub const VM_FAMILIES: [&str; 2] = ["VM-A", "VM-B"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmProduct {
    /// Package id such as `VM-A2`.
    pub id: String,
    pub family: String,
    pub ram_mb: i64,
    pub cores: i64,
    pub disk_gb: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlPanelProduct {
    /// Composite id such as `CP_PLESK.plesk_12_license.1`.
    pub id: String,
    pub license_type: String,
    pub description: String,
    pub price: f64,
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatingSystem {
    pub id: String,
    pub tag: String,
    pub name: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub id: String,
    pub code: String,
    pub name: String,
}

/// Load every family in `codes`. The first must load; later ones are
/// skipped with a warning when the vendor does not serve them. A family the
/// vendor serves but that does not decode is always an error.
async fn load_families<B: Backend>(backend: &B, codes: &[&str]) -> Result<Vec<CatalogProduct>> {
    let mut products = Vec::with_capacity(codes.len());
    for (i, code) in codes.iter().enumerate() {
        match backend.product(code).await {
            Ok(product) => products.push(product),
            Err(err) if i > 0 && !matches!(&err, Error::Transport(e) if e.is_decode()) => {
                tracing::warn!(product = code, error = %err, "skipping product family");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(products)
}

fn vm_packages(product: &CatalogProduct) -> Result<Vec<VmProduct>> {
    let property_id = |key: &str| {
        product
            .properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.id.as_str())
    };
    let (memory, cpu, disk) = (property_id("memory"), property_id("cpu"), property_id("diskspace"));

    let Some(vm_type) = product.pricing.iter().find(|p| p.id == "vm_type") else {
        return Ok(Vec::new());
    };

    let mut packages = Vec::with_capacity(vm_type.enum_options.len());
    for option in &vm_type.enum_options {
        let value = |property: Option<&str>| -> Result<i64> {
            let Some(property) = property else {
                return Ok(0);
            };
            match product.option_properties.iter().find(|op| {
                op.property_id == property
                    && op.pricing_id == "vm_type"
                    && op.option_index == option.index
            }) {
                Some(op) => op.value.parse().map_err(|_| Error::MalformedCatalog {
                    product: product.id.clone(),
                    property: property.to_string(),
                    value: op.value.clone(),
                }),
                None => Ok(0),
            }
        };

        packages.push(VmProduct {
            id: option.name.clone(),
            family: product.id.clone(),
            ram_mb: value(memory)?,
            cores: value(cpu)?,
            disk_gb: value(disk)?,
            price: product.base_price + option.price,
        });
    }
    Ok(packages)
}

fn license_tiers(product: &CatalogProduct) -> Vec<ControlPanelProduct> {
    let extensions = FlagCatalog::extensions(product);
    product
        .pricing
        .iter()
        .filter(|p| CONTROL_PANEL_LICENSES.iter().any(|(_, license)| *license == p.id))
        .flat_map(|pricing| {
            pricing.enum_options.iter().filter_map(|option| {
                let index = u32::try_from(option.index).ok()?;
                Some(ControlPanelProduct {
                    id: encode(&product.id, &pricing.id, index),
                    license_type: option.name.clone(),
                    description: format!("{}: {}", product.description, option.description),
                    price: product.base_price + option.price,
                    extensions: extensions.clone(),
                })
            })
        })
        .collect()
}

impl<B: Backend> Provisioner<B> {
    pub async fn vm_products(&self) -> Result<Vec<VmProduct>> {
        let mut packages = Vec::new();
        for product in load_families(&self.backend, &VM_FAMILIES).await? {
            packages.extend(vm_packages(&product)?);
        }
        Ok(packages)
    }

    pub async fn control_panel_products(&self) -> Result<Vec<ControlPanelProduct>> {
        let families: Vec<&str> = CONTROL_PANEL_LICENSES.iter().map(|(f, _)| *f).collect();
        Ok(load_families(&self.backend, &families)
            .await?
            .iter()
            .flat_map(license_tiers)
            .collect())
    }

    pub async fn operating_systems(&self) -> Result<Vec<OperatingSystem>> {
        Ok(self
            .backend
            .operating_systems()
            .await?
            .into_iter()
            .map(|os| OperatingSystem {
                id: os.id,
                tag: os.tag,
                name: os.name,
                platform: os.platform,
            })
            .collect())
    }

    /// Locations new VMs can be ordered in.
    pub async fn locations(&self) -> Result<Vec<Location>> {
        Ok(self
            .backend
            .locations()
            .await?
            .into_iter()
            .map(|loc| Location {
                id: loc.id,
                code: loc.code,
                name: loc.name,
            })
            .collect())
    }

    /// Every VPC of the account, without members.
    pub async fn vpcs(&self) -> Result<Vec<Vpc>> {
        Ok(self.backend.vxlans().await?.into_iter().map(Vpc::from).collect())
    }
}

impl VmProduct {
    pub fn selector(&self) -> Result<VmSelector> {
        self.id.parse()
    }
}
