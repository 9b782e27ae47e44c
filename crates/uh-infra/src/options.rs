//! Translation between typed extension sets and the vendor's sparse
//! "option id → quantity" lists.
//!
//! A flag option is enabled when its quantity is exactly 1. A quantity of 0
//! and a missing option mean the same thing.

use std::collections::{BTreeSet, HashMap};

use newvm_api::{CatalogProduct, OptionAmounts, OrderOption};

use crate::ident::ProductSelector;
use crate::types::{Extension, Planned};
use crate::{Error, Result};

/// Extension flags this crate knows how to order, in declaration order.
pub const EXTENSION_FLAGS: [&str; 4] = [
    "plesk_extension_dnssec",
    "plesk_extension_hosting_pack",
    "plesk_extension_powerpack",
    "plesk_extension_language_pack",
];

/// Control-panel product families and the enum option that selects their license tier.
pub const CONTROL_PANEL_LICENSES: [(&str, &str); 2] = [
    ("CP_DIRECTADMIN", "da_license"),
    ("CP_PLESK", "plesk_12_license"),
];

pub fn is_known_flag(id: &str) -> bool {
    EXTENSION_FLAGS.contains(&id)
}

pub fn license_option(family: &str) -> Option<&'static str> {
    CONTROL_PANEL_LICENSES
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, option)| *option)
}

/// Flag ids enabled by a list of order options.
pub fn enabled_flags(options: &[OrderOption]) -> BTreeSet<String> {
    options
        .iter()
        .filter(|o| o.is_flag() && o.item_count == 1 && is_known_flag(&o.option_id))
        .map(|o| o.option_id.clone())
        .collect()
}

/// Emit `flag → 1` for each known flag in the extension set. Disabled flags are omitted.
pub fn encode_extensions(extensions: &[Extension], amounts: &mut OptionAmounts) {
    for ext in extensions {
        if is_known_flag(&ext.id) {
            amounts.insert(ext.id.clone(), 1);
        } else {
            tracing::warn!(extension = %ext.id, "ignoring unknown control panel extension");
        }
    }
}

/// Option set for ordering or changing a control panel: the license tier
/// plus one entry per enabled extension.
pub fn control_panel_amounts(
    product: &ProductSelector,
    extensions: &[Extension],
) -> Result<OptionAmounts> {
    let license = license_option(&product.family).ok_or_else(|| Error::MalformedIdentifier {
        value: product.to_string(),
        reason: "unknown control panel family",
    })?;
    if product.tier != license {
        return Err(Error::MalformedIdentifier {
            value: product.to_string(),
            reason: "license tier does not belong to the product family",
        });
    }

    let mut amounts = OptionAmounts::new();
    amounts.insert(license.to_string(), i64::from(product.index));
    encode_extensions(extensions, &mut amounts);
    Ok(amounts)
}

/// Descriptions and prices of the flag options a product offers.
#[derive(Debug, Clone, Default)]
pub struct FlagCatalog {
    flags: HashMap<String, (String, f64)>,
}

impl FlagCatalog {
    pub fn from_product(product: &CatalogProduct) -> Self {
        let flags = product
            .pricing
            .iter()
            .filter(|p| p.is_flag())
            .map(|p| (p.id.clone(), (p.description.clone(), p.default_price)))
            .collect();
        Self { flags }
    }

    /// Every flag of the product, in catalog order.
    pub fn extensions(product: &CatalogProduct) -> Vec<Extension> {
        product
            .pricing
            .iter()
            .filter(|p| p.is_flag())
            .map(|p| Extension {
                id: p.id.clone(),
                description: Planned::Known(p.description.clone()),
                price: Planned::Known(p.default_price),
            })
            .collect()
    }

    /// Observed extension for an enabled flag. Flags missing from the catalog
    /// keep the order's own description and carry no price.
    pub fn describe(&self, id: &str, fallback_description: Option<&str>) -> Extension {
        match self.flags.get(id) {
            Some((description, price)) => Extension {
                id: id.to_string(),
                description: Planned::Known(description.clone()),
                price: Planned::Known(*price),
            },
            None => Extension {
                id: id.to_string(),
                description: fallback_description
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .into(),
                price: Planned::Absent,
            },
        }
    }
}

/// Observed extensions for a set of enabled flags.
pub fn decode_extensions(
    flags: &BTreeSet<String>,
    catalog: &FlagCatalog,
    options: &[OrderOption],
) -> Vec<Extension> {
    flags
        .iter()
        .map(|id| {
            let fallback = options
                .iter()
                .find(|o| o.option_id == *id)
                .map(|o| o.description.as_str());
            catalog.describe(id, fallback)
        })
        .collect()
}
