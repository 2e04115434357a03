use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::schemas::TiffinOptions;

/// A selection that doesn't resolve against the vendor's current catalog.
/// Saved orders can go stale when the creator switches vendors, so these
/// surface as explicit errors instead of pricing to a wrong total.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("unknown base option '{0}'")]
    UnknownBaseOption(String),
    #[error("unknown portion size '{0}'")]
    UnknownPortion(String),
    #[error("add-on '{0}' is no longer offered by this vendor")]
    StaleAddOn(String),
}

/// What a member picked, before pricing. Mirrors the stored Order minus the
/// derived fields.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub base_option_id: String,
    pub portion_id: String,
    #[serde(default)]
    pub selected_add_on_ids: Vec<String>,
    #[serde(default)]
    pub special_instructions: String,
}

impl TiffinOptions {
    /// Pre-fill for a member who hasn't ordered yet: the options flagged as
    /// default, falling back to the first catalog entry.
    pub fn default_selection(&self) -> Option<Selection> {
        let base = self
            .base_options
            .iter()
            .find(|b| b.is_default)
            .or_else(|| self.base_options.first())?;
        let portion = self
            .portion_sizes
            .iter()
            .find(|p| p.is_default)
            .or_else(|| self.portion_sizes.first())?;
        Some(Selection {
            base_option_id: base.id.clone(),
            portion_id: portion.id.clone(),
            selected_add_on_ids: Vec::new(),
            special_instructions: String::new(),
        })
    }
}

/// Price of one member's meal in whole currency units:
/// base price scaled by the portion multiplier, plus the selected add-ons,
/// rounded half-up. Add-on ids are treated as a set; repeats count once.
pub fn order_price(options: &TiffinOptions, selection: &Selection) -> Result<u32, PricingError> {
    let base = options
        .base_options
        .iter()
        .find(|b| b.id == selection.base_option_id)
        .ok_or_else(|| PricingError::UnknownBaseOption(selection.base_option_id.clone()))?;
    let portion = options
        .portion_sizes
        .iter()
        .find(|p| p.id == selection.portion_id)
        .ok_or_else(|| PricingError::UnknownPortion(selection.portion_id.clone()))?;

    let mut seen = HashSet::new();
    let mut add_on_total = 0u32;
    for id in &selection.selected_add_on_ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let add_on = options
            .add_ons
            .iter()
            .find(|a| &a.id == id)
            .ok_or_else(|| PricingError::StaleAddOn(id.clone()))?;
        add_on_total += add_on.price;
    }

    Ok((base.base_price as f64 * portion.multiplier + add_on_total as f64).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::sample_vendors;
    use crate::schemas::{AddOn, BaseOption, InstructionPolicy, PortionSize};

    fn catalog() -> TiffinOptions {
        TiffinOptions {
            base_options: vec![
                BaseOption {
                    id: "veg".into(),
                    name: "Vegetarian".into(),
                    base_price: 80,
                    description: String::new(),
                    is_default: true,
                },
                BaseOption {
                    id: "non-veg".into(),
                    name: "Non-Vegetarian".into(),
                    base_price: 150,
                    description: String::new(),
                    is_default: false,
                },
            ],
            portion_sizes: vec![
                PortionSize {
                    id: "half".into(),
                    name: "Half Portion".into(),
                    multiplier: 0.6,
                    description: String::new(),
                    is_default: false,
                },
                PortionSize {
                    id: "full".into(),
                    name: "Full Portion".into(),
                    multiplier: 1.0,
                    description: String::new(),
                    is_default: true,
                },
            ],
            add_ons: vec![
                AddOn {
                    id: "salad".into(),
                    name: "Extra Salad".into(),
                    price: 20,
                    description: String::new(),
                },
                AddOn {
                    id: "dessert".into(),
                    name: "Dessert".into(),
                    price: 30,
                    description: String::new(),
                },
            ],
            special_instructions: InstructionPolicy::default(),
        }
    }

    fn select(base: &str, portion: &str, add_ons: &[&str]) -> Selection {
        Selection {
            base_option_id: base.into(),
            portion_id: portion.into(),
            selected_add_on_ids: add_ons.iter().map(|s| s.to_string()).collect(),
            special_instructions: String::new(),
        }
    }

    #[test]
    fn base_times_multiplier_plus_add_ons() {
        // 80 * 0.6 + 20 + 30 = 98
        let price = order_price(&catalog(), &select("veg", "half", &["salad", "dessert"])).unwrap();
        assert_eq!(price, 98);
    }

    #[test]
    fn no_add_ons_is_just_the_scaled_base() {
        let price = order_price(&catalog(), &select("non-veg", "full", &[])).unwrap();
        assert_eq!(price, 150);
        let price = order_price(&catalog(), &select("veg", "half", &[])).unwrap();
        assert_eq!(price, 48);
    }

    #[test]
    fn fractional_totals_round_half_up() {
        let mut options = catalog();
        options.portion_sizes[0].multiplier = 0.65625; // 80 * 0.65625 = 52.5
        let price = order_price(&options, &select("veg", "half", &[])).unwrap();
        assert_eq!(price, 53);
    }

    #[test]
    fn repeated_add_on_ids_count_once() {
        let price = order_price(&catalog(), &select("veg", "full", &["salad", "salad"])).unwrap();
        assert_eq!(price, 100);
    }

    #[test]
    fn pricing_is_idempotent() {
        let selection = select("veg", "half", &["dessert"]);
        let options = catalog();
        assert_eq!(
            order_price(&options, &selection),
            order_price(&options, &selection)
        );
    }

    #[test]
    fn unknown_base_option_is_an_error() {
        assert_eq!(
            order_price(&catalog(), &select("vegan", "full", &[])),
            Err(PricingError::UnknownBaseOption("vegan".into()))
        );
    }

    #[test]
    fn unknown_portion_is_an_error() {
        assert_eq!(
            order_price(&catalog(), &select("veg", "quarter", &[])),
            Err(PricingError::UnknownPortion("quarter".into()))
        );
    }

    #[test]
    fn add_on_dropped_from_catalog_is_a_stale_selection() {
        assert_eq!(
            order_price(&catalog(), &select("veg", "full", &["papad"])),
            Err(PricingError::StaleAddOn("papad".into()))
        );
    }

    #[test]
    fn default_selection_prefers_flagged_options() {
        let selection = catalog().default_selection().unwrap();
        assert_eq!(selection.base_option_id, "veg");
        assert_eq!(selection.portion_id, "full");
        assert!(selection.selected_add_on_ids.is_empty());
    }

    #[test]
    fn default_selection_falls_back_to_first_entry() {
        let mut options = catalog();
        for base in &mut options.base_options {
            base.is_default = false;
        }
        for portion in &mut options.portion_sizes {
            portion.is_default = false;
        }
        let selection = options.default_selection().unwrap();
        assert_eq!(selection.base_option_id, "veg");
        assert_eq!(selection.portion_id, "half");
    }

    #[test]
    fn default_selection_requires_a_nonempty_catalog() {
        let mut options = catalog();
        options.base_options.clear();
        assert!(options.default_selection().is_none());
    }

    #[test]
    fn sample_catalog_prices_as_listed() {
        // Half-portion chicken biryani with raita: 150 * 0.5 + 30.
        let vendors = sample_vendors();
        let biryani = vendors
            .iter()
            .find(|v| v.id == "dum-biryani-house")
            .unwrap();
        let price = order_price(
            &biryani.tiffin_options,
            &select("non-veg", "half", &["raita"]),
        )
        .unwrap();
        assert_eq!(price, 105);
    }
}
