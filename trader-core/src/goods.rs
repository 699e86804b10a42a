// Tradable commodities and their economic constants

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::{Result, SimError};
use crate::types::{GoodId, Price, Quantity};

/// Static description of a good, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct GoodSpec {
    pub name: String,
    pub base_price: Price,
    /// Production floor added to the noise-driven bonus
    pub base_prod_rate: f64,
    /// Scale of the noise-driven production bonus
    pub prod_rate_multiplier: f64,
    /// Exponent applied to the normalized noise field; larger makes peaks rarer
    pub prod_rate_exponent: f64,
    /// Relative chance that a farmer deals in this good
    pub popularity: f64,
    /// Per-farmer inventory capacity
    pub max_amount: Quantity,
}

impl GoodSpec {
    pub fn new(
        name: impl Into<String>,
        base_price: Price,
        base_prod_rate: f64,
        prod_rate_multiplier: f64,
        prod_rate_exponent: f64,
        popularity: f64,
        max_amount: Quantity,
    ) -> Self {
        Self {
            name: name.into(),
            base_price,
            base_prod_rate,
            prod_rate_multiplier,
            prod_rate_exponent,
            popularity,
            max_amount,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |what: &str| {
            Err(SimError::InvalidConfig(format!(
                "good {}: {}",
                self.name, what
            )))
        };
        if !(self.base_price.is_finite() && self.base_price > 0.0) {
            return invalid("base_price must be positive");
        }
        if !(self.base_prod_rate.is_finite() && self.base_prod_rate >= 0.0) {
            return invalid("base_prod_rate must be non-negative");
        }
        if !(self.prod_rate_multiplier.is_finite() && self.prod_rate_multiplier >= 0.0) {
            return invalid("prod_rate_multiplier must be non-negative");
        }
        if !(self.prod_rate_exponent.is_finite() && self.prod_rate_exponent > 0.0) {
            return invalid("prod_rate_exponent must be positive");
        }
        if !(self.popularity.is_finite() && self.popularity > 0.0) {
            return invalid("popularity must be positive");
        }
        if self.max_amount == 0 {
            return invalid("max_amount must be positive");
        }
        Ok(())
    }
}

/// The five goods of the reference world.
pub fn default_goods() -> Vec<GoodSpec> {
    vec![
        GoodSpec::new("wheat", 0.1, 0.8, 32.0, 2.0, 10.0, 100),
        GoodSpec::new("corn", 0.25, 0.8, 24.0, 2.5, 8.0, 100),
        GoodSpec::new("apples", 0.5, 0.5, 30.0, 3.5, 6.0, 80),
        GoodSpec::new("milk", 1.5, 0.6, 10.0, 4.0, 7.0, 50),
        GoodSpec::new("steak", 5.0, 0.3, 8.0, 4.0, 4.0, 40),
    ]
}

// ============================================================================
// Good - a registered commodity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Good {
    pub id: GoodId,
    pub spec: GoodSpec,
    /// Average per-farmer inventory right after world creation
    base_abundance: Option<f64>,
}

impl Good {
    pub fn new(id: GoodId, spec: GoodSpec) -> Self {
        Self {
            id,
            spec,
            base_abundance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn base_price(&self) -> Price {
        self.spec.base_price
    }

    pub fn max_amount(&self) -> Quantity {
        self.spec.max_amount
    }

    /// Scarcity reference for pricing. Zero until set.
    pub fn base_abundance(&self) -> f64 {
        self.base_abundance.unwrap_or(0.0)
    }

    pub fn has_base_abundance(&self) -> bool {
        self.base_abundance.is_some()
    }

    /// Set once; later calls are ignored and return false.
    pub fn set_base_abundance(&mut self, abundance: f64) -> bool {
        if self.base_abundance.is_some() {
            return false;
        }
        self.base_abundance = Some(abundance);
        true
    }
}

/// Register goods in order, assigning dense ids.
pub fn register_goods(specs: &[GoodSpec]) -> Result<Vec<Good>> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            spec.validate()?;
            Ok(Good::new(GoodId::new(i as u32), spec.clone()))
        })
        .collect()
}

/// Average inventory of a good per farmer.
pub fn calculate_base_abundance(good: &Good, inventories: &[Quantity]) -> Result<f64> {
    if inventories.is_empty() {
        return Err(SimError::NoFarmers {
            good: good.name().to_string(),
        });
    }
    let total: f64 = inventories.iter().map(|&q| q as f64).sum();
    Ok(total / inventories.len() as f64)
}
