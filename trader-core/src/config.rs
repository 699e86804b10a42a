//! World configuration.
//!
//! Every parameter group deserializes from JSON with per-field defaults, so a
//! config file only needs to name what it changes. `Default` reproduces the
//! reference world.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::{Result, SimError};
use crate::goods::{GoodSpec, default_goods};

/// Upper bound on fractal octaves per production field. Every octave adds
/// one Perlin evaluation per grid cell.
pub const MAX_DETAIL_LAYERS: u32 = 6;

/// Production noise parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct ProdParams {
    /// Grid cells along each spatial axis
    pub spatial_res: usize,
    /// Gradient lattice periods along each spatial axis
    pub spatial_octaves: usize,
    /// Grid cells along the time axis
    pub temporal_res: usize,
    /// Gradient lattice periods along the time axis
    pub temporal_octaves: usize,
    /// Fractal octaves; each doubles the frequency of the one before
    pub detail_layers: u32,
    /// Amplitude ratio between successive layers
    pub persistence: f64,
}

impl Default for ProdParams {
    fn default() -> Self {
        Self {
            spatial_res: 128,
            spatial_octaves: 4,
            temporal_res: 64,
            temporal_octaves: 2,
            detail_layers: 1,
            persistence: 0.5,
        }
    }
}

/// Location placement and pricing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct LocationParams {
    pub n_locations: usize,
    /// Gaussian clusters in the placement density
    pub n_clusters: usize,
    pub amp_min: f64,
    pub amp_max: f64,
    pub std_min: f64,
    pub std_max: f64,
    /// Exponent on the abundance ratio in the price formula
    pub supply_sensitivity: f64,
    /// Success probability of the geometric farmer count per location
    pub farmer_count_p: f64,
    /// Cap on farmers per location
    pub max_farmers: u32,
    /// Scale of the squared-distance travel cost between locations
    pub travel_cost_multiplier: f64,
}

impl Default for LocationParams {
    fn default() -> Self {
        Self {
            n_locations: 20,
            n_clusters: 5,
            amp_min: 0.025,
            amp_max: 0.075,
            std_min: 0.08,
            std_max: 0.25,
            supply_sensitivity: 1.0,
            farmer_count_p: 0.33,
            max_farmers: 4,
            travel_cost_multiplier: 2.0,
        }
    }
}

/// Farmer generation and money dynamics parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct FarmerParams {
    /// Expected number of goods a farmer deals in
    pub mean_n_goods: f64,
    /// Minimum number of goods a farmer deals in
    pub min_n_goods: usize,
    /// Margin between location price and buy/sell quotes
    pub spread: f64,
    pub lower_money_multiplier: f64,
    pub upper_money_multiplier: f64,
    pub money_growth_factor: f64,
    pub p_money_growth: f64,
    pub money_decay_factor: f64,
    pub p_money_decay: f64,
}

impl Default for FarmerParams {
    fn default() -> Self {
        Self {
            mean_n_goods: 2.0,
            min_n_goods: 1,
            spread: 0.1,
            lower_money_multiplier: 10.0,
            upper_money_multiplier: 30.0,
            money_growth_factor: 1.5,
            p_money_growth: 0.36,
            money_decay_factor: 0.9,
            p_money_decay: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    pub year_length: u32,
    pub goods: Vec<GoodSpec>,
    pub prod: ProdParams,
    pub locations: LocationParams,
    pub farmers: FarmerParams,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 134,
            year_length: 100,
            goods: default_goods(),
            prod: ProdParams::default(),
            locations: LocationParams::default(),
            farmers: FarmerParams::default(),
        }
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(SimError::InvalidConfig(msg.into()))
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject parameter combinations that cannot build a world.
    pub fn validate(&self) -> Result<()> {
        if self.year_length == 0 {
            return invalid("year_length must be positive");
        }
        if self.goods.is_empty() {
            return invalid("at least one good is required");
        }
        for good in &self.goods {
            good.validate()?;
        }

        let prod = &self.prod;
        if prod.spatial_res == 0 || prod.temporal_res == 0 {
            return invalid("noise resolutions must be positive");
        }
        if prod.spatial_octaves == 0 || prod.temporal_octaves == 0 {
            return invalid("noise lattice periods must be positive");
        }
        if prod.detail_layers == 0 || prod.detail_layers > MAX_DETAIL_LAYERS {
            return invalid(format!(
                "detail_layers must be between 1 and {MAX_DETAIL_LAYERS}"
            ));
        }
        if !(prod.persistence.is_finite() && prod.persistence > 0.0) {
            return invalid("persistence must be positive");
        }

        let loc = &self.locations;
        if loc.n_locations == 0 {
            return invalid("n_locations must be positive");
        }
        if loc.n_clusters == 0 {
            return invalid("n_clusters must be positive");
        }
        if !(loc.amp_min > 0.0 && loc.amp_min <= loc.amp_max && loc.amp_max.is_finite()) {
            return invalid("cluster amplitudes need 0 < amp_min <= amp_max");
        }
        if !(loc.std_min > 0.0 && loc.std_min <= loc.std_max && loc.std_max.is_finite()) {
            return invalid("cluster widths need 0 < std_min <= std_max");
        }
        if !loc.supply_sensitivity.is_finite() {
            return invalid("supply_sensitivity must be finite");
        }
        if !(loc.farmer_count_p > 0.0 && loc.farmer_count_p <= 1.0) {
            return invalid("farmer_count_p must be in (0, 1]");
        }
        if loc.max_farmers == 0 {
            return invalid("max_farmers must be positive");
        }
        if !(loc.travel_cost_multiplier.is_finite() && loc.travel_cost_multiplier >= 0.0) {
            return invalid("travel_cost_multiplier must be non-negative");
        }

        let farm = &self.farmers;
        if !(farm.mean_n_goods.is_finite() && farm.mean_n_goods > 0.0) {
            return invalid("mean_n_goods must be positive");
        }
        if farm.min_n_goods > self.goods.len() {
            return invalid(format!(
                "min_n_goods {} exceeds the {} configured goods",
                farm.min_n_goods,
                self.goods.len()
            ));
        }
        if !(0.0..1.0).contains(&farm.spread) {
            return invalid("spread must be in [0, 1)");
        }
        if !(farm.lower_money_multiplier > 0.0
            && farm.lower_money_multiplier <= farm.upper_money_multiplier
            && farm.upper_money_multiplier.is_finite())
        {
            return invalid("money multipliers need 0 < lower <= upper");
        }
        if !(farm.money_growth_factor.is_finite() && farm.money_growth_factor > 0.0) {
            return invalid("money_growth_factor must be positive");
        }
        if !(farm.money_decay_factor.is_finite() && farm.money_decay_factor > 0.0) {
            return invalid("money_decay_factor must be positive");
        }
        if !is_probability(farm.p_money_growth) || !is_probability(farm.p_money_decay) {
            return invalid("money growth/decay probabilities must be in [0, 1]");
        }
        Ok(())
    }
}
