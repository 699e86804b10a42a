use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::{Position, Price, Quantity};

// ============================================================================
// Snapshots - plain data handed to the front end and to tests
// ============================================================================
//
// Per-good vectors are indexed by good id.

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct WorldSnapshot {
    /// Day of the year last simulated, `None` before the first tick
    pub day: Option<u32>,
    pub days_elapsed: u64,
    pub goods: Vec<GoodSnapshot>,
    pub locations: Vec<LocationSnapshot>,
    pub farmers: Vec<FarmerSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct GoodSnapshot {
    pub id: u32,
    pub name: String,
    pub base_price: Price,
    pub max_amount: Quantity,
    pub base_abundance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct LocationSnapshot {
    pub id: u64,
    pub name: String,
    pub position: Position,
    pub prices: Vec<Price>,
    pub supply_scores: Vec<f64>,
    pub farmers: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct FarmerSnapshot {
    pub id: u64,
    pub name: String,
    pub location: u64,
    pub inventory: Vec<Quantity>,
    pub money: f64,
    pub dpv: f64,
    pub buy_prices: Vec<Price>,
    pub sell_prices: Vec<Price>,
}
