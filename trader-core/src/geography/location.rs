// Location type: a market town hosting farmers

use slotmap::{SecondaryMap, SlotMap};

use crate::agents::Farmer;
use crate::error::Result;
use crate::goods::Good;
use crate::math::{round_cents, round_cents_within};
use crate::noise::NoiseGenerator;
use crate::types::{FarmerId, GoodId, LocationId, PerGood, Position, Price};

/// Price band around a good's base price
pub const MIN_PRICE_RATIO: f64 = 0.25;
pub const MAX_PRICE_RATIO: f64 = 4.0;
/// Supply floor in the scarcity ratio
const MIN_SUPPLY: f64 = 0.1;

/// A place the player can travel to and trade with its farmers
#[derive(Debug, Clone)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub position: Position,
    pub farmer_ids: Vec<FarmerId>,
    distances: SecondaryMap<LocationId, f64>,
    supply_scores: PerGood<f64>,
    prices: PerGood<Price>,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>, position: Position, n_goods: usize) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            farmer_ids: Vec::new(),
            distances: SecondaryMap::new(),
            supply_scores: PerGood::filled(n_goods, 0.0),
            prices: PerGood::filled(n_goods, 0.0),
        }
    }

    pub fn with_farmers(mut self, farmer_ids: Vec<FarmerId>) -> Self {
        self.farmer_ids = farmer_ids;
        self
    }

    // === Distances ===

    pub fn set_distances(&mut self, distances: SecondaryMap<LocationId, f64>) {
        self.distances = distances;
    }

    pub fn distance_to(&self, other: LocationId) -> Option<f64> {
        self.distances.get(other).copied()
    }

    pub fn distances(&self) -> &SecondaryMap<LocationId, f64> {
        &self.distances
    }

    /// Cost of travelling to `other`, rounded to cents.
    pub fn travel_cost(&self, other: LocationId, multiplier: f64) -> Option<Price> {
        self.distance_to(other)
            .map(|d| round_cents(multiplier * d * d))
    }

    // === Market state ===

    pub fn prices(&self) -> &PerGood<Price> {
        &self.prices
    }

    pub fn price(&self, good: GoodId) -> Option<Price> {
        self.prices.get(good).copied()
    }

    pub fn supply_scores(&self) -> &PerGood<f64> {
        &self.supply_scores
    }

    pub fn supply_score(&self, good: GoodId) -> Option<f64> {
        self.supply_scores.get(good).copied()
    }

    /// Today's production rate of a good here.
    pub fn prod_rate(&self, good: &Good, day: u32, noise: &NoiseGenerator) -> Result<f64> {
        let intensity = noise.sample_good_prod(good.id, day, self.position)?;
        Ok(good.spec.base_prod_rate + intensity * good.spec.prod_rate_multiplier)
    }

    /// Recompute supply scores and prices from every farmer's inventory.
    ///
    /// Farmers elsewhere count with weight exp(-d^2), so nearby stock
    /// dominates local scarcity.
    pub fn update(
        &mut self,
        day: u32,
        farmers: &SlotMap<FarmerId, Farmer>,
        goods: &[Good],
        supply_sensitivity: f64,
    ) {
        for good in goods {
            let samples = farmers.values().filter_map(|farmer| {
                let d = self.distance_to(farmer.location)?;
                Some((d, farmer.inventory(good.id) as f64))
            });
            let supply = weighted_supply(samples);
            let price = price_for(good, supply, supply_sensitivity);

            if let Some(score) = self.supply_scores.get_mut(good.id) {
                *score = supply;
            }
            if let Some(slot) = self.prices.get_mut(good.id) {
                *slot = price;
            }

            #[cfg(feature = "instrument")]
            {
                use crate::types::KeyToU64;
                tracing::info!(
                    target: "location_day",
                    day = day,
                    location_id = self.id.to_u64(),
                    good_id = good.id.0,
                    supply_score = supply,
                    price = price,
                );
            }
        }
        #[cfg(not(feature = "instrument"))]
        let _ = day;
    }
}

/// Distance-weighted mean of `(distance, amount)` pairs with weights
/// exp(-d^2). Returns 0 with no samples.
pub fn weighted_supply(samples: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let mut total_weight = 0.0;
    let mut weighted = 0.0;
    for (distance, amount) in samples {
        let w = (-distance * distance).exp();
        total_weight += w;
        weighted += w * amount;
    }
    if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    }
}

/// Price of a good given local supply: scarcer than the world baseline
/// costs more, within [0.25, 4] times the base price.
pub fn price_for(good: &Good, supply_score: f64, supply_sensitivity: f64) -> Price {
    let base = good.base_price();
    let ratio = (good.base_abundance() / supply_score.max(MIN_SUPPLY)).powf(supply_sensitivity);
    let ratio = if ratio.is_nan() {
        1.0
    } else {
        ratio.clamp(MIN_PRICE_RATIO, MAX_PRICE_RATIO)
    };
    round_cents_within(
        base * ratio,
        MIN_PRICE_RATIO * base,
        MAX_PRICE_RATIO * base,
    )
}
