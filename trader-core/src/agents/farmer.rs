// Farmer agent: produces, stockpiles and quotes goods at one location

use crate::config::FarmerParams;
use crate::error::{Result, SimError, TradeError};
use crate::geography::Location;
use crate::goods::Good;
use crate::math::round_cents;
use crate::noise::{NoiseGenerator, sample_good_delta};
use crate::rng::SimRng;
use crate::types::{FarmerId, GoodId, LocationId, PerGood, Price, Quantity, Side};

/// Floor on the production propensity of a selected good
pub const MIN_FARMER_PROD_PROBABILITY: f64 = 0.15;
/// Days simulated before a farmer becomes visible
pub const WARMUP_DAYS: u32 = 10;
/// Redraws of the good selection before giving up
pub const MAX_SELECTION_ATTEMPTS: usize = 1000;
/// Money floor, as a fraction of DPV, restored on a growth roll
const MONEY_FLOOR_FRACTION: f64 = 0.25;

/// Read-only world state a farmer needs for its daily update.
#[derive(Clone, Copy)]
pub struct FarmerContext<'a> {
    pub goods: &'a [Good],
    pub noise: &'a NoiseGenerator,
    pub params: &'a FarmerParams,
}

#[derive(Debug, Clone)]
pub struct Farmer {
    pub id: FarmerId,
    pub name: String,
    pub location: LocationId,
    propensity: PerGood<f64>,
    inventory: PerGood<Quantity>,
    money: f64,
    /// Daily production value, fixed at creation
    dpv: f64,
    buy_quotes: PerGood<Price>,
    sell_quotes: PerGood<Price>,
}

impl Farmer {
    /// Draw a new farmer at `location`: propensities, a warm-up of
    /// `WARMUP_DAYS` production days, then starting money.
    pub fn new(
        id: FarmerId,
        name: impl Into<String>,
        location: &Location,
        rng: &mut SimRng,
        ctx: FarmerContext<'_>,
    ) -> Result<Self> {
        let name = name.into();
        let propensity = draw_propensity(rng, ctx.goods, ctx.params)?;
        let dpv = daily_production_value(&propensity, ctx.goods);
        if !(dpv > 0.0) {
            return Err(SimError::NonPositiveDpv { name, dpv });
        }

        let n_goods = ctx.goods.len();
        let mut farmer = Self {
            id,
            name,
            location: location.id,
            propensity,
            inventory: PerGood::filled(n_goods, 0),
            money: 0.0,
            dpv,
            buy_quotes: PerGood::filled(n_goods, 0.0),
            sell_quotes: PerGood::filled(n_goods, 0.0),
        };
        for day in 0..WARMUP_DAYS {
            farmer.update_inventory(day, location, rng, ctx)?;
        }
        farmer.money = rng.uniform_range(
            ctx.params.lower_money_multiplier,
            ctx.params.upper_money_multiplier,
        ) * dpv;
        Ok(farmer)
    }

    /// Farmer with fixed propensities and money, no warm-up.
    pub fn with_propensity(
        id: FarmerId,
        name: impl Into<String>,
        location: LocationId,
        propensity: PerGood<f64>,
        goods: &[Good],
        money: f64,
    ) -> Result<Self> {
        let name = name.into();
        if propensity.len() != goods.len() {
            return Err(SimError::InvalidConfig(format!(
                "farmer {} has {} propensities for {} goods",
                name,
                propensity.len(),
                goods.len()
            )));
        }
        let dpv = daily_production_value(&propensity, goods);
        if !(dpv > 0.0) {
            return Err(SimError::NonPositiveDpv { name, dpv });
        }
        Ok(Self {
            id,
            name,
            location,
            propensity,
            inventory: PerGood::filled(goods.len(), 0),
            money: money.max(0.0),
            dpv,
            buy_quotes: PerGood::filled(goods.len(), 0.0),
            sell_quotes: PerGood::filled(goods.len(), 0.0),
        })
    }

    // === Accessors ===

    pub fn inventory(&self, good: GoodId) -> Quantity {
        self.inventory.get(good).copied().unwrap_or(0)
    }

    pub fn inventories(&self) -> &PerGood<Quantity> {
        &self.inventory
    }

    pub fn propensity(&self, good: GoodId) -> f64 {
        self.propensity.get(good).copied().unwrap_or(0.0)
    }

    pub fn propensities(&self) -> &PerGood<f64> {
        &self.propensity
    }

    pub fn money(&self) -> f64 {
        self.money
    }

    pub fn dpv(&self) -> f64 {
        self.dpv
    }

    /// Price a counterparty pays to buy from this farmer
    pub fn buy_price(&self, good: GoodId) -> Option<Price> {
        self.buy_quotes.get(good).copied()
    }

    /// Price this farmer pays a counterparty selling to it
    pub fn sell_price(&self, good: GoodId) -> Option<Price> {
        self.sell_quotes.get(good).copied()
    }

    pub fn buy_quotes(&self) -> &PerGood<Price> {
        &self.buy_quotes
    }

    pub fn sell_quotes(&self) -> &PerGood<Price> {
        &self.sell_quotes
    }

    /// Goods currently in stock, in id order
    pub fn stocked_goods(&self) -> Vec<GoodId> {
        self.inventory
            .iter()
            .filter(|(_, qty)| **qty > 0)
            .map(|(good, _)| good)
            .collect()
    }

    // === Daily update ===

    /// One production day: inventory for every good, then money.
    pub fn update(
        &mut self,
        day: u32,
        location: &Location,
        rng: &mut SimRng,
        ctx: FarmerContext<'_>,
    ) -> Result<()> {
        self.update_inventory(day, location, rng, ctx)?;
        self.update_money(rng, ctx.params);

        #[cfg(feature = "instrument")]
        {
            use crate::types::KeyToU64;
            for (good, qty) in self.inventory.iter() {
                tracing::info!(
                    target: "farmer_day",
                    day = day,
                    farmer_id = self.id.to_u64(),
                    location_id = self.location.to_u64(),
                    good_id = good.0,
                    inventory = *qty,
                    money = self.money,
                );
            }
        }
        Ok(())
    }

    fn update_inventory(
        &mut self,
        day: u32,
        location: &Location,
        rng: &mut SimRng,
        ctx: FarmerContext<'_>,
    ) -> Result<()> {
        for good in ctx.goods {
            let rate = location.prod_rate(good, day, ctx.noise)? * self.propensity(good.id);
            let max_amount = good.max_amount();
            let amount = self.inventory(good.id) as f64;
            let delta = sample_good_delta(rng, rate, amount, max_amount as f64);
            let next = (amount + delta).clamp(0.0, max_amount as f64);
            let slot = self
                .inventory
                .get_mut(good.id)
                .ok_or(SimError::UnknownGood(good.id))?;
            *slot = stochastic_round(rng, next).min(max_amount);
        }
        Ok(())
    }

    /// Pull money back toward [lower, upper] x DPV. One uniform is drawn
    /// only when money is outside that band.
    fn update_money(&mut self, rng: &mut SimRng, params: &FarmerParams) {
        let lower = params.lower_money_multiplier * self.dpv;
        let upper = params.upper_money_multiplier * self.dpv;
        if self.money >= lower && self.money <= upper {
            return;
        }
        if self.money < lower {
            if rng.chance(params.p_money_growth) {
                let floor = MONEY_FLOOR_FRACTION * self.dpv;
                self.money = if self.money < floor {
                    floor
                } else {
                    self.money * params.money_growth_factor
                };
            }
        } else if rng.chance(params.p_money_decay) {
            self.money *= params.money_decay_factor;
        }
    }

    /// Requote every good around the location's current prices.
    pub fn refresh_quotes(&mut self, location_prices: &PerGood<Price>, spread: f64) {
        for (good, &price) in location_prices.iter() {
            if let Some(buy) = self.buy_quotes.get_mut(good) {
                *buy = round_cents(price * (1.0 + spread));
            }
            if let Some(sell) = self.sell_quotes.get_mut(good) {
                *sell = round_cents(price * (1.0 - spread));
            }
        }
    }

    // === Trading ===

    /// Apply a completed trade with a counterparty. `unit_price` defaults to
    /// the farmer's quote for that side. Returns the total paid, rounded to cents.
    ///
    /// On error the farmer is unchanged.
    pub fn apply_fill(
        &mut self,
        side: Side,
        good: &Good,
        quantity: Quantity,
        unit_price: Option<Price>,
    ) -> std::result::Result<Price, TradeError> {
        if quantity == 0 {
            return Err(TradeError::InvalidQuantity);
        }
        let held = *self
            .inventory
            .get(good.id)
            .ok_or(TradeError::UnknownGood(good.id))?;
        let quote = match side {
            Side::Buy => self.buy_price(good.id),
            Side::Sell => self.sell_price(good.id),
        };
        let unit_price = unit_price
            .or(quote)
            .ok_or(TradeError::UnknownGood(good.id))?;
        if !(unit_price.is_finite() && unit_price >= 0.0) {
            return Err(TradeError::InvalidPrice(unit_price));
        }
        let total = round_cents(unit_price * quantity as f64);

        match side {
            Side::Buy => {
                if quantity > held {
                    return Err(TradeError::InsufficientInventory {
                        good: good.id,
                        available: held,
                        requested: quantity,
                    });
                }
                self.inventory[good.id] = held - quantity;
                self.money += total;
            }
            Side::Sell => {
                let resulting = held.saturating_add(quantity);
                if resulting > good.max_amount() {
                    return Err(TradeError::ExceedsCapacity {
                        good: good.id,
                        resulting,
                        max_amount: good.max_amount(),
                    });
                }
                if total > self.money {
                    return Err(TradeError::InsufficientFunds {
                        available: self.money,
                        required: total,
                    });
                }
                self.inventory[good.id] = resulting;
                self.money -= total;
            }
        }

        #[cfg(feature = "instrument")]
        {
            use crate::types::KeyToU64;
            let side_str = match side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            };
            tracing::info!(
                target: "fill",
                farmer_id = self.id.to_u64(),
                good_id = good.id.0,
                side = side_str,
                quantity = quantity,
                unit_price = unit_price,
                total = total,
            );
        }
        Ok(total)
    }
}

/// Per-good propensities for a new farmer.
///
/// Goods are selected by independent Bernoulli draws weighted by popularity,
/// redrawn as a whole until at least `min_n_goods` are picked. Selected goods
/// get `max(u, MIN_FARMER_PROD_PROBABILITY)`, the rest 0.
pub fn draw_propensity(
    rng: &mut SimRng,
    goods: &[Good],
    params: &FarmerParams,
) -> Result<PerGood<f64>> {
    let total_popularity: f64 = goods.iter().map(|g| g.spec.popularity).sum();
    let p_select: Vec<f64> = goods
        .iter()
        .map(|g| (params.mean_n_goods * g.spec.popularity / total_popularity).min(1.0))
        .collect();

    let mut selected = None;
    for _ in 0..MAX_SELECTION_ATTEMPTS {
        let picks: Vec<bool> = p_select.iter().map(|&p| rng.chance(p)).collect();
        if picks.iter().filter(|&&s| s).count() >= params.min_n_goods {
            selected = Some(picks);
            break;
        }
    }
    let selected = selected.ok_or(SimError::GoodSelectionExhausted {
        min_n_goods: params.min_n_goods,
        attempts: MAX_SELECTION_ATTEMPTS,
    })?;

    let rates: Vec<f64> = (0..goods.len()).map(|_| rng.uniform()).collect();
    Ok(PerGood::from_fn(goods.len(), |i| {
        if selected[i] {
            rates[i].max(MIN_FARMER_PROD_PROBABILITY)
        } else {
            0.0
        }
    }))
}

/// Sum of propensity x base price over all goods.
pub fn daily_production_value(propensity: &PerGood<f64>, goods: &[Good]) -> f64 {
    goods
        .iter()
        .map(|g| propensity.get(g.id).copied().unwrap_or(0.0) * g.base_price())
        .sum()
}

/// Floor plus a Bernoulli draw on the fractional part. Whole values draw
/// nothing.
fn stochastic_round(rng: &mut SimRng, value: f64) -> Quantity {
    let floor = value.floor();
    let frac = value - floor;
    let whole = floor as Quantity;
    if frac > 0.0 && rng.chance(frac) {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocationParams, ProdParams};
    use crate::goods::{default_goods, register_goods};
    use crate::types::Position;
    use slotmap::SlotMap;

    struct Fixture {
        goods: Vec<Good>,
        noise: NoiseGenerator,
        params: FarmerParams,
        location: Location,
        farmer_ids: SlotMap<FarmerId, ()>,
        rng: SimRng,
    }

    impl Fixture {
        fn new(seed: u64) -> Self {
            let goods = register_goods(&default_goods()).unwrap();
            let mut rng = SimRng::seed_from_u64(seed);
            let prod = ProdParams {
                spatial_res: 16,
                temporal_res: 8,
                ..ProdParams::default()
            };
            let noise =
                NoiseGenerator::new(&mut rng, &goods, 100, &prod, &LocationParams::default())
                    .unwrap();
            let mut location_ids: SlotMap<LocationId, ()> = SlotMap::with_key();
            let location = Location::new(
                location_ids.insert(()),
                "Ashford",
                Position::new(0.4, 0.6),
                goods.len(),
            );
            Self {
                goods,
                noise,
                params: FarmerParams::default(),
                location,
                farmer_ids: SlotMap::with_key(),
                rng,
            }
        }

        fn farmer(&mut self) -> Farmer {
            let id = self.farmer_ids.insert(());
            let ctx = FarmerContext {
                goods: &self.goods,
                noise: &self.noise,
                params: &self.params,
            };
            Farmer::new(id, "Wren Hollis", &self.location, &mut self.rng, ctx).unwrap()
        }
    }

    #[test]
    fn test_new_farmer_invariants() {
        let mut fx = Fixture::new(134);
        for _ in 0..50 {
            let farmer = fx.farmer();
            assert!(farmer.dpv() > 0.0);
            let lower = fx.params.lower_money_multiplier * farmer.dpv();
            let upper = fx.params.upper_money_multiplier * farmer.dpv();
            assert!(farmer.money() >= lower && farmer.money() <= upper);

            let selected = farmer.propensities().values().iter().filter(|&&p| p > 0.0).count();
            assert!(selected >= fx.params.min_n_goods);
            for (good, &p) in farmer.propensities().iter() {
                assert!(p == 0.0 || (MIN_FARMER_PROD_PROBABILITY..1.0).contains(&p));
                assert!(farmer.inventory(good) <= fx.goods[good.index()].max_amount());
            }
        }
    }

    #[test]
    fn test_inventory_bounded_over_many_days() {
        let mut fx = Fixture::new(5);
        let mut farmer = fx.farmer();
        for day in 0..500 {
            let ctx = FarmerContext {
                goods: &fx.goods,
                noise: &fx.noise,
                params: &fx.params,
            };
            farmer.update(day % 100, &fx.location, &mut fx.rng, ctx).unwrap();
            for good in &fx.goods {
                assert!(farmer.inventory(good.id) <= good.max_amount());
            }
            assert!(farmer.money() >= 0.0);
        }
    }

    #[test]
    fn test_zero_propensity_never_stocks() {
        let mut fx = Fixture::new(21);
        let propensity = PerGood::from_vec(vec![0.0, 1.0, 0.0, 0.0, 0.5]);
        let mut farmer = Farmer::with_propensity(
            fx.farmer_ids.insert(()),
            "Ada Voss",
            fx.location.id,
            propensity,
            &fx.goods,
            100.0,
        )
        .unwrap();
        for day in 0..300 {
            let ctx = FarmerContext {
                goods: &fx.goods,
                noise: &fx.noise,
                params: &fx.params,
            };
            farmer.update(day % 100, &fx.location, &mut fx.rng, ctx).unwrap();
            assert_eq!(farmer.inventory(GoodId::new(0)), 0);
            assert_eq!(farmer.inventory(GoodId::new(2)), 0);
            assert_eq!(farmer.inventory(GoodId::new(3)), 0);
        }
        assert!(farmer.stocked_goods().iter().all(|g| [1, 4].contains(&g.0)));
    }

    #[test]
    fn test_all_zero_propensity_rejected() {
        let fx = Fixture::new(1);
        let result = Farmer::with_propensity(
            FarmerId::default(),
            "Nobody",
            fx.location.id,
            PerGood::filled(5, 0.0),
            &fx.goods,
            10.0,
        );
        assert!(matches!(result, Err(SimError::NonPositiveDpv { .. })));
    }

    #[test]
    fn test_selection_exhaustion() {
        let goods = register_goods(&default_goods()).unwrap();
        let params = FarmerParams {
            mean_n_goods: 1e-9,
            min_n_goods: 5,
            ..FarmerParams::default()
        };
        let mut rng = SimRng::seed_from_u64(3);
        let result = draw_propensity(&mut rng, &goods, &params);
        assert!(matches!(
            result,
            Err(SimError::GoodSelectionExhausted { min_n_goods: 5, .. })
        ));
    }

    #[test]
    fn test_money_band_dynamics() {
        let fx = Fixture::new(2);
        let propensity = PerGood::from_vec(vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        // DPV = 0.1
        let mut farmer = Farmer::with_propensity(
            FarmerId::default(),
            "Ada Voss",
            fx.location.id,
            propensity,
            &fx.goods,
            0.0,
        )
        .unwrap();
        assert!((farmer.dpv() - 0.1).abs() < 1e-12);

        let mut rng = SimRng::seed_from_u64(8);
        let mut grew = false;
        for _ in 0..200 {
            let before = farmer.money();
            farmer.update_money(&mut rng, &fx.params);
            assert!(farmer.money() >= before);
            grew |= farmer.money() > before;
        }
        assert!(grew);
        // Growth stops once money enters the band
        let lower = fx.params.lower_money_multiplier * farmer.dpv();
        assert!(farmer.money() >= lower);
        let upper = fx.params.upper_money_multiplier * farmer.dpv();
        assert!(farmer.money() <= upper * fx.params.money_growth_factor);

        // Far above the band money only decays
        farmer.money = 1000.0;
        let mut last = farmer.money();
        for _ in 0..200 {
            farmer.update_money(&mut rng, &fx.params);
            assert!(farmer.money() <= last);
            last = farmer.money();
        }
        assert!(last < 1000.0);
    }

    #[test]
    fn test_quotes_around_location_price() {
        let fx = Fixture::new(4);
        let mut farmer = Farmer::with_propensity(
            FarmerId::default(),
            "Ada Voss",
            fx.location.id,
            PerGood::filled(5, 0.5),
            &fx.goods,
            50.0,
        )
        .unwrap();
        let prices = PerGood::from_vec(vec![0.1, 0.25, 0.5, 1.5, 5.0]);
        farmer.refresh_quotes(&prices, 0.1);
        assert_eq!(farmer.buy_price(GoodId::new(4)), Some(5.5));
        assert_eq!(farmer.sell_price(GoodId::new(4)), Some(4.5));
        assert_eq!(farmer.buy_price(GoodId::new(0)), Some(0.11));
        assert_eq!(farmer.sell_price(GoodId::new(0)), Some(0.09));
        assert_eq!(farmer.buy_price(GoodId::new(9)), None);
    }

    #[test]
    fn test_fills_move_stock_and_money() {
        let fx = Fixture::new(6);
        let mut farmer = Farmer::with_propensity(
            FarmerId::default(),
            "Ada Voss",
            fx.location.id,
            PerGood::filled(5, 0.5),
            &fx.goods,
            10.0,
        )
        .unwrap();
        let steak = &fx.goods[4];
        farmer.refresh_quotes(&PerGood::from_vec(vec![0.1, 0.25, 0.5, 1.5, 5.0]), 0.1);

        // Counterparty sells 2 steak at the 4.50 quote
        assert_eq!(farmer.apply_fill(Side::Sell, steak, 2, None), Ok(9.0));
        assert_eq!(farmer.inventory(steak.id), 2);
        assert!((farmer.money() - 1.0).abs() < 1e-9);

        // Not enough money for a third
        let err = farmer.apply_fill(Side::Sell, steak, 1, None).unwrap_err();
        assert!(matches!(err, TradeError::InsufficientFunds { .. }));
        assert_eq!(farmer.inventory(steak.id), 2);

        // Counterparty buys one back at the 5.50 quote
        assert_eq!(farmer.apply_fill(Side::Buy, steak, 1, None), Ok(5.5));
        assert_eq!(farmer.inventory(steak.id), 1);
        assert!((farmer.money() - 6.5).abs() < 1e-9);

        assert_eq!(
            farmer.apply_fill(Side::Buy, steak, 2, None),
            Err(TradeError::InsufficientInventory {
                good: steak.id,
                available: 1,
                requested: 2,
            })
        );
        assert_eq!(
            farmer.apply_fill(Side::Buy, steak, 0, None),
            Err(TradeError::InvalidQuantity)
        );
        assert_eq!(
            farmer.apply_fill(Side::Sell, steak, 40, Some(0.0)),
            Err(TradeError::ExceedsCapacity {
                good: steak.id,
                resulting: 41,
                max_amount: 40,
            })
        );
        assert!(matches!(
            farmer.apply_fill(Side::Buy, steak, 1, Some(f64::NAN)),
            Err(TradeError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_stochastic_round_is_unbiased() {
        let mut rng = SimRng::seed_from_u64(77);
        assert_eq!(stochastic_round(&mut rng, 3.0), 3);
        let trials = 20_000;
        let total: u32 = (0..trials).map(|_| stochastic_round(&mut rng, 2.3)).sum();
        let mean = total as f64 / trials as f64;
        assert!((mean - 2.3).abs() < 0.02, "mean = {}", mean);
    }
}
