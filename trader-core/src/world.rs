// World state and daily tick for the trading economy

use slotmap::{SecondaryMap, SlotMap};

use crate::agents::{Farmer, FarmerContext};
use crate::config::{FarmerParams, LocationParams, ProdParams, WorldConfig};
use crate::error::{Result, SimError, TradeError};
use crate::geography::Location;
use crate::goods::{Good, GoodSpec, calculate_base_abundance, register_goods};
use crate::names::full_name;
use crate::noise::NoiseGenerator;
use crate::rng::SimRng;
use crate::snapshot::{FarmerSnapshot, GoodSnapshot, LocationSnapshot, WorldSnapshot};
use crate::types::{FarmerId, GoodId, KeyToU64, LocationId, Price, Quantity, Side};

/// Complete state of one procedurally generated economy
#[derive(Debug, Clone)]
pub struct World {
    config: WorldConfig,
    goods: Vec<Good>,
    noise: NoiseGenerator,
    rng: SimRng,

    // Arenas iterate in insertion order; nothing is ever removed
    locations: SlotMap<LocationId, Location>,
    farmers: SlotMap<FarmerId, Farmer>,

    /// Day of the year last simulated
    today: Option<u32>,
    days_elapsed: u64,
}

impl World {
    /// Build a world from a config and candidate location names.
    ///
    /// RNG draws happen in a fixed order: noise fields, location names,
    /// location positions, then farmers location by location.
    pub fn new<S: AsRef<str>>(config: WorldConfig, location_names: &[S]) -> Result<Self> {
        config.validate()?;
        let n_locations = config.locations.n_locations;
        if location_names.len() < n_locations {
            return Err(SimError::NotEnoughLocationNames {
                available: location_names.len(),
                requested: n_locations,
            });
        }

        let goods = register_goods(&config.goods)?;
        let mut rng = SimRng::seed_from_u64(config.seed);
        let noise = NoiseGenerator::new(
            &mut rng,
            &goods,
            config.year_length,
            &config.prod,
            &config.locations,
        )?;

        // === Locations ===

        let mut locations: SlotMap<LocationId, Location> = SlotMap::with_key();
        let picked = rng.sample_indices(location_names.len(), n_locations);
        for idx in picked {
            let position = noise.sample_location(&mut rng);
            let name = location_names[idx].as_ref().trim().to_string();
            locations.insert_with_key(|id| Location::new(id, name, position, goods.len()));
        }

        let positions: Vec<_> = locations.iter().map(|(id, l)| (id, l.position)).collect();
        for (id, position) in &positions {
            let mut distances = SecondaryMap::new();
            for (other, other_position) in &positions {
                distances.insert(*other, position.distance(other_position));
            }
            if let Some(location) = locations.get_mut(*id) {
                location.set_distances(distances);
            }
        }

        // === Farmers ===

        let mut farmers: SlotMap<FarmerId, Farmer> = SlotMap::with_key();
        let ctx = FarmerContext {
            goods: &goods,
            noise: &noise,
            params: &config.farmers,
        };
        let location_ids: Vec<LocationId> = locations.keys().collect();
        for location_id in location_ids {
            let location = locations
                .get(location_id)
                .ok_or(SimError::UnknownLocation(location_id))?;
            let count = rng
                .geometric(config.locations.farmer_count_p)
                .min(config.locations.max_farmers);
            let mut resident = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = full_name(&mut rng);
                let id = farmers
                    .try_insert_with_key(|id| Farmer::new(id, name, location, &mut rng, ctx))?;
                resident.push(id);
            }
            if let Some(location) = locations.get_mut(location_id) {
                location.farmer_ids = resident;
            }
        }

        // === Base abundance ===

        let mut goods = goods;
        for good in goods.iter_mut() {
            let inventories: Vec<Quantity> =
                farmers.values().map(|f| f.inventory(good.id)).collect();
            let abundance = calculate_base_abundance(good, &inventories)?;
            good.set_base_abundance(abundance);
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "world_init",
            seed = config.seed,
            n_goods = goods.len(),
            n_locations = locations.len(),
            n_farmers = farmers.len(),
        );

        let mut world = Self {
            config,
            goods,
            noise,
            rng,
            locations,
            farmers,
            today: None,
            days_elapsed: 0,
        };
        world.reprice(0);
        Ok(world)
    }

    /// Build a world from individual parameter groups.
    #[allow(clippy::too_many_arguments)]
    pub fn init<S: AsRef<str>>(
        seed: u64,
        goods: Vec<GoodSpec>,
        year_length: u32,
        prod: ProdParams,
        locations: LocationParams,
        farmers: FarmerParams,
        location_names: &[S],
    ) -> Result<Self> {
        let config = WorldConfig {
            seed,
            year_length,
            goods,
            prod,
            locations,
            farmers,
        };
        Self::new(config, location_names)
    }

    // === Tick ===

    /// Simulate the next day of the year and return it. The first call
    /// simulates day 0.
    ///
    /// Farmers update first, then every location reprices from the same
    /// day's inventories, then farmers requote.
    pub fn advance_day(&mut self) -> Result<u32> {
        let day = match self.today {
            Some(today) => (today + 1) % self.config.year_length,
            None => 0,
        };

        let ctx = FarmerContext {
            goods: &self.goods,
            noise: &self.noise,
            params: &self.config.farmers,
        };
        for farmer in self.farmers.values_mut() {
            let location = self
                .locations
                .get(farmer.location)
                .ok_or(SimError::UnknownLocation(farmer.location))?;
            farmer.update(day, location, &mut self.rng, ctx)?;
        }

        self.reprice(day);
        self.today = Some(day);
        self.days_elapsed += 1;
        Ok(day)
    }

    /// Recompute every location's supply and prices, then refresh quotes.
    /// Draws nothing from the RNG.
    fn reprice(&mut self, day: u32) {
        let sensitivity = self.config.locations.supply_sensitivity;
        for location in self.locations.values_mut() {
            location.update(day, &self.farmers, &self.goods, sensitivity);
        }
        let spread = self.config.farmers.spread;
        for farmer in self.farmers.values_mut() {
            if let Some(location) = self.locations.get(farmer.location) {
                farmer.refresh_quotes(location.prices(), spread);
            }
        }
    }

    // === Trading ===

    /// Apply a fill against a farmer. See `Farmer::apply_fill`.
    pub fn apply_fill(
        &mut self,
        farmer: FarmerId,
        side: Side,
        good: GoodId,
        quantity: Quantity,
        unit_price: Option<Price>,
    ) -> std::result::Result<Price, TradeError> {
        let good = self
            .goods
            .get(good.index())
            .ok_or(TradeError::UnknownGood(good))?;
        let farmer = self
            .farmers
            .get_mut(farmer)
            .ok_or(TradeError::UnknownFarmer(farmer))?;
        farmer.apply_fill(side, good, quantity, unit_price)
    }

    /// Cost of travelling between two locations, rounded to cents.
    pub fn travel_cost(&self, from: LocationId, to: LocationId) -> Option<Price> {
        self.locations
            .get(from)?
            .travel_cost(to, self.config.locations.travel_cost_multiplier)
    }

    // === Accessors ===

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn goods(&self) -> &[Good] {
        &self.goods
    }

    pub fn good(&self, id: GoodId) -> Option<&Good> {
        self.goods.get(id.index())
    }

    pub fn noise(&self) -> &NoiseGenerator {
        &self.noise
    }

    pub fn locations(&self) -> &SlotMap<LocationId, Location> {
        &self.locations
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn farmers(&self) -> &SlotMap<FarmerId, Farmer> {
        &self.farmers
    }

    pub fn farmer(&self, id: FarmerId) -> Option<&Farmer> {
        self.farmers.get(id)
    }

    /// Farmers living at a location, in creation order
    pub fn farmers_at(&self, location: LocationId) -> Vec<&Farmer> {
        self.locations
            .get(location)
            .map(|l| {
                l.farmer_ids
                    .iter()
                    .filter_map(|id| self.farmers.get(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn today(&self) -> Option<u32> {
        self.today
    }

    pub fn days_elapsed(&self) -> u64 {
        self.days_elapsed
    }

    /// Position of the world's RNG stream
    pub fn rng_word_pos(&self) -> u128 {
        self.rng.word_pos()
    }

    // === Snapshot ===

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            day: self.today,
            days_elapsed: self.days_elapsed,
            goods: self
                .goods
                .iter()
                .map(|g| GoodSnapshot {
                    id: g.id.0,
                    name: g.name().to_string(),
                    base_price: g.base_price(),
                    max_amount: g.max_amount(),
                    base_abundance: g.base_abundance(),
                })
                .collect(),
            locations: self
                .locations
                .iter()
                .map(|(id, l)| LocationSnapshot {
                    id: id.to_u64(),
                    name: l.name.clone(),
                    position: l.position,
                    prices: l.prices().values().to_vec(),
                    supply_scores: l.supply_scores().values().to_vec(),
                    farmers: l.farmer_ids.iter().map(|f| f.to_u64()).collect(),
                })
                .collect(),
            farmers: self
                .farmers
                .iter()
                .map(|(id, f)| FarmerSnapshot {
                    id: id.to_u64(),
                    name: f.name.clone(),
                    location: f.location.to_u64(),
                    inventory: f.inventories().values().to_vec(),
                    money: f.money(),
                    dpv: f.dpv(),
                    buy_prices: f.buy_quotes().values().to_vec(),
                    sell_prices: f.sell_quotes().values().to_vec(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Town {}", i)).collect()
    }

    fn small_config(seed: u64) -> WorldConfig {
        let mut config = WorldConfig::default().with_seed(seed);
        config.prod.spatial_res = 16;
        config.prod.temporal_res = 8;
        config.locations.n_locations = 6;
        config
    }

    #[test]
    fn test_world_layout() {
        let world = World::new(small_config(134), &names(30)).unwrap();
        assert_eq!(world.locations().len(), 6);
        assert!(!world.farmers().is_empty());

        let mut resident_total = 0;
        for (id, location) in world.locations() {
            assert!(location.farmer_ids.len() <= 4);
            assert!(location.name.starts_with("Town "));
            assert_eq!(location.distance_to(id), Some(0.0));
            for farmer in world.farmers_at(id) {
                assert_eq!(farmer.location, id);
            }
            resident_total += location.farmer_ids.len();
        }
        assert_eq!(resident_total, world.farmers().len());
        assert!(world.goods().iter().all(|g| g.has_base_abundance()));
        assert_eq!(world.today(), None);
    }

    #[test]
    fn test_distances_symmetric() {
        let world = World::new(small_config(3), &names(10)).unwrap();
        let ids: Vec<LocationId> = world.locations().keys().collect();
        for &a in &ids {
            for &b in &ids {
                let ab = world.location(a).unwrap().distance_to(b).unwrap();
                let ba = world.location(b).unwrap().distance_to(a).unwrap();
                assert_eq!(ab, ba);
                assert_eq!(world.travel_cost(a, b), world.travel_cost(b, a));
            }
        }
    }

    #[test]
    fn test_location_names_unique() {
        let world = World::new(small_config(8), &names(6)).unwrap();
        let mut picked: Vec<&str> = world.locations().values().map(|l| l.name.as_str()).collect();
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 6);
    }

    #[test]
    fn test_too_few_names() {
        let err = World::new(small_config(1), &names(5)).unwrap_err();
        assert!(matches!(
            err,
            SimError::NotEnoughLocationNames {
                available: 5,
                requested: 6
            }
        ));
    }

    #[test]
    fn test_day_counter_wraps() {
        let mut config = small_config(2);
        config.year_length = 3;
        let mut world = World::new(config, &names(10)).unwrap();
        let days: Vec<u32> = (0..7).map(|_| world.advance_day().unwrap()).collect();
        assert_eq!(days, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(world.today(), Some(0));
        assert_eq!(world.days_elapsed(), 7);
    }

    #[test]
    fn test_initial_prices_set_without_draws() {
        let world = World::new(small_config(5), &names(10)).unwrap();
        let pos = world.rng_word_pos();
        for location in world.locations().values() {
            for (good, &price) in location.prices().iter() {
                let base = world.good(good).unwrap().base_price();
                assert!(price >= 0.25 * base && price <= 4.0 * base);
            }
        }
        // Repricing again must leave the stream untouched
        let mut copy = world.clone();
        copy.reprice(0);
        assert_eq!(copy.rng_word_pos(), pos);
    }

    #[test]
    fn test_world_fill_lookups() {
        let mut world = World::new(small_config(11), &names(10)).unwrap();
        let farmer_id = world.farmers().keys().next().unwrap();
        assert_eq!(
            world.apply_fill(farmer_id, Side::Buy, GoodId::new(99), 1, None),
            Err(TradeError::UnknownGood(GoodId::new(99)))
        );
        assert_eq!(
            world.apply_fill(FarmerId::default(), Side::Buy, GoodId::new(0), 1, None),
            Err(TradeError::UnknownFarmer(FarmerId::default()))
        );
    }

    #[test]
    fn test_snapshot_shape() {
        let mut world = World::new(small_config(13), &names(10)).unwrap();
        world.advance_day().unwrap();
        let snap = world.snapshot();
        assert_eq!(snap.day, Some(0));
        assert_eq!(snap.goods.len(), 5);
        assert_eq!(snap.locations.len(), 6);
        assert_eq!(snap.farmers.len(), world.farmers().len());
        for farmer in &snap.farmers {
            assert_eq!(farmer.inventory.len(), 5);
            assert_eq!(farmer.buy_prices.len(), 5);
        }
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"days_elapsed\":1"));
    }
}
