use wasm_bindgen::prelude::*;

use crate::config::WorldConfig;
use crate::snapshot::WorldSnapshot;
use crate::world::World;

// ============================================================================
// WASM API - Economy
// ============================================================================

#[wasm_bindgen]
pub struct Economy {
    world: World,
}

#[wasm_bindgen]
impl Economy {
    /// Reference world with the given seed
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, location_names: Vec<String>) -> Result<Economy, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let config = WorldConfig::default().with_seed(seed);
        let world = World::new(config, &location_names)?;
        Ok(Self { world })
    }

    /// Build from a partial `WorldConfig` object; missing fields take defaults
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(config: JsValue, location_names: Vec<String>) -> Result<Economy, JsError> {
        console_error_panic_hook::set_once();

        let config: WorldConfig = serde_wasm_bindgen::from_value(config)?;
        let world = World::new(config, &location_names)?;
        Ok(Self { world })
    }

    /// Simulate one day and return the day of the year
    #[wasm_bindgen(js_name = advanceDay)]
    pub fn advance_day(&mut self) -> Result<u32, JsError> {
        Ok(self.world.advance_day()?)
    }

    /// Day of the year last simulated, undefined before the first day
    #[wasm_bindgen]
    pub fn day(&self) -> Option<u32> {
        self.world.today()
    }

    #[wasm_bindgen]
    pub fn snapshot(&self) -> WorldSnapshot {
        self.world.snapshot()
    }
}

impl Economy {
    pub fn world(&self) -> &World {
        &self.world
    }
}
