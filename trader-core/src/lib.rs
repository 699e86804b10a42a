//! Procedural trading economy: farmers stockpile goods along noise-driven
//! production fields, and location prices follow local scarcity.

pub mod agents;
pub mod config;
pub mod error;
pub mod geography;
pub mod goods;
pub mod math;
pub mod names;
pub mod noise;
pub mod rng;
pub mod snapshot;
pub mod types;
pub mod wasm;
pub mod world;

#[cfg(feature = "instrument")]
pub use instrument;

pub use agents::{Farmer, FarmerContext};
pub use config::{FarmerParams, LocationParams, ProdParams, WorldConfig};
pub use error::{Result, SimError, TradeError};
pub use geography::Location;
pub use goods::{Good, GoodSpec, default_goods};
pub use noise::NoiseGenerator;
pub use rng::SimRng;
pub use snapshot::*;
pub use types::*;
pub use wasm::Economy;
pub use world::World;
