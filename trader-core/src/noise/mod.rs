// Noise fields driving production and location placement

pub mod delta;
pub mod density;
pub mod field;

pub use delta::*;
pub use density::*;
pub use field::*;

use crate::config::{LocationParams, ProdParams};
use crate::error::{Result, SimError};
use crate::goods::Good;
use crate::rng::SimRng;
use crate::types::{GoodId, PerGood, Position};

/// Owns one production field per good plus the placement density.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    year_length: u32,
    prod_fields: PerGood<NoiseField>,
    density: DensityField,
}

impl NoiseGenerator {
    /// Build every field from the shared stream: the placement density
    /// first, then one noise seed per good in id order.
    pub fn new(
        rng: &mut SimRng,
        goods: &[Good],
        year_length: u32,
        prod: &ProdParams,
        locations: &LocationParams,
    ) -> Result<Self> {
        if year_length == 0 {
            return Err(SimError::InvalidConfig(
                "year_length must be positive".to_string(),
            ));
        }
        let density = DensityField::generate(rng, locations)?;

        let lattice = LatticeSpec {
            shape: [prod.temporal_res, prod.spatial_res, prod.spatial_res],
            periods: [
                prod.temporal_octaves,
                prod.spatial_octaves,
                prod.spatial_octaves,
            ],
        };
        let prod_fields = goods
            .iter()
            .map(|good| {
                NoiseField::generate(
                    rng,
                    &lattice,
                    prod.detail_layers,
                    prod.persistence,
                    good.spec.prod_rate_exponent,
                )
            })
            .collect();

        Ok(Self {
            year_length,
            prod_fields: PerGood::from_vec(prod_fields),
            density,
        })
    }

    pub fn year_length(&self) -> u32 {
        self.year_length
    }

    pub fn field(&self, good: GoodId) -> Option<&NoiseField> {
        self.prod_fields.get(good)
    }

    pub fn density(&self) -> &DensityField {
        &self.density
    }

    /// Normalized production intensity in [0, 1] for a good at a day and
    /// position. Days wrap around the year.
    pub fn sample_good_prod(&self, good: GoodId, day: u32, position: Position) -> Result<f64> {
        let field = self.field(good).ok_or(SimError::UnknownGood(good))?;
        let tp = (day % self.year_length) as f64 / self.year_length as f64;
        Ok(field.sample(tp, position.y, position.x))
    }

    /// Draw a location position from the placement density.
    pub fn sample_location(&self, rng: &mut SimRng) -> Position {
        self.density.sample(rng)
    }
}
