// Production fields: normalized, exponentiated noise per good

use std::f64::consts::TAU;

use ::noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::math::trilinear;
use crate::rng::SimRng;

/// Grid shape and noise frequency of a production field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeSpec {
    /// Grid cells along (t, y, x)
    pub shape: [usize; 3],
    /// Noise periods spanned along (t, y, x)
    pub periods: [usize; 3],
}

impl LatticeSpec {
    /// Noise-space point for grid cell (t, y, x).
    ///
    /// Time runs once around a circle whose circumference is `periods[0]`, so
    /// the last time plane lands back on the first one and the year tiles.
    fn point(&self, t: usize, y: usize, x: usize) -> [f64; 4] {
        let [nt, ny, nx] = self.shape;
        let turns = nt.saturating_sub(1).max(1);
        let angle = TAU * (t % turns) as f64 / turns as f64;
        let radius = self.periods[0] as f64 / TAU;
        let along = |i: usize, n: usize, periods: usize| {
            if n > 1 {
                i as f64 * periods as f64 / (n - 1) as f64
            } else {
                0.0
            }
        };
        [
            radius * angle.cos(),
            radius * angle.sin(),
            along(y, ny, self.periods[1]),
            along(x, nx, self.periods[2]),
        ]
    }
}

/// Immutable 3D (t, y, x) grid of values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseField {
    dims: [usize; 3],
    values: Vec<f64>,
}

impl NoiseField {
    /// Wrap an existing grid. Values are stored as given.
    pub fn from_values(dims: [usize; 3], values: Vec<f64>) -> Option<Self> {
        if dims.iter().product::<usize>() != values.len() || values.is_empty() {
            return None;
        }
        Some(Self { dims, values })
    }

    /// Generate a good's production field: fractal Perlin noise seeded from
    /// the shared stream, tiled along time, rescaled to [0, 1] and raised to
    /// `exponent`.
    pub fn generate(
        rng: &mut SimRng,
        lattice: &LatticeSpec,
        octaves: u32,
        persistence: f64,
        exponent: f64,
    ) -> Self {
        let fbm = Fbm::<Perlin>::new(rng.seed_u32())
            .set_octaves(octaves.max(1) as usize)
            .set_persistence(persistence);

        let [nt, ny, nx] = lattice.shape;
        let mut values = Vec::with_capacity(nt * ny * nx);
        for t in 0..nt {
            for y in 0..ny {
                for x in 0..nx {
                    values.push(fbm.get(lattice.point(t, y, x)));
                }
            }
        }

        rescale_unit(&mut values);
        for v in values.iter_mut() {
            *v = v.powf(exponent);
        }
        Self {
            dims: lattice.shape,
            values,
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Stored value at a grid index, if in range
    pub fn get(&self, t: usize, y: usize, x: usize) -> Option<f64> {
        let [nt, ny, nx] = self.dims;
        if t >= nt || y >= ny || x >= nx {
            return None;
        }
        Some(self.values[(t * ny + y) * nx + x])
    }

    /// Trilinear sample at fractional coordinates in [0, 1] (clamped).
    pub fn sample(&self, tp: f64, yp: f64, xp: f64) -> f64 {
        trilinear(&self.values, self.dims, tp, yp, xp)
    }
}

/// Min-max rescale into [0, 1]. A constant grid becomes all zeros.
fn rescale_unit(values: &mut [f64]) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        values.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    for v in values.iter_mut() {
        *v = ((*v - min) / range).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> LatticeSpec {
        LatticeSpec {
            shape: [9, 8, 8],
            periods: [2, 2, 2],
        }
    }

    #[test]
    fn test_generated_field_in_unit_range() {
        let mut rng = SimRng::seed_from_u64(134);
        let field = NoiseField::generate(&mut rng, &lattice(), 1, 0.5, 2.0);
        assert_eq!(field.values().len(), 9 * 8 * 8);
        assert!(field.values().iter().all(|v| (0.0..=1.0).contains(v)));
        // Rescaling hits both ends before exponentiation, which keeps 0 and 1
        let max = field.values().iter().cloned().fold(0.0, f64::max);
        let min = field.values().iter().cloned().fold(1.0, f64::min);
        assert_eq!(max, 1.0);
        assert_eq!(min, 0.0);
    }

    #[test]
    fn test_exponent_makes_high_values_rarer() {
        let linear = NoiseField::generate(&mut SimRng::seed_from_u64(3), &lattice(), 3, 0.5, 1.0);
        let steep = NoiseField::generate(&mut SimRng::seed_from_u64(3), &lattice(), 3, 0.5, 4.0);
        let mean = |f: &NoiseField| f.values().iter().sum::<f64>() / f.values().len() as f64;
        assert!(mean(&steep) < mean(&linear));
    }

    #[test]
    fn test_time_axis_tiles() {
        let field = NoiseField::generate(&mut SimRng::seed_from_u64(5), &lattice(), 2, 0.5, 1.5);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(field.get(0, y, x), field.get(8, y, x));
            }
        }
        // Interior planes still vary over the year
        let differs = (0..8).any(|y| field.get(0, y, 3) != field.get(4, y, 3));
        assert!(differs);
    }

    #[test]
    fn test_seed_drawn_from_stream() {
        let mut rng = SimRng::seed_from_u64(11);
        let a = NoiseField::generate(&mut rng, &lattice(), 1, 0.5, 1.0);
        // One seed word per field
        assert_eq!(rng.word_pos(), SimRng::seed_from_u64(11).word_pos() + 1);
        let b = NoiseField::generate(&mut rng, &lattice(), 1, 0.5, 1.0);
        assert_ne!(a, b);
        assert_eq!(a, NoiseField::generate(&mut SimRng::seed_from_u64(11), &lattice(), 1, 0.5, 1.0));
    }

    #[test]
    fn test_constant_grid_rescales_to_zero() {
        let mut values = vec![0.3; 12];
        rescale_unit(&mut values);
        assert!(values.iter().all(|&v| v == 0.0));

        let mut values = vec![-1.0, 0.0, 3.0];
        rescale_unit(&mut values);
        assert_eq!(values, vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_sample_matches_grid_and_midpoints() {
        let values: Vec<f64> = (0..27).map(|i| i as f64 / 26.0).collect();
        let field = NoiseField::from_values([3, 3, 3], values).unwrap();

        assert_eq!(field.sample(0.5, 0.5, 0.5), field.get(1, 1, 1).unwrap());
        assert_eq!(field.sample(1.0, 0.0, 1.0), field.get(2, 0, 2).unwrap());

        let mid = field.sample(0.5, 0.25, 0.5);
        let expected = (field.get(1, 0, 1).unwrap() + field.get(1, 1, 1).unwrap()) / 2.0;
        assert!((mid - expected).abs() < 1e-12);

        assert!(NoiseField::from_values([2, 2, 2], vec![0.0; 7]).is_none());
        assert_eq!(field.get(3, 0, 0), None);
    }
}
