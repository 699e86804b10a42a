// Location placement density: a sum of Gaussian clusters over the unit square

use crate::config::LocationParams;
use crate::error::{Result, SimError};
use crate::rng::SimRng;
use crate::types::Position;

/// Cells along each side of the placement grid.
pub const LOCATION_GRID_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster {
    pub amplitude: f64,
    pub center: Position,
    pub std: f64,
}

/// Normalized 2D density and its flattened CDF.
#[derive(Debug, Clone)]
pub struct DensityField {
    size: usize,
    clusters: Vec<Cluster>,
    density: Vec<f64>,
    cdf: Vec<f64>,
}

impl DensityField {
    /// Draw clusters and build the density. Draw order: all amplitudes, then
    /// all centers (x then y), then all widths.
    pub fn generate(rng: &mut SimRng, params: &LocationParams) -> Result<Self> {
        let n = params.n_clusters;
        let amps: Vec<f64> = (0..n)
            .map(|_| rng.uniform_range(params.amp_min, params.amp_max))
            .collect();
        let centers: Vec<Position> = (0..n)
            .map(|_| {
                let x = rng.uniform();
                let y = rng.uniform();
                Position::new(x, y)
            })
            .collect();
        let stds: Vec<f64> = (0..n)
            .map(|_| rng.uniform_range(params.std_min, params.std_max))
            .collect();

        let clusters = amps
            .into_iter()
            .zip(centers)
            .zip(stds)
            .map(|((amplitude, center), std)| Cluster {
                amplitude,
                center,
                std,
            })
            .collect();
        Self::from_clusters(clusters, LOCATION_GRID_SIZE)
    }

    pub fn from_clusters(clusters: Vec<Cluster>, size: usize) -> Result<Self> {
        if size < 2 {
            return Err(SimError::InvalidConfig(
                "density grid needs at least 2 cells per side".to_string(),
            ));
        }
        let step = 1.0 / (size - 1) as f64;
        let mut density = vec![0.0; size * size];
        for cluster in &clusters {
            let two_var = 2.0 * cluster.std * cluster.std;
            for row in 0..size {
                let dy = row as f64 * step - cluster.center.y;
                for col in 0..size {
                    let dx = col as f64 * step - cluster.center.x;
                    density[row * size + col] +=
                        cluster.amplitude * (-(dx * dx + dy * dy) / two_var).exp();
                }
            }
        }

        let total: f64 = density.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "location density has invalid total mass {}",
                total
            )));
        }
        density.iter_mut().for_each(|d| *d /= total);

        let cdf = density
            .iter()
            .scan(0.0, |acc, d| {
                *acc += d;
                Some(*acc)
            })
            .collect();

        Ok(Self {
            size,
            clusters,
            density,
            cdf,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn density(&self) -> &[f64] {
        &self.density
    }

    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// Grid cell of the first CDF entry >= r, clamped to the last cell.
    pub fn cell_for(&self, r: f64) -> (usize, usize) {
        let idx = self.cdf.partition_point(|&c| c < r).min(self.cdf.len() - 1);
        (idx / self.size, idx % self.size)
    }

    /// Inverse-transform sample of a position.
    pub fn sample(&self, rng: &mut SimRng) -> Position {
        let (row, col) = self.cell_for(rng.uniform());
        Position::new(col as f64 / self.size as f64, row as f64 / self.size as f64)
    }
}
