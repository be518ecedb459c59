//! Biome lookup and gradient-weighted spawning.

use darkheim_shared::gradient::{biome_gradient, gradient_density, in_gradient_range};
use darkheim_shared::ChunkCoord;

use crate::config::{BiomeBounds, BiomeIndex, SpawnDensity};
use crate::error::ConfigResult;

/// Maps chunks to biomes and world X positions to biome gradients.
#[derive(Clone, Debug)]
pub struct GradientResolver {
    biomes: Vec<BiomeBounds>,
}

impl GradientResolver {
    /// Builds a resolver over an index, validating it first so there is
    /// always a default biome.
    pub fn new(index: &BiomeIndex) -> ConfigResult<Self> {
        index.validate()?;
        Ok(Self { biomes: index.biomes.clone() })
    }

    /// Returns the first biome containing the chunk, or the first biome
    /// listed if none does.
    #[must_use]
    pub fn biome_at(&self, chunk_x: i32, chunk_y: i32) -> &BiomeBounds {
        self.biomes
            .iter()
            .find(|b| b.contains(chunk_x, chunk_y))
            .unwrap_or(&self.biomes[0])
    }

    /// Biome owning a world pixel position. Non-finite positions resolve
    /// to the default biome.
    #[must_use]
    pub fn biome_at_world(&self, world_x: f64, world_y: f64) -> &BiomeBounds {
        match ChunkCoord::from_world_pos(world_x, world_y) {
            Some(coord) => self.biome_at(coord.x, coord.y),
            None => &self.biomes[0],
        }
    }

    /// Curve-adjusted position of `world_x` within the biome's width.
    #[inline]
    #[must_use]
    pub fn gradient(&self, world_x: f64, biome: &BiomeBounds) -> f64 {
        biome_gradient(world_x, biome.start_chunk_x, biome.end_chunk_x, biome.gradient_curve)
    }

    /// Returns true if `roll` falls under the entry's density at `gradient`.
    #[inline]
    #[must_use]
    pub fn should_spawn(&self, gradient: f64, entry: &SpawnDensity, roll: f64) -> bool {
        in_gradient_range(gradient, entry.min_gradient, entry.max_gradient)
            && roll < gradient_density(gradient, entry.density_at_left, entry.density_at_right)
    }

    /// The entry's density at `gradient` (0 outside its range).
    #[inline]
    #[must_use]
    pub fn density(&self, gradient: f64, entry: &SpawnDensity) -> f64 {
        if in_gradient_range(gradient, entry.min_gradient, entry.max_gradient) {
            gradient_density(gradient, entry.density_at_left, entry.density_at_right)
        } else {
            0.0
        }
    }
}
