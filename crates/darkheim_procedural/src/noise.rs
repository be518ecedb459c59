//! # Noise Field
//!
//! Seeded scalar fields for terrain generation, plus a position hash for
//! independent per-cell randomness.
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed`, every function here produces **exactly** the
//! same value on any platform, any time. Persisted chunks and freshly
//! generated neighbours must line up, so nothing in this module may depend
//! on global state, iteration order or floating-point environment.

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (elevation, rivers, ...).
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }

    /// 32-bit fold of the seed used by the position hash.
    #[inline]
    #[must_use]
    pub const fn fold32(self) -> u32 {
        (self.0 ^ (self.0 >> 32)) as u32
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(darkheim_shared::DEFAULT_SEED)
    }
}

/// Sub-seed purposes.
pub mod purpose {
    /// Elevation octaves.
    pub const ELEVATION: u64 = 1;
    /// Moisture octaves.
    pub const MOISTURE: u64 = 2;
    /// Detail / zone / cave noise.
    pub const DETAIL: u64 = 3;
    /// Global river-network feature placement.
    pub const RIVERS: u64 = 4;
}

/// Pre-computed permutation table for noise.
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl PermutationTable {
    /// 12 gradient vectors for 2D simplex.
    const GRAD: [[i8; 2]; 12] = [
        [1, 0], [1, 1], [0, 1], [-1, 1],
        [-1, 0], [-1, -1], [0, -1], [1, -1],
        [1, 0], [0, 1], [-1, 0], [0, -1],
    ];

    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates with xorshift64. A zero state would never move.
        let mut rng_state = seed.value() | 1;
        for i in (1..256).rev() {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 7;
            rng_state ^= rng_state << 17;

            let j = (rng_state % (i as u64 + 1)) as usize;
            perm.swap(i, j);
        }

        for i in 0..256 {
            perm[256 + i] = perm[i];
        }

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }

    #[inline]
    fn gradient(hash: u8) -> [i8; 2] {
        Self::GRAD[(hash % 12) as usize]
    }
}

/// 2D Simplex noise generator.
///
/// Produces smooth, continuous noise values in the range [-1, 1].
pub struct SimplexNoise {
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid.
    const F2: f64 = 0.366_025_403_784_439; // (sqrt(3) - 1) / 2
    /// Unskewing factor for 2D simplex grid.
    const G2: f64 = 0.211_324_865_405_187; // (3 - sqrt(3)) / 6

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D simplex noise at the given coordinates.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        let unskew = f64::from(i.wrapping_add(j)) * Self::G2;
        let x0 = x - (f64::from(i) - unskew);
        let y0 = y - (f64::from(j) - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let y1 = y0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;

        let p = &self.perm_table;
        let gi0 = p.get(ii + p.get(jj) as usize);
        let gi1 = p.get(ii + i1 + p.get(jj + j1) as usize);
        let gi2 = p.get(ii + 1 + p.get(jj + 1) as usize);

        let n0 = Self::contribution(x0, y0, gi0);
        let n1 = Self::contribution(x1, y1, gi1);
        let n2 = Self::contribution(x2, y2, gi2);

        // 70.0 normalises the sum to [-1, 1]
        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }

    #[inline]
    fn contribution(x: f64, y: f64, gradient_index: u8) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            0.0
        } else {
            let grad = PermutationTable::gradient(gradient_index);
            let t2 = t * t;
            t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]))
        }
    }

    /// Generates octaved (fractal) noise.
    ///
    /// # Arguments
    ///
    /// * `x`, `y` - Coordinates
    /// * `octaves` - Number of noise layers
    /// * `persistence` - Amplitude decay per octave (typically 0.5)
    /// * `lacunarity` - Frequency increase per octave (typically 2.0)
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn octaved(&self, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..octaves {
            total += self.sample(x * frequency, y * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if max_amplitude == 0.0 {
            return 0.0;
        }
        total / max_amplitude
    }
}

/// Fast floor function.
#[inline]
fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) { xi - 1 } else { xi }
}

/// Maps a `[-1, 1]` noise value onto `[0, 1]`.
#[inline]
fn unit(v: f64) -> f64 {
    ((v + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// Hashes an integer position with a 32-bit seed.
///
/// Not spatially continuous: neighbouring cells get unrelated values.
#[inline]
#[must_use]
pub const fn hash_position(x: i64, y: i64, seed: u32) -> u32 {
    let mut h = seed;
    h ^= (x as u32).wrapping_mul(374_761_393);
    h ^= (y as u32).wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^ (h >> 16)
}

/// FNV-1a hash of a string, used to salt per-entry rolls.
#[must_use]
pub fn salt_of(id: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in id.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// The world's scalar fields.
///
/// Positions are world pixels; `scale` converts them to noise space, so a
/// smaller scale gives larger features.
pub struct NoiseField {
    seed: WorldSeed,
    hash_seed: u32,
    elevation: SimplexNoise,
    moisture: SimplexNoise,
    detail: SimplexNoise,
}

impl NoiseField {
    /// Builds the three independent noise layers for a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            seed,
            hash_seed: seed.fold32(),
            elevation: SimplexNoise::new(seed.derive(purpose::ELEVATION)),
            moisture: SimplexNoise::new(seed.derive(purpose::MOISTURE)),
            detail: SimplexNoise::new(seed.derive(purpose::DETAIL)),
        }
    }

    /// The seed this field was built from.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Elevation in `[0, 1]`: three octaves, weights 1, 0.5, 0.25.
    #[must_use]
    pub fn elevation(&self, x: f64, y: f64, scale: f64) -> f64 {
        unit(self.elevation.octaved(x * scale, y * scale, 3, 0.5, 2.0))
    }

    /// Moisture in `[0, 1]`: two octaves, weights 1, 0.5.
    #[must_use]
    pub fn moisture(&self, x: f64, y: f64, scale: f64) -> f64 {
        unit(self.moisture.octaved(x * scale, y * scale, 2, 0.5, 2.0))
    }

    /// Single-octave detail noise in `[0, 1]`.
    #[must_use]
    pub fn detail(&self, x: f64, y: f64, scale: f64) -> f64 {
        unit(self.detail.sample(x * scale, y * scale))
    }

    /// Uniform `[0, 1)` value for an integer position.
    #[inline]
    #[must_use]
    pub fn seeded_random(&self, x: i64, y: i64) -> f64 {
        to_unit(hash_position(x, y, self.hash_seed))
    }

    /// Like [`seeded_random`](Self::seeded_random) but decorrelated by `salt`.
    #[inline]
    #[must_use]
    pub fn seeded_random_salted(&self, x: i64, y: i64, salt: u32) -> f64 {
        to_unit(hash_position(x, y, self.hash_seed ^ salt))
    }
}

#[inline]
fn to_unit(h: u32) -> f64 {
    f64::from(h) / 4_294_967_296.0
}
