//! Seeded terrain generation.
//!
//! Builds the opening state of a world: a noise-driven surface line over
//! biome-flavoured strata, water pooled into the depressions, caverns
//! carved through the deep rock, peat and crystal pockets, scattered
//! seeds on the surface, and a cloud band in the upper sky. A climate
//! noise pair assigns each column a biome, and the biome decides how the
//! column is built — how deep the topsoil runs, what the grains are made
//! of, how eager the caves are, how often pools and seeds appear. Every
//! decision derives from the seed passed in, so the same seed paints the
//! same world.

use noise::{NoiseFn, OpenSimplex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use terraspiel_core::{ElementId, ElementRegistry, Kinds, TerrainGenerator};

/// Climate regions a column can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Biome {
    /// Temperate ground: deep topsoil, frequent pools, plenty of seeds.
    Verdant,
    /// Hot and dry: sand-dominated strata, shallow rock, rare water.
    Dunes,
    /// Waterlogged lowland: mud and peat, clay bands, soggy caves.
    Mire,
}

impl Biome {
    /// Column climate from the temperature/moisture noise pair.
    fn select(temperature: f64, moisture: f64) -> Self {
        if temperature > 0.22 && moisture < -0.18 {
            Biome::Dunes
        } else if moisture > 0.3 {
            Biome::Mire
        } else {
            Biome::Verdant
        }
    }

    /// Rolls the parameters one column generates under.
    fn profile(self, rng: &mut SmallRng) -> BiomeProfile {
        match self {
            Biome::Verdant => BiomeProfile {
                biome: self,
                topsoil: rng.random_range(4..=7),
                rock_depth: rng.random_range(9..=14),
                pool_chance: 0.85,
                seed_scale: 1.5,
                cave_scale: 0.055,
                cave_band: 0.15,
                cave_gate: 0.05,
            },
            Biome::Dunes => BiomeProfile {
                biome: self,
                topsoil: rng.random_range(2..=4),
                rock_depth: rng.random_range(6..=10),
                pool_chance: 0.08,
                seed_scale: 0.25,
                cave_scale: 0.045,
                cave_band: 0.12,
                cave_gate: 0.02,
            },
            Biome::Mire => BiomeProfile {
                biome: self,
                topsoil: rng.random_range(5..=9),
                rock_depth: rng.random_range(12..=18),
                pool_chance: 1.0,
                seed_scale: 0.9,
                cave_scale: 0.065,
                cave_band: 0.13,
                cave_gate: 0.08,
            },
        }
    }
}

/// Per-column generation parameters, rolled fresh for every column the way
/// surface height is.
#[derive(Debug, Clone, Copy)]
struct BiomeProfile {
    biome: Biome,
    /// Rows of loose ground under the surface line.
    topsoil: i32,
    /// Depth at which the column turns to solid rock.
    rock_depth: i32,
    /// Odds a depression in this column floods into a pool.
    pool_chance: f64,
    /// Multiplier on the generator's base seed chance.
    seed_scale: f64,
    /// Primary cave-noise scale; larger values make busier caves.
    cave_scale: f64,
    /// Half-width of the primary noise band that carves.
    cave_band: f64,
    /// Region noise must exceed this for caves to open here at all.
    cave_gate: f64,
}

impl BiomeProfile {
    /// Picks the material for one underground cell.
    fn ground(
        &self,
        kinds: &Kinds,
        depth: i32,
        band: f64,
        pocket: f64,
        rng: &mut SmallRng,
    ) -> Option<ElementId> {
        match self.biome {
            Biome::Verdant => {
                if depth < self.topsoil {
                    kinds.soil
                } else if depth > 8 && pocket < -0.38 {
                    kinds.peat
                } else if depth > 10 && pocket > 0.48 {
                    kinds.crystal
                } else if band > 0.27 {
                    kinds.clay
                } else if depth > self.rock_depth {
                    kinds.stone
                } else {
                    kinds.soil
                }
            }
            Biome::Dunes => {
                if depth < self.topsoil {
                    kinds.sand
                } else if depth > 8 && pocket > 0.42 {
                    kinds.crystal
                } else if depth > self.rock_depth {
                    kinds.stone
                } else {
                    // Sand runs deep here; stone creeps in as it gets deeper.
                    let stony = (f64::from(depth) / 60.0).min(0.25);
                    if rng.random::<f64>() < stony {
                        kinds.stone
                    } else {
                        kinds.sand
                    }
                }
            }
            Biome::Mire => {
                if depth < self.topsoil {
                    if rng.random::<f64>() < 0.4 {
                        kinds.mud
                    } else {
                        kinds.soil
                    }
                } else if pocket < -0.22 {
                    kinds.peat
                } else if band > 0.12 {
                    kinds.clay
                } else if depth > self.rock_depth {
                    kinds.stone
                } else {
                    kinds.soil
                }
            }
        }
    }
}

/// Noise-based generator with the knobs worth turning.
#[derive(Debug, Clone)]
pub struct NoiseTerrain {
    /// Horizontal scale of the surface line; smaller is smoother.
    pub surface_scale: f64,
    /// Surface relief as a fraction of world height.
    pub relief: f64,
    /// Scale of the strata noise picking clay and stone bands.
    pub strata_scale: f64,
    /// Scale of the climate noise assigning biomes; smaller means broader
    /// regions.
    pub climate_scale: f64,
    /// Base chance of a seed landing on an exposed surface cell.
    pub seed_chance: f64,
    /// Cloud cover density in the sky band.
    pub cloud_cover: f64,
}

impl Default for NoiseTerrain {
    fn default() -> Self {
        Self {
            surface_scale: 0.03,
            relief: 0.16,
            strata_scale: 0.08,
            climate_scale: 0.012,
            seed_chance: 0.02,
            cloud_cover: 0.25,
        }
    }
}

impl NoiseTerrain {
    fn paint(
        &self,
        seed: u64,
        width: u32,
        height: u32,
        registry: &ElementRegistry,
    ) -> Vec<ElementId> {
        let kinds = Kinds::resolve(registry);
        let w = width as i32;
        let h = height as i32;
        let mut cells = vec![ElementId::EMPTY; (w * h) as usize];
        if w < 4 || h < 6 {
            return cells;
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        let surface_noise = OpenSimplex::new(rng.random());
        let strata_noise = OpenSimplex::new(rng.random());
        let pocket_noise = OpenSimplex::new(rng.random());
        let temperature_noise = OpenSimplex::new(rng.random());
        let moisture_noise = OpenSimplex::new(rng.random());
        let cave_noise = OpenSimplex::new(rng.random());
        let cave_region_noise = OpenSimplex::new(rng.random());
        let fluid_noise = OpenSimplex::new(rng.random());

        let base = f64::from(h) * 0.45;
        let amplitude = (f64::from(h) * self.relief).max(2.0);

        // Surface line and climate per column. Temperature and moisture are
        // horizontal fields, so biomes come in contiguous stretches.
        let mut surface = vec![0i32; w as usize];
        let mut profiles = Vec::with_capacity(w as usize);
        for x in 0..w {
            let wobble = surface_noise.get([f64::from(x) * self.surface_scale, 0.0]);
            let level = (base + wobble * amplitude).round() as i32;
            surface[x as usize] = level.clamp(2, h - 3);

            let temperature = temperature_noise.get([f64::from(x) * self.climate_scale, 0.0]);
            let moisture = moisture_noise.get([f64::from(x) * self.climate_scale, 50.0]);
            profiles.push(Biome::select(temperature, moisture).profile(&mut rng));
        }

        let at = |x: i32, y: i32| (y * w + x) as usize;

        // Strata, column by column, under the biome's profile.
        for x in 0..w {
            let top = surface[x as usize];
            let profile = profiles[x as usize];
            for y in top..h {
                let depth = y - top;
                let band = strata_noise
                    .get([f64::from(x) * self.strata_scale, f64::from(y) * self.strata_scale]);
                let pocket = pocket_noise.get([f64::from(x) * 0.11, f64::from(y) * 0.11]);
                if let Some(id) = profile.ground(&kinds, depth, band, pocket, &mut rng) {
                    cells[at(x, y)] = id;
                }
            }
        }

        // Water pools fill depressions below the waterline, where the
        // column's biome lets them.
        if let Some(water) = kinds.water {
            let waterline = (base + amplitude * 0.35).round() as i32;
            for x in 0..w {
                if surface[x as usize] <= waterline {
                    continue;
                }
                if rng.random::<f64>() >= profiles[x as usize].pool_chance {
                    continue;
                }
                for y in waterline..surface[x as usize] {
                    if y >= 0 && y < h {
                        cells[at(x, y)] = water;
                    }
                }
            }
        }

        // Cave carving: a narrow band of the primary noise opens a tunnel,
        // but only inside regions the gate noise marks as cavernous. The
        // deepest voids flood with the biome's fluid.
        for x in 0..w {
            let top = surface[x as usize];
            let profile = profiles[x as usize];
            for y in (top + profile.topsoil + 1)..(h - 1) {
                let primary = cave_noise
                    .get([f64::from(x) * profile.cave_scale, f64::from(y) * profile.cave_scale]);
                let region = cave_region_noise.get([f64::from(x) * 0.02, f64::from(y) * 0.02]);
                if region <= profile.cave_gate || primary.abs() >= profile.cave_band {
                    continue;
                }
                cells[at(x, y)] = ElementId::EMPTY;

                let fluid = fluid_noise.get([f64::from(x) * 0.07, f64::from(y) * 0.07]);
                match profile.biome {
                    Biome::Verdant | Biome::Mire => {
                        if y > top + profile.rock_depth + 6 && fluid > 0.55 {
                            if let Some(water) = kinds.water {
                                cells[at(x, y)] = water;
                            }
                        }
                    }
                    Biome::Dunes => {
                        if y > top + profile.rock_depth + 12 && fluid > 0.6 {
                            if let Some(magma) = kinds.magma {
                                cells[at(x, y)] = magma;
                            }
                        }
                    }
                }
            }
        }

        // Seeds sprinkled on exposed ground, as thickly as the biome likes.
        if let Some(seed_kind) = kinds.seed {
            for x in 0..w {
                let top = surface[x as usize];
                let chance = self.seed_chance * profiles[x as usize].seed_scale;
                if top > 0
                    && cells[at(x, top - 1)] == ElementId::EMPTY
                    && cells[at(x, top)] != ElementId::EMPTY
                    && rng.random::<f64>() < chance
                {
                    cells[at(x, top - 1)] = seed_kind;
                }
            }
        }

        // A cloud band drifts through the upper sky.
        if let Some(cloud) = kinds.cloud {
            let band = (h / 6).max(2);
            for y in 1..band {
                for x in 0..w {
                    let drift = pocket_noise.get([f64::from(x) * 0.05, f64::from(y) * 0.3 + 40.0]);
                    if drift > 0.3 && rng.random::<f64>() < self.cloud_cover {
                        cells[at(x, y)] = cloud;
                    }
                }
            }
        }

        debug!(seed, width, height, "terrain painted");
        cells
    }
}

impl TerrainGenerator for NoiseTerrain {
    fn generate(
        &self,
        seed: u64,
        width: u32,
        height: u32,
        registry: &ElementRegistry,
    ) -> Vec<ElementId> {
        self.paint(seed, width, height, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraspiel_core::assets;

    fn registry() -> ElementRegistry {
        assets::default_elements().expect("elements")
    }

    #[test]
    fn same_seed_paints_the_same_world() {
        let registry = registry();
        let terrain = NoiseTerrain::default();
        let a = terrain.generate(99, 64, 48, &registry);
        let b = terrain.generate(99, 64, 48, &registry);
        assert_eq!(a, b);

        let c = terrain.generate(100, 64, 48, &registry);
        assert_ne!(a, c, "different seeds should differ");
    }

    #[test]
    fn climate_thresholds_pick_the_expected_biomes() {
        assert_eq!(Biome::select(0.5, -0.5), Biome::Dunes);
        assert_eq!(Biome::select(0.5, 0.0), Biome::Verdant);
        assert_eq!(Biome::select(0.0, 0.5), Biome::Mire);
        assert_eq!(Biome::select(0.0, 0.0), Biome::Verdant);
        assert_eq!(Biome::select(-0.4, -0.4), Biome::Verdant);
    }

    #[test]
    fn output_covers_the_grid_with_ground_below_sky() {
        let registry = registry();
        let kinds = Kinds::resolve(&registry);
        let terrain = NoiseTerrain::default();
        let cells = terrain.generate(7, 64, 48, &registry);
        assert_eq!(cells.len(), 64 * 48);

        let loose = [kinds.soil, kinds.sand, kinds.mud];
        let loose_count = cells
            .iter()
            .filter(|&&id| loose.contains(&Some(id)))
            .count();
        let stone = kinds.stone.expect("stone");
        let stone_count = cells.iter().filter(|&&id| id == stone).count();
        assert!(loose_count > 100, "a world needs topsoil, got {loose_count}");
        assert!(stone_count > 50, "a world needs bedrock, got {stone_count}");

        // The very top row stays open sky or cloud.
        let cloud = kinds.cloud;
        for x in 0..64usize {
            let id = cells[x];
            assert!(id == ElementId::EMPTY || Some(id) == cloud);
        }
    }

    #[test]
    fn caves_open_voids_under_the_ground() {
        let registry = registry();
        let terrain = NoiseTerrain::default();

        // An underground void is an empty cell, deep in the world, with
        // material sitting directly above it.
        let mut best = 0usize;
        for seed in 0..4 {
            let cells = terrain.generate(seed, 96, 64, &registry);
            let voids = (0..96i32)
                .flat_map(|x| (33..63i32).map(move |y| (x, y)))
                .filter(|&(x, y)| {
                    cells[(y * 96 + x) as usize] == ElementId::EMPTY
                        && cells[((y - 1) * 96 + x) as usize] != ElementId::EMPTY
                })
                .count();
            best = best.max(voids);
        }
        assert!(best >= 10, "no world grew a cave system, best {best}");
    }

    #[test]
    fn wide_worlds_span_more_than_one_biome() {
        let registry = registry();
        let kinds = Kinds::resolve(&registry);
        let terrain = NoiseTerrain::default();
        let soil = kinds.soil.expect("soil");
        let sand = kinds.sand.expect("sand");
        let mud = kinds.mud.expect("mud");

        // Classify each column by its uppermost ground material; across a
        // handful of wide worlds at least one should mix biomes.
        let mut mixed = false;
        for seed in 0..8 {
            let cells = terrain.generate(seed, 512, 48, &registry);
            let mut tops = std::collections::HashSet::new();
            for x in 0..512i32 {
                for y in 0..48i32 {
                    let id = cells[(y * 512 + x) as usize];
                    if id == soil || id == sand || id == mud {
                        tops.insert(id);
                        break;
                    }
                }
            }
            if tops.len() > 1 {
                mixed = true;
                break;
            }
        }
        assert!(mixed, "eight wide worlds without a biome boundary");
    }

    #[test]
    fn clouds_keep_to_the_sky_band() {
        let registry = registry();
        let kinds = Kinds::resolve(&registry);
        let Some(cloud) = kinds.cloud else {
            return;
        };
        let terrain = NoiseTerrain::default();
        let cells = terrain.generate(21, 64, 60, &registry);
        for (index, &id) in cells.iter().enumerate() {
            if id == cloud {
                let y = index / 64;
                assert!(y < 10, "cloud at row {y} is below the band");
            }
        }
    }

    #[test]
    fn degenerate_grids_come_back_empty() {
        let registry = registry();
        let terrain = NoiseTerrain::default();
        let cells = terrain.generate(5, 2, 3, &registry);
        assert!(cells.iter().all(|&id| id == ElementId::EMPTY));
    }
}
