//! World state and the tick scheduler.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::behavior::{BehaviorKind, PassCtx, run_movement};
use crate::cell::{Cell, PlantMode};
use crate::element::{ElementId, ElementRegistry, Kinds, Rgb};
use crate::fire::{self, Ignition};
use crate::grid::Buffer;
use crate::particle::{Particle, ParticleSeed};
use crate::rules::RuleBook;
use crate::{ether, growth, thunder, transform};

/// Errors surfaced by world construction and boundary operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("unknown element {0:?}")]
    UnknownElement(String),
}

/// Static world configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 96,
            rng_seed: None,
        }
    }
}

impl WorldConfig {
    fn validate(&self) -> Result<(), WorldError> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if (self.width as u64) * (self.height as u64) > 16_000_000 {
            return Err(WorldError::InvalidConfig("grid is unreasonably large"));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy when unset.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}

/// Per-kind census of cells and free particles, rebuilt from scratch after
/// every tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorldStats {
    cells: Vec<u64>,
    particles: Vec<u64>,
}

impl WorldStats {
    fn sized(elements: usize) -> Self {
        Self {
            cells: vec![0; elements],
            particles: vec![0; elements],
        }
    }

    #[must_use]
    pub fn cell_count(&self, id: ElementId) -> u64 {
        self.cells.get(id.index()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn particle_count(&self, id: ElementId) -> u64 {
        self.particles.get(id.index()).copied().unwrap_or(0)
    }

    /// Occupied cells, EMPTY excluded.
    #[must_use]
    pub fn occupied_cells(&self) -> u64 {
        self.cells.iter().skip(1).sum()
    }

    #[must_use]
    pub fn total_particles(&self) -> u64 {
        self.particles.iter().sum()
    }
}

/// Snapshot emitted after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub frame: u64,
    pub occupied_cells: u64,
    pub particles: u64,
}

/// Seeded terrain source consulted by [`World::randomize`].
pub trait TerrainGenerator {
    /// Produces `width * height` element ids in row-major order.
    fn generate(
        &self,
        seed: u64,
        width: u32,
        height: u32,
        registry: &ElementRegistry,
    ) -> Vec<ElementId>;
}

/// The simulation: double-buffered grid, free particles, and registries.
pub struct World {
    config: WorldConfig,
    registry: ElementRegistry,
    rules: RuleBook,
    kinds: Kinds,
    behaviors: Vec<BehaviorKind>,
    ignition: Vec<Option<Ignition>>,
    scatter: Vec<bool>,
    front: Buffer,
    back: Buffer,
    moved: Vec<bool>,
    touched: Vec<bool>,
    particles: Vec<Particle>,
    seeds: Vec<ParticleSeed>,
    next_particle_id: u64,
    frame: u64,
    rng: SmallRng,
    stats: WorldStats,
    terrain: Option<Box<dyn TerrainGenerator>>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("frame", &self.frame)
            .field("elements", &self.registry.len())
            .field("particles", &self.particles.len())
            .finish()
    }
}

impl World {
    /// Builds a world over the given registries.
    pub fn new(
        config: WorldConfig,
        registry: ElementRegistry,
        rules: RuleBook,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let kinds = Kinds::resolve(&registry);
        let behaviors = build_behaviors(&registry, &kinds);
        let ignition = fire::ignition_table(&registry, &kinds);
        let scatter = thunder::scatter_table(&registry, &kinds);
        let front = Buffer::new(config.width, config.height);
        let back = front.clone();
        let len = front.len();
        let rng = config.seeded_rng();
        let stats = WorldStats::sized(registry.len());
        debug!(
            width = config.width,
            height = config.height,
            elements = registry.len(),
            "world created"
        );
        Ok(Self {
            config,
            registry,
            rules,
            kinds,
            behaviors,
            ignition,
            scatter,
            front,
            back,
            moved: vec![false; len],
            touched: vec![false; len],
            particles: Vec::new(),
            seeds: Vec::new(),
            next_particle_id: 0,
            frame: 0,
            rng,
            stats,
            terrain: None,
        })
    }

    /// Attaches the terrain generator used by [`World::randomize`].
    #[must_use]
    pub fn with_terrain(mut self, terrain: Box<dyn TerrainGenerator>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    #[must_use]
    pub fn kinds(&self) -> &Kinds {
        &self.kinds
    }

    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.front.width()
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.front.height()
    }

    /// Renderer view: the current front buffer cells.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.front.cells
    }

    /// Renderer view: the current front buffer colours.
    #[must_use]
    pub fn colors(&self) -> &[Rgb] {
        &self.front.colors
    }

    /// Renderer view: the live particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[must_use]
    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }

    /// Reads one cell of the front buffer.
    #[must_use]
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.front.get(x, y)
    }

    /// Mutable access to a front-buffer cell, for tooling and tests.
    /// Only meaningful between ticks.
    pub fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.front.get_mut(x, y)
    }

    /// Places an element into an EMPTY cell, writing both buffers so the
    /// placement survives an in-flight tick. Occupied targets and
    /// out-of-bounds coordinates are silent no-ops.
    pub fn place(&mut self, x: i32, y: i32, element: &str) -> Result<bool, WorldError> {
        let id = self
            .registry
            .id(element)
            .ok_or_else(|| WorldError::UnknownElement(element.to_owned()))?;
        if !self.front.in_bounds(x, y) || !self.front.cell(x, y).is_empty() {
            return Ok(false);
        }
        let cell = self.birth_cell(id, x, y);
        let color = self.registry.pick_color(id, &mut self.rng);
        self.front.put(x, y, cell, color);
        self.back.put(x, y, cell, color);
        self.refresh_stats();
        Ok(true)
    }

    /// Injects a free particle, returning its id.
    pub fn spawn_particle(
        &mut self,
        element: ElementId,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        life: i32,
    ) -> u64 {
        let id = self.next_particle_id;
        self.next_particle_id += 1;
        self.particles.push(Particle {
            id,
            x,
            y,
            vx,
            vy,
            element,
            life,
        });
        self.refresh_stats();
        id
    }

    /// Resets both buffers and drops every particle.
    pub fn clear(&mut self) {
        let void = self.registry.base_color(ElementId::EMPTY);
        self.front.reset(void);
        self.back.reset(void);
        self.particles.clear();
        self.seeds.clear();
        self.refresh_stats();
        debug!("world cleared");
    }

    /// Clears, then asks the terrain generator to paint a fresh world.
    pub fn randomize(&mut self, seed: u64) {
        self.clear();
        let Some(terrain) = self.terrain.take() else {
            return;
        };
        let ids = terrain.generate(
            seed,
            self.config.width,
            self.config.height,
            &self.registry,
        );
        self.terrain = Some(terrain);

        let (width, height) = (self.width(), self.height());
        for y in 0..height {
            for x in 0..width {
                let Some(&id) = ids.get(self.front.idx(x, y)) else {
                    continue;
                };
                if id == ElementId::EMPTY {
                    continue;
                }
                let cell = self.birth_cell(id, x, y);
                let color = self.registry.pick_color(id, &mut self.rng);
                self.front.put(x, y, cell, color);
                self.back.put(x, y, cell, color);
            }
        }
        self.refresh_stats();
        debug!(seed, "world randomized");
    }

    /// Kind-aware cell construction: clouds and plants arrive with their
    /// thresholds rolled, fire with a lifetime.
    fn birth_cell(&mut self, id: ElementId, x: i32, y: i32) -> Cell {
        if Some(id) == self.kinds.cloud {
            Cell::cloud(id, &mut self.rng)
        } else if Some(id) == self.kinds.plant {
            let open_above = self
                .front
                .get(x, y - 1)
                .is_none_or(|above| above.is_empty());
            let mode = if open_above {
                PlantMode::GroundCover
            } else {
                PlantMode::Stem
            };
            Cell::plant(id, mode, &mut self.rng)
        } else if Some(id) == self.kinds.fire {
            Cell::fire(id, self.rng.random_range(40..=60))
        } else {
            Cell::of(id)
        }
    }

    /// Advances the world one tick through the fixed pass pipeline.
    pub fn tick(&mut self) -> TickSummary {
        let scan_right = self.frame % 2 == 0;
        self.moved.fill(false);
        self.touched.fill(false);

        // Pass 1: movement, read front -> write back.
        {
            let mut ctx = PassCtx {
                read: &self.front,
                write: &mut self.back,
                moved: &mut self.moved,
                touched: &mut self.touched,
                scan_right,
                registry: &self.registry,
                kinds: &self.kinds,
                behaviors: &self.behaviors,
                rng: &mut self.rng,
                seeds: &mut self.seeds,
            };
            run_movement(&mut ctx);
        }
        debug_assert!(
            self.touched.iter().all(|&t| t),
            "movement pass left holes in the write buffer"
        );

        // Pass 2: transformations on the working buffer.
        transform::run(
            &mut self.back,
            &self.registry,
            &self.rules,
            &self.kinds,
            &mut self.rng,
            &mut self.seeds,
            scan_right,
        );

        // Pass 3: plant growth and decay.
        growth::run(&mut self.back, &self.registry, &self.kinds, &mut self.rng);

        // Pass 4 onward works the particle list. Fire tracks its own
        // lifetime so burn-out lands on the right cell; everything else
        // ages here.
        for p in &mut self.particles {
            if Some(p.element) != self.kinds.fire {
                p.life -= 1;
            }
        }
        self.particles.retain(Particle::alive);

        ether::run(
            &mut self.particles,
            &mut self.back,
            &self.registry,
            &self.rules,
            &self.kinds,
            &mut self.rng,
        );
        self.particles.retain(Particle::alive);

        thunder::run(
            &mut self.particles,
            &mut self.back,
            &self.registry,
            &self.kinds,
            &self.scatter,
            &mut self.rng,
            &mut self.seeds,
        );
        self.particles.retain(Particle::alive);

        fire::run(
            &mut self.particles,
            &mut self.back,
            &self.registry,
            &self.kinds,
            &self.ignition,
            &mut self.rng,
            &mut self.seeds,
        );
        self.particles.retain(Particle::alive);

        // Publish: swap buffers, promote pending spawns, bump the clock.
        std::mem::swap(&mut self.front, &mut self.back);
        for seed in self.seeds.drain(..) {
            let id = self.next_particle_id;
            self.next_particle_id += 1;
            self.particles.push(seed.into_particle(id));
        }
        self.frame += 1;
        self.refresh_stats();

        TickSummary {
            frame: self.frame,
            occupied_cells: self.stats.occupied_cells(),
            particles: self.stats.total_particles(),
        }
    }

    fn refresh_stats(&mut self) {
        let mut stats = WorldStats::sized(self.registry.len());
        for cell in &self.front.cells {
            stats.cells[cell.element.index()] += 1;
        }
        for particle in &self.particles {
            stats.particles[particle.element.index()] += 1;
        }
        self.stats = stats;
    }
}

fn build_behaviors(registry: &ElementRegistry, kinds: &Kinds) -> Vec<BehaviorKind> {
    registry
        .iter()
        .map(|(id, def)| {
            if id == ElementId::EMPTY {
                BehaviorKind::Inert
            } else if Some(id) == kinds.cloud {
                BehaviorKind::Cloud
            } else if Some(id) == kinds.crystal {
                BehaviorKind::Crystal
            } else if Some(id) == kinds.plant {
                BehaviorKind::Plant
            } else if Some(id) == kinds.oil {
                BehaviorKind::Oil
            } else if Some(id) == kinds.fire {
                BehaviorKind::Fire
            } else if def.fluidity.is_some() && !def.is_static {
                BehaviorKind::Granular
            } else {
                BehaviorKind::Inert
            }
        })
        .collect()
}
