//! Terraspiel's simulation engine.
//!
//! A falling-sand world: a double-buffered grid of material cells plus a set
//! of free sub-cell particles, advanced one tick at a time through a fixed
//! six-pass pipeline (movement, transformations, plant growth, ether drift,
//! thunder, fire). Rendering, input, and the application shell live
//! elsewhere; this crate owns the state and the rules.
//!
//! ```
//! use terraspiel_core::{World, WorldConfig, assets};
//!
//! let registry = assets::default_elements().unwrap();
//! let rules = assets::default_rules(&registry).unwrap();
//! let config = WorldConfig { width: 32, height: 24, rng_seed: Some(7) };
//! let mut world = World::new(config, registry, rules).unwrap();
//! world.place(16, 0, "SAND").unwrap();
//! for _ in 0..8 {
//!     world.tick();
//! }
//! ```

pub mod assets;
mod behavior;
mod cell;
mod element;
mod ether;
mod fire;
mod grid;
mod growth;
mod particle;
mod rules;
mod thunder;
mod transform;
mod world;

pub use behavior::BehaviorKind;
pub use cell::{Cell, LastMove, PlantMode};
pub use element::{
    ElementDef, ElementId, ElementRegistry, ElementState, Fluidity, Kinds, PALETTE_VARIANTS,
    RegistryError, Rgb,
};
pub use grid::{Buffer, MOORE};
pub use particle::{Particle, ParticleSeed};
pub use rules::{AttributeProbe, Condition, EtherRule, RuleBook, TransformRule};
pub use world::{TerrainGenerator, TickSummary, World, WorldConfig, WorldError, WorldStats};
