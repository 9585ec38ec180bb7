//! Free-floating sub-cell particles.

use serde::{Deserialize, Serialize};

use crate::element::ElementId;

/// A free particle: continuous position and velocity over the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Strictly monotonic within a world's lifetime; never reused.
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub element: ElementId,
    /// Remaining ticks; the particle dies at zero or below.
    pub life: i32,
}

impl Particle {
    /// Integer cell the particle currently occupies.
    #[must_use]
    pub fn cell(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    #[must_use]
    pub fn alive(&self) -> bool {
        self.life > 0
    }
}

/// A particle spawned mid-tick, waiting for the scheduler to assign its id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSeed {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub element: ElementId,
    pub life: i32,
}

impl ParticleSeed {
    /// Promotes the seed into a live particle under the given id.
    #[must_use]
    pub fn into_particle(self, id: u64) -> Particle {
        Particle {
            id,
            x: self.x,
            y: self.y,
            vx: self.vx,
            vy: self.vy,
            element: self.element,
            life: self.life,
        }
    }
}
