//! Oil flows like any liquid but occasionally self-ignites.

use rand::Rng;

use crate::behavior::{PassCtx, granular};
use crate::cell::Cell;
use crate::element::ElementId;
use crate::particle::ParticleSeed;

const IGNITION_CHANCE: f64 = 0.001;

pub(crate) fn update(ctx: &mut PassCtx<'_>, x: i32, y: i32, cell: Cell) {
    if ctx.chance(IGNITION_CHANCE) {
        if let Some(fire) = ctx.kinds.fire {
            let vx = ctx.rng.random_range(-0.3..0.3);
            let vy = ctx.rng.random_range(-0.3..0.3);
            let life = ctx.rng.random_range(40..=60);
            ctx.emit(ParticleSeed {
                x: x as f32 + 0.5,
                y: y as f32 + 0.5,
                vx,
                vy,
                element: fire,
                life,
            });
            let soot = ctx.registry.base_color(ElementId::EMPTY);
            ctx.replace(x, y, Cell::empty(), soot);
            return;
        }
    }
    granular::update(ctx, x, y, cell, false);
}
