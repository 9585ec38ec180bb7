//! Crystals seep ether and eventually dissolve.

use rand::Rng;
use std::f32::consts::TAU;

use crate::behavior::{PassCtx, granular};
use crate::cell::Cell;
use crate::element::ElementId;
use crate::particle::ParticleSeed;

const EMISSION_CHANCE: f64 = 0.001;
const EMISSION_SPEED: f32 = 0.3;
const EMISSION_LIFE: i32 = 150;
/// Odds an emission actually drains the stored ether.
const DRAIN_CHANCE: f64 = 0.95;

pub(crate) fn update(ctx: &mut PassCtx<'_>, x: i32, y: i32, mut cell: Cell) {
    if cell.ether_storage == 0 {
        cell.ether_storage = ctx.rng.random_range(5..15);
    }

    if ctx.chance(EMISSION_CHANCE) {
        if let Some(ether) = ctx.kinds.ether {
            let angle = ctx.rng.random_range(0.0..TAU);
            ctx.emit(ParticleSeed {
                x: x as f32 + 0.5,
                y: y as f32 + 0.5,
                vx: angle.cos() * EMISSION_SPEED,
                vy: angle.sin() * EMISSION_SPEED,
                element: ether,
                life: EMISSION_LIFE,
            });
            if ctx.chance(DRAIN_CHANCE) {
                cell.ether_storage -= 1;
            }
            if cell.ether_storage == 0 {
                let gone = ctx.registry.base_color(ElementId::EMPTY);
                ctx.replace(x, y, Cell::empty(), gone);
                return;
            }
        }
    }

    // Crystals still obey gravity.
    if !granular::fall_chained(ctx, x, y, cell) {
        ctx.stay(x, y, cell);
    }
}
