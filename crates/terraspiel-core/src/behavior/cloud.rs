//! Cloud drift, rain, thunder charging, and decay.

use rand::Rng;

use crate::behavior::PassCtx;
use crate::cell::{Cell, LastMove};
use crate::element::ElementId;
use crate::grid::MOORE;
use crate::particle::ParticleSeed;

/// Chance per tick of an upward drift attempt.
const RISE_CHANCE: f64 = 0.7;
/// Chance per tick of a lateral drift attempt.
const DRIFT_CHANCE: f64 = 0.5;
/// Base chance of the rain/charge counters advancing in a tick.
const COUNTER_CHANCE: f64 = 0.5;
/// Chance of the decay counter advancing in a tick.
const DECAY_CHANCE: f64 = 0.02;
/// Decay penalty paid for each rainfall.
const RAIN_DECAY_COST: u16 = 10;

pub(crate) fn update(ctx: &mut PassCtx<'_>, x: i32, y: i32, mut cell: Cell) {
    // Clouds born through rewrites arrive with a zeroed bag; roll their
    // thresholds on first observation.
    if cell.rain_limit == 0 {
        let seeded = Cell::cloud(cell.element, ctx.rng);
        cell.rain_limit = seeded.rain_limit;
        cell.charge_limit = seeded.charge_limit;
        cell.decay_limit = seeded.decay_limit;
    }

    let crowded = MOORE.iter().any(|&(dx, dy)| {
        ctx.read
            .get(x + dx, y + dy)
            .is_some_and(|n| ctx.kinds.cloud == Some(n.element))
    });

    if ctx.chance(COUNTER_CHANCE) {
        cell.rain += 1;
    }
    if ctx.chance(COUNTER_CHANCE) {
        cell.charge += 1;
    }
    if crowded {
        cell.rain += 1;
        cell.charge += 1;
    }
    if ctx.chance(DECAY_CHANCE) {
        cell.decay += 1;
    }

    if cell.decay >= cell.decay_limit {
        let faded = ctx.registry.base_color(ElementId::EMPTY);
        ctx.replace(x, y, Cell::empty(), faded);
        return;
    }

    if cell.rain >= cell.rain_limit && ctx.free(x, y + 1) {
        if let Some(water) = ctx.kinds.water {
            let splash = ctx.registry.pick_color(water, ctx.rng);
            ctx.replace(x, y + 1, Cell::of(water), splash);
            cell.rain = 0;
            cell.decay += RAIN_DECAY_COST;
        }
    }

    if cell.charge >= cell.charge_limit {
        if let Some(thunder) = ctx.kinds.thunder {
            let vx = ctx.rng.random_range(-0.5..0.5);
            let vy = ctx.rng.random_range(2.0..4.0);
            ctx.emit(ParticleSeed {
                x: x as f32 + 0.5,
                y: y as f32 + 0.5,
                vx,
                vy,
                element: thunder,
                life: 60,
            });
            cell.charge = 0;
        }
    }

    // Rising vapour: straight up, through water, or up a diagonal.
    if ctx.chance(RISE_CHANCE) {
        let up = (x, y - 1);
        if ctx.free(up.0, up.1) {
            ctx.relocate((x, y), up, cell, LastMove::None);
            return;
        }
        if ctx.in_bounds(up.0, up.1)
            && !ctx.is_moved(up.0, up.1)
            && Some(ctx.cell(up.0, up.1).element) == ctx.kinds.water
        {
            ctx.swap_sink((x, y), up, cell);
            return;
        }
        let order = if ctx.scan_right { [1, -1] } else { [-1, 1] };
        for dx in order {
            if ctx.free(x + dx, y - 1) {
                let record = if dx < 0 {
                    LastMove::Left
                } else {
                    LastMove::Right
                };
                ctx.relocate((x, y), (x + dx, y - 1), cell, record);
                return;
            }
        }
    }

    if ctx.chance(DRIFT_CHANCE) {
        let order = if ctx.scan_right { [1, -1] } else { [-1, 1] };
        for dx in order {
            if ctx.free(x + dx, y) {
                let record = if dx < 0 {
                    LastMove::Left
                } else {
                    LastMove::Right
                };
                ctx.relocate((x, y), (x + dx, y), cell, record);
                return;
            }
        }
    }

    ctx.stay(x, y, cell);
}
