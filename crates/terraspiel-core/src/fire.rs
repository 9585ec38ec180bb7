//! Fire particles: quenching, ruby forging, ignition, and burn-down.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

use crate::cell::Cell;
use crate::element::{ElementId, ElementRegistry, Kinds};
use crate::grid::{Buffer, MOORE};
use crate::particle::{Particle, ParticleSeed};

/// What burning does to a kind it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ignition {
    /// Calcined into another kind.
    Becomes(ElementId),
    /// Replaced by EMPTY plus a fresh fire particle.
    Kindles,
}

const IGNITE_CHANCE: f64 = 0.15;
const SPREAD_CHANCE: f64 = 0.65;

/// Builds the burn outcome table over the registry.
pub(crate) fn ignition_table(registry: &ElementRegistry, kinds: &Kinds) -> Vec<Option<Ignition>> {
    let mut table = vec![None; registry.len()];
    let mut set = |from: Option<ElementId>, outcome: Option<Ignition>| {
        if let (Some(from), Some(outcome)) = (from, outcome) {
            table[from.index()] = Some(outcome);
        }
    };
    set(kinds.soil, kinds.sand.map(Ignition::Becomes));
    set(kinds.clay, kinds.stone.map(Ignition::Becomes));
    set(kinds.stone, kinds.magma.map(Ignition::Becomes));
    set(kinds.sand, kinds.magma.map(Ignition::Becomes));
    set(kinds.plant, Some(Ignition::Kindles));
    set(kinds.oil, Some(Ignition::Kindles));
    set(kinds.peat, Some(Ignition::Kindles));
    set(kinds.fertile_soil, Some(Ignition::Kindles));
    table
}

/// Advances every fire particle. Fire manages its own lifetime so that the
/// burn-out effect lands on the cell it expires over.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    particles: &mut [Particle],
    buf: &mut Buffer,
    registry: &ElementRegistry,
    kinds: &Kinds,
    table: &[Option<Ignition>],
    rng: &mut SmallRng,
    seeds: &mut Vec<ParticleSeed>,
) {
    let Some(fire) = kinds.fire else {
        return;
    };
    let width = buf.width() as f32;
    let height = buf.height() as f32;

    for index in 0..particles.len() {
        {
            let p = &mut particles[index];
            if p.element != fire || !p.alive() {
                continue;
            }
            p.life -= 1;
            // Embers drift with a slight lift.
            p.vy -= 0.02;
            p.x = (p.x + p.vx).clamp(0.0, width - 1e-3);
            p.y = (p.y + p.vy).clamp(0.0, height - 1e-3);
        }

        let (cx, cy) = particles[index].cell();

        // Crystals forged, water quenches.
        let mut quenched = false;
        for (dx, dy) in MOORE {
            let Some(neighbour) = buf.get(cx + dx, cy + dy) else {
                continue;
            };
            if Some(neighbour.element) == kinds.crystal {
                if let Some(ruby) = kinds.ruby {
                    let shine = registry.pick_color(ruby, rng);
                    buf.put(cx + dx, cy + dy, Cell::of(ruby), shine);
                }
                quenched = true;
                break;
            }
            if Some(neighbour.element) == kinds.water {
                quenched = true;
                break;
            }
        }
        if quenched {
            particles[index].life = 0;
            continue;
        }

        let under = buf.cell(cx, cy);
        if particles[index].alive()
            && registry.def(under.element).flammable
            && rng.random::<f64>() < IGNITE_CHANCE
        {
            let torched: Vec<(i32, i32)> = MOORE
                .iter()
                .map(|&(dx, dy)| (cx + dx, cy + dy))
                .filter(|&(nx, ny)| {
                    buf.get(nx, ny)
                        .is_some_and(|n| registry.def(n.element).flammable)
                })
                .collect();
            if let Some(&(nx, ny)) = torched.as_slice().choose(rng) {
                burn(buf, registry, kinds, table, rng, seeds, nx, ny);
            }
        }

        if !particles[index].alive() {
            burn(buf, registry, kinds, table, rng, seeds, cx, cy);
            if rng.random::<f64>() < SPREAD_CHANCE {
                let neighbours: Vec<(i32, i32)> = MOORE
                    .iter()
                    .map(|&(dx, dy)| (cx + dx, cy + dy))
                    .filter(|&(nx, ny)| {
                        buf.get(nx, ny)
                            .is_some_and(|n| registry.def(n.element).flammable)
                    })
                    .collect();
                if let Some(&(nx, ny)) = neighbours.as_slice().choose(rng) {
                    seeds.push(fire_seed(fire, nx, ny, rng));
                }
            }
        }
    }
}

/// Applies the ignition table to one cell.
fn burn(
    buf: &mut Buffer,
    registry: &ElementRegistry,
    kinds: &Kinds,
    table: &[Option<Ignition>],
    rng: &mut SmallRng,
    seeds: &mut Vec<ParticleSeed>,
    x: i32,
    y: i32,
) {
    let Some(cell) = buf.get(x, y) else {
        return;
    };
    match table[cell.element.index()] {
        Some(Ignition::Becomes(to)) => {
            buf.put(x, y, Cell::of(to), registry.pick_color(to, rng));
        }
        Some(Ignition::Kindles) => {
            buf.put(x, y, Cell::empty(), registry.base_color(ElementId::EMPTY));
            if let Some(fire) = kinds.fire {
                seeds.push(fire_seed(fire, x, y, rng));
            }
        }
        None => {}
    }
}

fn fire_seed(fire: ElementId, x: i32, y: i32, rng: &mut SmallRng) -> ParticleSeed {
    ParticleSeed {
        x: x as f32 + 0.5,
        y: y as f32 + 0.5,
        vx: rng.random_range(-0.2..0.2),
        vy: rng.random_range(-0.2..0.2),
        element: fire,
        life: rng.random_range(80..=120),
    }
}
