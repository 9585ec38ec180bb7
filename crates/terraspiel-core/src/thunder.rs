//! Thunder bolts: ballistic zig-zags that end in explosions.

use std::f32::consts::TAU;

use rand::Rng;
use rand::rngs::SmallRng;

use crate::cell::Cell;
use crate::element::{ElementId, ElementRegistry, Kinds};
use crate::grid::Buffer;
use crate::particle::{Particle, ParticleSeed};

const SWAY: f32 = 0.75;
const GRAVITY: f32 = 0.1;
const IGNITE_CHANCE: f64 = 0.5;
const SCATTER_LIFE: i32 = 100;

/// Elements an explosion may blast out of the grid as free particles.
pub(crate) fn scatter_table(registry: &ElementRegistry, kinds: &Kinds) -> Vec<bool> {
    let mut table = vec![false; registry.len()];
    let allowed = [
        kinds.soil,
        kinds.sand,
        kinds.water,
        kinds.mud,
        kinds.peat,
        kinds.fertile_soil,
        kinds.clay,
        kinds.fire,
        kinds.plant,
        kinds.seed,
        kinds.oil,
    ];
    for id in allowed.into_iter().flatten() {
        table[id.index()] = true;
    }
    table
}

/// Advances every thunder particle against the working buffer.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    particles: &mut [Particle],
    buf: &mut Buffer,
    registry: &ElementRegistry,
    kinds: &Kinds,
    scatter: &[bool],
    rng: &mut SmallRng,
    seeds: &mut Vec<ParticleSeed>,
) {
    let Some(thunder) = kinds.thunder else {
        return;
    };
    let width = buf.width() as f32;
    let height = buf.height() as f32;

    for index in 0..particles.len() {
        {
            let p = &mut particles[index];
            if p.element != thunder || !p.alive() {
                continue;
            }
            p.vx = (p.vx + rng.random_range(-SWAY..SWAY)).clamp(-2.0, 2.0);
            p.vy = (p.vy + GRAVITY).clamp(-1.0, 4.0);
            p.x += p.vx;
            p.y += p.vy;

            // Thunder grounds out on any wall.
            if p.x < 0.0 || p.x >= width || p.y < 0.0 || p.y >= height {
                p.life = 0;
                continue;
            }
        }

        let (cx, cy) = particles[index].cell();
        let under = buf.cell(cx, cy);
        if under.is_empty() {
            continue;
        }

        if Some(under.element) == kinds.water {
            let radius = rng.random_range(1..=2);
            explode(buf, registry, scatter, rng, seeds, cx, cy, radius);
            particles[index].life = 0;
            continue;
        }

        if registry.def(under.element).flammable && rng.random::<f64>() < IGNITE_CHANCE {
            if let Some(fire) = kinds.fire {
                let burning = Cell::fire(fire, rng.random_range(40..=60));
                buf.put(cx, cy, burning, registry.pick_color(fire, rng));
            }
            let radius = rng.random_range(1..=3);
            explode(buf, registry, scatter, rng, seeds, cx, cy, radius);
            particles[index].life = 0;
        }
    }
}

/// Blasts a circular hole: scatter-eligible cells inside the radius become
/// free particles thrown outward, with odds fading toward the rim.
#[allow(clippy::too_many_arguments)]
pub(crate) fn explode(
    buf: &mut Buffer,
    registry: &ElementRegistry,
    scatter: &[bool],
    rng: &mut SmallRng,
    seeds: &mut Vec<ParticleSeed>,
    cx: i32,
    cy: i32,
    radius: i32,
) {
    let r = radius as f32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            if d > r {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            let Some(cell) = buf.get(x, y) else {
                continue;
            };
            if !scatter[cell.element.index()] {
                continue;
            }
            let force = 1.0 - d / r;
            if rng.random::<f64>() >= f64::from(force) {
                continue;
            }

            let (ux, uy) = if d > 0.0 {
                (dx as f32 / d, dy as f32 / d)
            } else {
                let angle = rng.random_range(0.0..TAU);
                (angle.cos(), angle.sin())
            };
            seeds.push(ParticleSeed {
                x: x as f32 + 0.5,
                y: y as f32 + 0.5,
                vx: ux * force,
                vy: uy * force,
                element: cell.element,
                life: SCATTER_LIFE,
            });
            buf.put(x, y, Cell::empty(), registry.base_color(ElementId::EMPTY));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets;
    use rand::SeedableRng;

    #[test]
    fn thunder_dies_on_any_wall() {
        let registry = assets::default_elements().expect("elements");
        let kinds = Kinds::resolve(&registry);
        let scatter = scatter_table(&registry, &kinds);
        let mut rng = SmallRng::seed_from_u64(6);
        let mut buf = Buffer::new(5, 5);
        let mut seeds = Vec::new();

        let mut particles = vec![Particle {
            id: 1,
            x: 0.1,
            y: 2.0,
            vx: -2.0,
            vy: 0.0,
            element: kinds.thunder.expect("thunder"),
            life: 60,
        }];
        run(
            &mut particles,
            &mut buf,
            &registry,
            &kinds,
            &scatter,
            &mut rng,
            &mut seeds,
        );
        assert!(!particles[0].alive());
        assert!(seeds.is_empty());
    }

    #[test]
    fn explosions_scatter_from_the_centre_outward() {
        let registry = assets::default_elements().expect("elements");
        let kinds = Kinds::resolve(&registry);
        let scatter = scatter_table(&registry, &kinds);
        let water = kinds.water.expect("water");

        let mut total = 0usize;
        let mut max_single = 0usize;
        for seed in 0..5 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut seeds = Vec::new();
            let mut buf = Buffer::new(9, 9);
            for y in 0..9 {
                for x in 0..9 {
                    buf.put(x, y, Cell::of(water), registry.base_color(water));
                }
            }

            explode(&mut buf, &registry, &scatter, &mut rng, &mut seeds, 4, 4, 2);

            assert!(buf.cell(4, 4).is_empty(), "the centre always blows out");
            assert!(seeds.len() <= 13, "a radius-2 disc holds 13 cells");
            let holes = (0..81).filter(|&i| buf.cells[i].is_empty()).count();
            assert_eq!(holes, seeds.len(), "every hole became a particle");
            for seed in &seeds {
                let ox = seed.x - 4.5;
                let oy = seed.y - 4.5;
                assert!(
                    seed.vx * ox + seed.vy * oy >= -1e-5,
                    "scatter velocity points outward"
                );
                assert_eq!(seed.life, SCATTER_LIFE);
            }
            total += seeds.len();
            max_single = max_single.max(seeds.len());
        }
        assert!(total >= 5, "five blasts never scattering is broken");
        assert!(max_single >= 3, "at least one blast should throw a handful");
    }

    #[test]
    fn thunder_over_water_leaves_a_crater() {
        let registry = assets::default_elements().expect("elements");
        let kinds = Kinds::resolve(&registry);
        let scatter = scatter_table(&registry, &kinds);
        let water = kinds.water.expect("water");
        let mut rng = SmallRng::seed_from_u64(12);
        let mut seeds = Vec::new();

        let mut buf = Buffer::new(9, 9);
        for y in 0..9 {
            for x in 0..9 {
                buf.put(x, y, Cell::of(water), registry.base_color(water));
            }
        }
        let mut particles = vec![Particle {
            id: 1,
            x: 4.5,
            y: 4.0,
            vx: 0.0,
            vy: 0.0,
            element: kinds.thunder.expect("thunder"),
            life: 60,
        }];

        run(
            &mut particles,
            &mut buf,
            &registry,
            &kinds,
            &scatter,
            &mut rng,
            &mut seeds,
        );

        assert!(!particles[0].alive());
        assert!(!seeds.is_empty());
        assert!(seeds.len() <= 13);
        let holes = (0..81).filter(|&i| buf.cells[i].is_empty()).count();
        assert_eq!(holes, seeds.len());
    }
}
