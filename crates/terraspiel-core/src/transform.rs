//! Rule matching pass: counters advance toward threshold-gated rewrites.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::cell::{Cell, PlantMode};
use crate::element::{ElementId, ElementRegistry, Kinds};
use crate::grid::{Buffer, MOORE};
use crate::particle::ParticleSeed;
use crate::rules::{RuleBook, TransformRule};

/// Chance per occupied cell of shedding a stray ether mote each tick.
const AMBIENT_ETHER_CHANCE: f64 = 0.001;
const SPAWN_LIFE: i32 = 150;

/// Runs the transformation pass over the working buffer, same scan order as
/// the movement pass. Spawned particles accumulate in `seeds`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    buf: &mut Buffer,
    registry: &ElementRegistry,
    rules: &RuleBook,
    kinds: &Kinds,
    rng: &mut SmallRng,
    seeds: &mut Vec<ParticleSeed>,
    scan_right: bool,
) {
    let width = buf.width();
    let height = buf.height();
    for y in (0..height).rev() {
        if scan_right {
            for x in 0..width {
                step(buf, registry, rules, kinds, rng, seeds, x, y);
            }
        } else {
            for x in (0..width).rev() {
                step(buf, registry, rules, kinds, rng, seeds, x, y);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn step(
    buf: &mut Buffer,
    registry: &ElementRegistry,
    rules: &RuleBook,
    kinds: &Kinds,
    rng: &mut SmallRng,
    seeds: &mut Vec<ParticleSeed>,
    x: i32,
    y: i32,
) {
    let cell = buf.cell(x, y);

    if !cell.is_empty() && rng.random::<f64>() < AMBIENT_ETHER_CHANCE {
        if let Some(ether) = kinds.ether {
            seeds.push(spawn_seed(ether, x, y, rng));
        }
    }

    let candidates = rules.transforms_for(cell.element);
    if candidates.is_empty() {
        return;
    }

    let selected = candidates
        .iter()
        .find(|rule| rule.conditions.iter().all(|c| c.holds(buf, registry, x, y)));

    let Some(rule) = selected else {
        // Conditions lapsed; progress does not survive.
        if cell.counter != 0 {
            if let Some(slot) = buf.get_mut(x, y) {
                slot.counter = 0;
            }
        }
        return;
    };

    if rng.random::<f64>() >= rule.probability {
        return;
    }

    let progressed = cell.counter + 1;
    if progressed < rule.threshold {
        if let Some(slot) = buf.get_mut(x, y) {
            slot.counter = progressed;
        }
        return;
    }

    commit(buf, registry, kinds, rng, seeds, rule, x, y);
}

fn commit(
    buf: &mut Buffer,
    registry: &ElementRegistry,
    kinds: &Kinds,
    rng: &mut SmallRng,
    seeds: &mut Vec<ParticleSeed>,
    rule: &TransformRule,
    x: i32,
    y: i32,
) {
    let reborn = birth_cell(buf, kinds, rng, rule.to, x, y);
    let color = if Some(rule.to) == kinds.plant {
        registry.part_color(rule.to, reborn.plant_mode.part_key())
    } else {
        registry.pick_color(rule.to, rng)
    };
    buf.put(x, y, reborn, color);

    if let Some(victim) = rule.consumes {
        let mut ring = MOORE;
        ring.shuffle(rng);
        for (dx, dy) in ring {
            let (nx, ny) = (x + dx, y + dy);
            if buf.get(nx, ny).is_some_and(|n| n.element == victim) {
                buf.put(nx, ny, Cell::empty(), registry.base_color(ElementId::EMPTY));
                break;
            }
        }
    }

    if let Some(kind) = rule.spawn_particle {
        seeds.push(spawn_seed(kind, x, y, rng));
    }
}

/// Builds the replacement cell, seeding kind-specific bags at birth.
fn birth_cell(
    buf: &Buffer,
    kinds: &Kinds,
    rng: &mut SmallRng,
    to: ElementId,
    x: i32,
    y: i32,
) -> Cell {
    if Some(to) == kinds.plant {
        let open_above = buf.get(x, y - 1).is_none_or(|above| above.is_empty());
        let mode = if open_above {
            PlantMode::GroundCover
        } else {
            PlantMode::Stem
        };
        Cell::plant(to, mode, rng)
    } else if Some(to) == kinds.cloud {
        Cell::cloud(to, rng)
    } else {
        Cell::of(to)
    }
}

fn spawn_seed(element: ElementId, x: i32, y: i32, rng: &mut SmallRng) -> ParticleSeed {
    ParticleSeed {
        x: x as f32 + 0.5,
        y: y as f32 + 0.5,
        vx: rng.random_range(-0.3..0.3),
        vy: rng.random_range(-0.3..0.3),
        element,
        life: SPAWN_LIFE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementDef, Rgb};
    use crate::rules::Condition;
    use rand::SeedableRng;

    fn registry() -> ElementRegistry {
        let soil = ElementDef::named("SOIL", Rgb([122, 82, 48]), 1.5);
        let mud = ElementDef::named("MUD", Rgb([78, 59, 36]), 1.4);
        let mut water = ElementDef::named("WATER", Rgb([61, 126, 219]), 1.0);
        water.state = crate::ElementState::Liquid;
        ElementRegistry::from_defs(vec![soil, mud, water]).expect("registry")
    }

    fn rule(registry: &ElementRegistry, probability: f64, threshold: u16) -> RuleBook {
        let soil = registry.id("SOIL").expect("soil");
        let mud = registry.id("MUD").expect("mud");
        let water = registry.id("WATER").expect("water");
        let mut book = RuleBook::new(registry.len());
        book.push_transform(TransformRule {
            from: soil,
            to: mud,
            probability,
            threshold,
            conditions: vec![Condition::Surrounding {
                of: water,
                min: 1,
                max: 8,
            }],
            consumes: Some(water),
            spawn_particle: None,
        });
        book
    }

    #[test]
    fn counter_climbs_then_commits_and_consumes() {
        let registry = registry();
        let soil = registry.id("SOIL").expect("soil");
        let mud = registry.id("MUD").expect("mud");
        let water = registry.id("WATER").expect("water");
        let book = rule(&registry, 1.0, 3);
        let kinds = Kinds::resolve(&registry);
        let mut rng = SmallRng::seed_from_u64(11);
        let mut seeds = Vec::new();

        let mut buf = Buffer::new(3, 3);
        buf.put(1, 1, Cell::of(soil), Rgb([0, 0, 0]));
        buf.put(0, 1, Cell::of(water), Rgb([0, 0, 0]));

        for _ in 0..2 {
            run(&mut buf, &registry, &book, &kinds, &mut rng, &mut seeds, true);
            assert_eq!(buf.cell(1, 1).element, soil);
        }
        assert_eq!(buf.cell(1, 1).counter, 2);

        run(&mut buf, &registry, &book, &kinds, &mut rng, &mut seeds, false);
        assert_eq!(buf.cell(1, 1).element, mud);
        assert_eq!(buf.cell(1, 1).counter, 0, "bag resets on rebirth");
        assert!(buf.cell(0, 1).is_empty(), "the neighbouring water is consumed");
    }

    #[test]
    fn lapsed_conditions_reset_progress() {
        let registry = registry();
        let soil = registry.id("SOIL").expect("soil");
        let water = registry.id("WATER").expect("water");
        let book = rule(&registry, 1.0, 10);
        let kinds = Kinds::resolve(&registry);
        let mut rng = SmallRng::seed_from_u64(5);
        let mut seeds = Vec::new();

        let mut buf = Buffer::new(3, 3);
        buf.put(1, 1, Cell::of(soil), Rgb([0, 0, 0]));
        buf.put(2, 1, Cell::of(water), Rgb([0, 0, 0]));

        run(&mut buf, &registry, &book, &kinds, &mut rng, &mut seeds, true);
        assert_eq!(buf.cell(1, 1).counter, 1);

        // Dry the neighbourhood; the counter must not persist.
        buf.put(2, 1, Cell::empty(), Rgb([0, 0, 0]));
        run(&mut buf, &registry, &book, &kinds, &mut rng, &mut seeds, false);
        assert_eq!(buf.cell(1, 1).counter, 0);
    }

    #[test]
    fn zero_probability_never_advances() {
        let registry = registry();
        let soil = registry.id("SOIL").expect("soil");
        let water = registry.id("WATER").expect("water");
        let book = rule(&registry, 0.0, 2);
        let kinds = Kinds::resolve(&registry);
        let mut rng = SmallRng::seed_from_u64(17);
        let mut seeds = Vec::new();

        let mut buf = Buffer::new(3, 3);
        buf.put(1, 1, Cell::of(soil), Rgb([0, 0, 0]));
        buf.put(0, 0, Cell::of(water), Rgb([0, 0, 0]));

        for _ in 0..20 {
            run(&mut buf, &registry, &book, &kinds, &mut rng, &mut seeds, true);
        }
        assert_eq!(buf.cell(1, 1).element, soil);
        assert_eq!(buf.cell(1, 1).counter, 0);
    }
}
