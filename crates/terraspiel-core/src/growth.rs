//! Plant life cycle: growth while living, decay into withered debris, and
//! the slow slide from debris into oil.

use rand::Rng;
use rand::rngs::SmallRng;

use crate::cell::{Cell, PlantMode};
use crate::element::{ElementRegistry, Kinds};
use crate::grid::Buffer;

/// Growth counter value at which a stem tries to sprout.
const SPROUT_AT: u16 = 100;
const STEM_UP_CHANCE: f64 = 0.1;
const LEAF_CHANCE: f64 = 0.2;
const FLOWER_CHANCE: f64 = 0.05;
const COVER_SPREAD_CHANCE: f64 = 0.3;

/// Runs the plant pass in natural scan order over the working buffer.
pub(crate) fn run(buf: &mut Buffer, registry: &ElementRegistry, kinds: &Kinds, rng: &mut SmallRng) {
    let Some(plant) = kinds.plant else {
        return;
    };
    let oil = kinds.oil;
    let width = buf.width();
    let height = buf.height();

    for y in 0..height {
        for x in 0..width {
            let mut cell = buf.cell(x, y);
            if cell.element != plant {
                continue;
            }
            match cell.plant_mode {
                PlantMode::Stem | PlantMode::GroundCover => {
                    cell.decay += 1;
                    if cell.decay >= cell.decay_limit {
                        cell.plant_mode = PlantMode::Withered;
                        let faded = registry.part_color(plant, PlantMode::Withered.part_key());
                        buf.put(x, y, cell, faded);
                        continue;
                    }
                    if cell.plant_mode == PlantMode::Stem {
                        grow_stem(buf, registry, rng, &mut cell, x, y);
                    } else {
                        spread_cover(buf, registry, rng, x, y);
                    }
                    if let Some(slot) = buf.get_mut(x, y) {
                        *slot = cell;
                    }
                }
                PlantMode::Withered => {
                    cell.oil += 1;
                    if cell.oil >= cell.oil_limit {
                        if let Some(oil) = oil {
                            buf.put(x, y, Cell::of(oil), registry.base_color(oil));
                            continue;
                        }
                    }
                    if let Some(slot) = buf.get_mut(x, y) {
                        *slot = cell;
                    }
                }
                _ => {}
            }
        }
    }
}

fn grow_stem(
    buf: &mut Buffer,
    registry: &ElementRegistry,
    rng: &mut SmallRng,
    cell: &mut Cell,
    x: i32,
    y: i32,
) {
    let plant = cell.element;
    cell.counter += 1;
    if cell.counter < SPROUT_AT {
        return;
    }
    cell.counter = 0;

    if rng.random::<f64>() < STEM_UP_CHANCE && is_open(buf, x, y - 1) {
        let sprout = Cell::plant(plant, PlantMode::Stem, rng);
        buf.put(x, y - 1, sprout, registry.part_color(plant, "stem"));
    }

    for dx in [-1, 1] {
        if !is_open(buf, x + dx, y) {
            continue;
        }
        if rng.random::<f64>() < LEAF_CHANCE {
            let leaf = Cell::plant(plant, PlantMode::Leaf, rng);
            buf.put(x + dx, y, leaf, registry.part_color(plant, "leaf"));
        } else if rng.random::<f64>() < FLOWER_CHANCE {
            let flower = Cell::plant(plant, PlantMode::Flower, rng);
            buf.put(x + dx, y, flower, registry.part_color(plant, "flower"));
        }
    }
}

fn spread_cover(buf: &mut Buffer, registry: &ElementRegistry, rng: &mut SmallRng, x: i32, y: i32) {
    if rng.random::<f64>() >= COVER_SPREAD_CHANCE {
        return;
    }
    let plant = buf.cell(x, y).element;
    let order = if rng.random::<bool>() { [-1, 1] } else { [1, -1] };
    for dx in order {
        let (nx, ny) = (x + dx, y);
        // Cover creeps only over ground it can root on.
        let rooted = buf.get(nx, ny + 1).is_some_and(|below| !below.is_empty());
        if is_open(buf, nx, ny) && rooted {
            let shoot = Cell::plant(plant, PlantMode::GroundCover, rng);
            buf.put(nx, ny, shoot, registry.part_color(plant, "groundCover"));
            return;
        }
    }
}

fn is_open(buf: &Buffer, x: i32, y: i32) -> bool {
    buf.get(x, y).is_some_and(|cell| cell.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets;
    use rand::SeedableRng;

    #[test]
    fn living_plants_wither_at_their_horizon() {
        let registry = assets::default_elements().expect("elements");
        let kinds = Kinds::resolve(&registry);
        let plant = kinds.plant.expect("plant");
        let mut rng = SmallRng::seed_from_u64(2);

        let mut buf = Buffer::new(3, 3);
        let mut stem = Cell::plant(plant, PlantMode::Stem, &mut rng);
        stem.decay = stem.decay_limit - 1;
        buf.put(1, 2, stem, registry.base_color(plant));

        run(&mut buf, &registry, &kinds, &mut rng);
        assert_eq!(buf.cell(1, 2).plant_mode, PlantMode::Withered);
        assert_eq!(buf.cell(1, 2).element, plant);
    }

    #[test]
    fn withered_plants_turn_to_oil() {
        let registry = assets::default_elements().expect("elements");
        let kinds = Kinds::resolve(&registry);
        let plant = kinds.plant.expect("plant");
        let oil = kinds.oil.expect("oil");
        let mut rng = SmallRng::seed_from_u64(4);

        let mut buf = Buffer::new(3, 3);
        let mut husk = Cell::plant(plant, PlantMode::Withered, &mut rng);
        husk.oil = husk.oil_limit - 1;
        buf.put(1, 2, husk, registry.base_color(plant));

        run(&mut buf, &registry, &kinds, &mut rng);
        assert_eq!(buf.cell(1, 2).element, oil);
        assert_eq!(buf.cell(1, 2).counter, 0);
    }

    #[test]
    fn sprouting_resets_the_growth_counter() {
        let registry = assets::default_elements().expect("elements");
        let kinds = Kinds::resolve(&registry);
        let plant = kinds.plant.expect("plant");
        let mut rng = SmallRng::seed_from_u64(8);

        let mut buf = Buffer::new(3, 3);
        let mut stem = Cell::plant(plant, PlantMode::Stem, &mut rng);
        stem.counter = SPROUT_AT - 1;
        buf.put(1, 2, stem, registry.base_color(plant));

        run(&mut buf, &registry, &kinds, &mut rng);
        assert_eq!(buf.cell(1, 2).counter, 0);
        // Anything that sprouted landed in previously-empty neighbours.
        for (x, y) in [(0, 2), (2, 2), (1, 1)] {
            let neighbour = buf.cell(x, y);
            assert!(neighbour.is_empty() || neighbour.element == plant);
        }
    }

    #[test]
    fn leaves_appear_across_many_seeds() {
        let registry = assets::default_elements().expect("elements");
        let kinds = Kinds::resolve(&registry);
        let plant = kinds.plant.expect("plant");

        let mut sprouted = 0;
        for seed in 0..40 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut buf = Buffer::new(3, 3);
            let mut stem = Cell::plant(plant, PlantMode::Stem, &mut rng);
            stem.counter = SPROUT_AT - 1;
            buf.put(1, 2, stem, registry.base_color(plant));
            run(&mut buf, &registry, &kinds, &mut rng);
            let grew = [(0, 2), (2, 2), (1, 1)]
                .iter()
                .any(|&(x, y)| buf.cell(x, y).element == plant);
            if grew {
                sprouted += 1;
            }
        }
        assert!(sprouted > 0, "forty seeds without a single sprout");
    }
}
