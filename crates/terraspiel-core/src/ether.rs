//! Ether drift: wandering motes that deepen the terrain they settle over.

use std::collections::HashMap;

use rand::Rng;
use rand::rngs::SmallRng;

use crate::cell::Cell;
use crate::element::{ElementId, ElementRegistry, Kinds};
use crate::grid::Buffer;
use crate::particle::Particle;
use crate::rules::RuleBook;

const JITTER: f32 = 0.075;
const SPEED_CAP: f32 = 0.5;

/// Hash of live ether particles bucketed by the integer cell they occupy.
/// Rebuilt from scratch every tick.
fn bucket(particles: &[Particle], ether: ElementId) -> HashMap<(i32, i32), Vec<usize>> {
    let mut hash: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
    for (index, particle) in particles.iter().enumerate() {
        if particle.element == ether && particle.alive() {
            hash.entry(particle.cell()).or_default().push(index);
        }
    }
    hash
}

/// Advances every ether particle and applies the deepening rules.
pub(crate) fn run(
    particles: &mut [Particle],
    buf: &mut Buffer,
    registry: &ElementRegistry,
    rules: &RuleBook,
    kinds: &Kinds,
    rng: &mut SmallRng,
) {
    let Some(ether) = kinds.ether else {
        return;
    };
    let hash = bucket(particles, ether);
    let width = buf.width() as f32;
    let height = buf.height() as f32;

    for index in 0..particles.len() {
        {
            let p = &mut particles[index];
            if p.element != ether || !p.alive() {
                continue;
            }

            p.vx = (p.vx + rng.random_range(-JITTER..JITTER)).clamp(-SPEED_CAP, SPEED_CAP);
            p.vy = (p.vy + rng.random_range(-JITTER..JITTER)).clamp(-SPEED_CAP, SPEED_CAP);
            p.x += p.vx;
            p.y += p.vy;

            // Soft bounce: invert and halve the offending component.
            if p.x < 0.0 {
                p.x = 0.0;
                p.vx = -p.vx * 0.5;
            } else if p.x >= width {
                p.x = width - 1e-3;
                p.vx = -p.vx * 0.5;
            }
            if p.y < 0.0 {
                p.y = 0.0;
                p.vy = -p.vy * 0.5;
            } else if p.y >= height {
                p.y = height - 1e-3;
                p.vy = -p.vy * 0.5;
            }
        }

        let (cx, cy) = particles[index].cell();
        if !buf.in_bounds(cx, cy) {
            continue;
        }
        let under = buf.cell(cx, cy);
        let Some(rule) = rules.ether_for(under.element).first().copied() else {
            continue;
        };
        if rng.random::<f64>() >= rule.probability {
            continue;
        }

        if Some(rule.to) == kinds.crystal {
            // Crystallisation gathers every other mote in the Moore block.
            let mut gathered: u8 = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if let Some(neighbours) = hash.get(&(cx + dx, cy + dy)) {
                        for &other in neighbours {
                            if other != index && particles[other].alive() {
                                particles[other].life = 0;
                                gathered += 1;
                            }
                        }
                    }
                }
            }
            let mut crystal = Cell::of(rule.to);
            crystal.ether_storage = gathered.saturating_add(1);
            buf.put(cx, cy, crystal, registry.pick_color(rule.to, rng));
        } else if Some(rule.to) == kinds.cloud {
            buf.put(cx, cy, Cell::cloud(rule.to, rng), registry.pick_color(rule.to, rng));
        } else {
            buf.put(cx, cy, Cell::of(rule.to), registry.pick_color(rule.to, rng));
        }
        particles[index].life = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementDef, ElementState, Rgb};
    use crate::rules::EtherRule;
    use rand::SeedableRng;

    fn world_parts() -> (ElementRegistry, Kinds, RuleBook) {
        let soil = ElementDef::named("SOIL", Rgb([122, 82, 48]), 1.5);
        let fertile = ElementDef::named("FERTILE_SOIL", Rgb([92, 64, 35]), 1.55);
        let sand = ElementDef::named("SAND", Rgb([216, 194, 122]), 1.6);
        let crystal = ElementDef::named("CRYSTAL", Rgb([143, 227, 224]), 2.0);
        let mut ether = ElementDef::named("ETHER", Rgb([179, 156, 240]), 0.01);
        ether.state = ElementState::Particle;
        let registry =
            ElementRegistry::from_defs(vec![soil, fertile, sand, crystal, ether]).expect("registry");
        let kinds = Kinds::resolve(&registry);
        let mut rules = RuleBook::new(registry.len());
        rules.push_ether(EtherRule {
            from: kinds.soil.unwrap(),
            to: kinds.fertile_soil.unwrap(),
            probability: 1.0,
        });
        rules.push_ether(EtherRule {
            from: kinds.sand.unwrap(),
            to: kinds.crystal.unwrap(),
            probability: 1.0,
        });
        (registry, kinds, rules)
    }

    fn mote(id: u64, x: f32, y: f32, ether: ElementId) -> Particle {
        Particle {
            id,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            element: ether,
            life: 150,
        }
    }

    #[test]
    fn a_mote_over_soil_deepens_it() {
        let (registry, kinds, rules) = world_parts();
        let mut rng = SmallRng::seed_from_u64(21);
        let mut buf = Buffer::new(3, 3);
        buf.put(1, 2, Cell::of(kinds.soil.unwrap()), Rgb([0, 0, 0]));
        let mut particles = vec![mote(1, 1.5, 2.5, kinds.ether.unwrap())];

        run(&mut particles, &mut buf, &registry, &rules, &kinds, &mut rng);

        assert_eq!(buf.cell(1, 2).element, kinds.fertile_soil.unwrap());
        assert_eq!(particles[0].life, 0, "the trigger mote is consumed");
    }

    #[test]
    fn crystallisation_gathers_the_moore_block() {
        let (registry, kinds, rules) = world_parts();
        let ether = kinds.ether.unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut buf = Buffer::new(3, 3);
        buf.put(1, 1, Cell::of(kinds.sand.unwrap()), Rgb([0, 0, 0]));

        let mut particles = vec![
            mote(1, 1.5, 1.5, ether),
            mote(2, 0.5, 0.5, ether),
            mote(3, 2.5, 1.5, ether),
        ];
        run(&mut particles, &mut buf, &registry, &rules, &kinds, &mut rng);

        let formed = buf.cell(1, 1);
        assert_eq!(Some(formed.element), kinds.crystal);
        assert_eq!(formed.ether_storage, 3, "two gathered plus the trigger");
        assert!(particles.iter().all(|p| !p.alive()));
    }

    #[test]
    fn walls_soften_the_bounce() {
        let (registry, kinds, rules) = world_parts();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut buf = Buffer::new(4, 4);
        let mut particles = vec![mote(1, 0.01, 2.0, kinds.ether.unwrap())];
        particles[0].vx = -0.5;

        run(&mut particles, &mut buf, &registry, &rules, &kinds, &mut rng);

        let p = &particles[0];
        assert!(p.alive(), "ether never dies on a wall");
        assert!(p.x >= 0.0);
        assert!(p.vx > 0.0, "bounce inverts the component");
        assert!(p.vx <= 0.3, "bounce halves the component");
    }
}
