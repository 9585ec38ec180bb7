//! Grid cells and their per-kind scalar bags.

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::element::ElementId;

/// Role a plant cell plays inside a larger organism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantMode {
    #[default]
    None,
    Stem,
    GroundCover,
    Leaf,
    Flower,
    Withered,
}

impl PlantMode {
    /// Stems and ground cover age; leaves and flowers ride along.
    #[must_use]
    pub fn is_living(self) -> bool {
        matches!(self, PlantMode::Stem | PlantMode::GroundCover)
    }

    /// Palette key inside an element's part colours.
    #[must_use]
    pub fn part_key(self) -> &'static str {
        match self {
            PlantMode::Stem | PlantMode::None => "stem",
            PlantMode::GroundCover => "groundCover",
            PlantMode::Leaf => "leaf",
            PlantMode::Flower => "flower",
            PlantMode::Withered => "withered",
        }
    }
}

/// Direction a cell last moved, consulted to keep grains rolling the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastMove {
    #[default]
    None,
    Down,
    DownLeft,
    DownRight,
    Left,
    Right,
}

/// One grid position: an element kind plus the scalars its behaviours use.
///
/// The unused fields of foreign kinds stay zero; a type change rebuilds the
/// whole bag, which is what resets `counter` and `burning`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub element: ElementId,
    /// Rule progress, or stem growth for plants.
    pub counter: u16,
    pub burning: u16,
    /// Remaining frames for fire cells.
    pub life: u16,
    pub rain: u16,
    pub rain_limit: u16,
    pub charge: u16,
    pub charge_limit: u16,
    pub decay: u16,
    pub decay_limit: u16,
    pub oil: u16,
    pub oil_limit: u16,
    pub plant_mode: PlantMode,
    pub ether_storage: u8,
}

impl Cell {
    #[must_use]
    pub fn empty() -> Self {
        Cell::default()
    }

    /// A fresh cell of `element` with a zeroed bag.
    #[must_use]
    pub fn of(element: ElementId) -> Self {
        Cell {
            element,
            ..Cell::default()
        }
    }

    /// A cloud with its rain/charge thresholds randomised at birth.
    pub fn cloud(element: ElementId, rng: &mut SmallRng) -> Self {
        Cell {
            element,
            rain_limit: rng.random_range(80..=120),
            charge_limit: rng.random_range(600..=1000),
            decay_limit: 100,
            ..Cell::default()
        }
    }

    /// A plant cell in the given mode, with decay and oil horizons rolled
    /// once and fixed for its lifetime.
    pub fn plant(element: ElementId, mode: PlantMode, rng: &mut SmallRng) -> Self {
        let wobble = |base: f32, rng: &mut SmallRng| {
            (base * (0.8 + 0.4 * rng.random::<f32>())).round() as u16
        };
        Cell {
            element,
            plant_mode: mode,
            decay_limit: wobble(500.0, rng),
            oil_limit: wobble(2000.0, rng),
            ..Cell::default()
        }
    }

    /// A burning cell with a bounded lifetime.
    #[must_use]
    pub fn fire(element: ElementId, life: u16) -> Self {
        Cell {
            element,
            life,
            ..Cell::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.element == ElementId::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn default_cell_is_empty() {
        let cell = Cell::empty();
        assert!(cell.is_empty());
        assert_eq!(cell.counter, 0);
        assert_eq!(cell.plant_mode, PlantMode::None);
    }

    #[test]
    fn cloud_thresholds_land_in_band() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..200 {
            let cloud = Cell::cloud(ElementId(5), &mut rng);
            assert!((80..=120).contains(&cloud.rain_limit));
            assert!((600..=1000).contains(&cloud.charge_limit));
            assert_eq!(cloud.decay_limit, 100);
        }
    }

    #[test]
    fn plant_horizons_follow_the_wobble() {
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..200 {
            let plant = Cell::plant(ElementId(4), PlantMode::Stem, &mut rng);
            assert!((400..=600).contains(&plant.decay_limit));
            assert!((1600..=2400).contains(&plant.oil_limit));
            assert!(plant.plant_mode.is_living());
        }
        let cover = Cell::plant(ElementId(4), PlantMode::GroundCover, &mut rng);
        assert!(cover.plant_mode.is_living());
        assert!(!PlantMode::Withered.is_living());
    }

    #[test]
    fn rebuilding_the_bag_clears_counters() {
        let mut cell = Cell::of(ElementId(2));
        cell.counter = 17;
        cell.burning = 3;
        let changed = Cell::of(ElementId(6));
        assert_eq!(changed.counter, 0);
        assert_eq!(changed.burning, 0);
    }
}
