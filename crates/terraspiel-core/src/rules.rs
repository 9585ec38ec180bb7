//! Resolved transformation and particle-interaction rules.

use crate::element::{ElementId, ElementRegistry, ElementState};
use crate::grid::{Buffer, MOORE};

/// Element-definition probe used by attribute conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeProbe {
    State(ElementState),
    Flammable(bool),
    Static(bool),
}

impl AttributeProbe {
    fn matches(self, registry: &ElementRegistry, id: ElementId) -> bool {
        let def = registry.def(id);
        match self {
            AttributeProbe::State(state) => def.state == state,
            AttributeProbe::Flammable(value) => def.flammable == value,
            AttributeProbe::Static(value) => def.is_static == value,
        }
    }
}

/// A single gating condition on a transformation rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Moore-neighbourhood count of a specific kind, bounded inclusive.
    Surrounding { of: ElementId, min: u8, max: u8 },
    /// Presence (or absence) of a kind anywhere within a Chebyshev radius.
    Environment {
        of: ElementId,
        radius: u8,
        present: bool,
    },
    /// Moore-neighbourhood count of cells whose definition matches a probe.
    SurroundingAttribute {
        probe: AttributeProbe,
        min: u8,
        max: u8,
    },
}

impl Condition {
    /// Evaluates the condition on the current grid around `(x, y)`.
    pub fn holds(&self, buf: &Buffer, registry: &ElementRegistry, x: i32, y: i32) -> bool {
        match *self {
            Condition::Surrounding { of, min, max } => {
                let count = MOORE
                    .iter()
                    .filter_map(|&(dx, dy)| buf.get(x + dx, y + dy))
                    .filter(|cell| cell.element == of)
                    .count() as u8;
                count >= min && count <= max
            }
            Condition::Environment {
                of,
                radius,
                present,
            } => {
                let r = i32::from(radius);
                let mut found = false;
                'scan: for dy in -r..=r {
                    for dx in -r..=r {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        if let Some(cell) = buf.get(x + dx, y + dy) {
                            if cell.element == of {
                                found = true;
                                break 'scan;
                            }
                        }
                    }
                }
                found == present
            }
            Condition::SurroundingAttribute { probe, min, max } => {
                let count = MOORE
                    .iter()
                    .filter_map(|&(dx, dy)| buf.get(x + dx, y + dy))
                    .filter(|cell| probe.matches(registry, cell.element))
                    .count() as u8;
                count >= min && count <= max
            }
        }
    }
}

/// Counter-driven rewrite of one cell kind into another.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRule {
    pub from: ElementId,
    pub to: ElementId,
    pub probability: f64,
    pub threshold: u16,
    pub conditions: Vec<Condition>,
    /// Kind consumed from the Moore neighbourhood on commit.
    pub consumes: Option<ElementId>,
    /// Particle kind emitted from the cell centre on commit.
    pub spawn_particle: Option<ElementId>,
}

/// Ether-drift interaction: a particle over `from` may rewrite it to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtherRule {
    pub from: ElementId,
    pub to: ElementId,
    pub probability: f64,
}

/// All rules, bucketed by source kind for O(1) per-cell lookup.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    transforms: Vec<Vec<TransformRule>>,
    ether: Vec<Vec<EtherRule>>,
}

impl RuleBook {
    /// An empty book sized for `elements` kinds.
    #[must_use]
    pub fn new(elements: usize) -> Self {
        Self {
            transforms: vec![Vec::new(); elements],
            ether: vec![Vec::new(); elements],
        }
    }

    /// Appends a transformation rule, preserving asset order.
    pub fn push_transform(&mut self, rule: TransformRule) {
        self.transforms[rule.from.index()].push(rule);
    }

    /// Appends an ether interaction rule.
    pub fn push_ether(&mut self, rule: EtherRule) {
        self.ether[rule.from.index()].push(rule);
    }

    #[must_use]
    pub fn transforms_for(&self, from: ElementId) -> &[TransformRule] {
        self.transforms
            .get(from.index())
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn ether_for(&self, from: ElementId) -> &[EtherRule] {
        self.ether.get(from.index()).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transforms.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn ether_count(&self) -> usize {
        self.ether.iter().map(Vec::len).sum()
    }
}
