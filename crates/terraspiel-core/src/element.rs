//! Element definitions, interned ids, and the colour palette.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of colour variations precomputed per varying element.
pub const PALETTE_VARIANTS: usize = 10;

/// Interned handle for an element kind. Id 0 is always EMPTY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ElementId(pub u16);

impl ElementId {
    /// The always-present empty kind.
    pub const EMPTY: ElementId = ElementId(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Physical state of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    #[default]
    Solid,
    Liquid,
    Gas,
    Particle,
}

/// Flow parameters for moving elements. Both values live in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fluidity {
    /// Chance that a diagonal slide attempt is refused.
    pub resistance: f32,
    /// Chance per tick of a sideways spread attempt.
    pub spread: f32,
}

/// Packed RGB colour, serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Parses a `#RRGGBB` string.
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        let hex = text
            .strip_prefix('#')
            .ok_or_else(|| RegistryError::BadColor(text.to_owned()))?;
        if hex.len() != 6 {
            return Err(RegistryError::BadColor(text.to_owned()));
        }
        let value =
            u32::from_str_radix(hex, 16).map_err(|_| RegistryError::BadColor(text.to_owned()))?;
        Ok(Rgb([
            ((value >> 16) & 0xFF) as u8,
            ((value >> 8) & 0xFF) as u8,
            (value & 0xFF) as u8,
        ]))
    }

    /// Returns this colour with every channel scaled by `factor`.
    #[must_use]
    pub fn shaded(self, factor: f32) -> Rgb {
        let scale = |c: u8| ((f32::from(c) * factor).round().clamp(0.0, 255.0)) as u8;
        Rgb([scale(self.0[0]), scale(self.0[1]), scale(self.0[2])])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Rgb::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Immutable per-kind definition governing physics and presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDef {
    pub name: String,
    pub color: Rgb,
    pub density: f32,
    pub state: ElementState,
    pub fluidity: Option<Fluidity>,
    pub color_variation: bool,
    pub flammable: bool,
    pub is_static: bool,
    pub part_colors: HashMap<String, Rgb>,
}

impl ElementDef {
    /// Minimal definition: a non-moving solid with a flat colour.
    #[must_use]
    pub fn named(name: &str, color: Rgb, density: f32) -> Self {
        Self {
            name: name.to_owned(),
            color,
            density,
            state: ElementState::Solid,
            fluidity: None,
            color_variation: false,
            flammable: false,
            is_static: false,
            part_colors: HashMap::new(),
        }
    }

    #[must_use]
    pub fn is_liquid(&self) -> bool {
        self.state == ElementState::Liquid
    }
}

/// Errors raised while assembling an element registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unparseable colour {0:?}, expected #RRGGBB")]
    BadColor(String),
    #[error("duplicate element name {0:?}")]
    DuplicateName(String),
    #[error("element {0:?} has a negative density")]
    NegativeDensity(String),
    #[error("element {0:?} has fluidity outside [0, 1]")]
    BadFluidity(String),
}

fn empty_def() -> ElementDef {
    ElementDef {
        state: ElementState::Gas,
        ..ElementDef::named("EMPTY", Rgb([11, 14, 20]), 0.0)
    }
}

/// Read-only catalogue of element kinds plus the precomputed colour palette.
#[derive(Debug, Clone)]
pub struct ElementRegistry {
    defs: Vec<ElementDef>,
    by_name: HashMap<String, ElementId>,
    palette: Vec<Vec<Rgb>>,
}

impl ElementRegistry {
    /// Builds a registry from definitions. EMPTY is moved (or injected) to id 0.
    pub fn from_defs(defs: Vec<ElementDef>) -> Result<Self, RegistryError> {
        let mut ordered = Vec::with_capacity(defs.len() + 1);
        ordered.push(empty_def());
        for def in defs {
            if def.name == "EMPTY" {
                ordered[0] = def;
            } else {
                ordered.push(def);
            }
        }

        let mut by_name = HashMap::with_capacity(ordered.len());
        for (index, def) in ordered.iter().enumerate() {
            if def.density < 0.0 {
                return Err(RegistryError::NegativeDensity(def.name.clone()));
            }
            if let Some(fluidity) = def.fluidity {
                let in_unit = |v: f32| (0.0..=1.0).contains(&v);
                if !in_unit(fluidity.resistance) || !in_unit(fluidity.spread) {
                    return Err(RegistryError::BadFluidity(def.name.clone()));
                }
            }
            if by_name
                .insert(def.name.clone(), ElementId(index as u16))
                .is_some()
            {
                return Err(RegistryError::DuplicateName(def.name.clone()));
            }
        }

        let palette = ordered.iter().map(build_variants).collect();
        Ok(Self {
            defs: ordered,
            by_name,
            palette,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false // EMPTY is always present
    }

    /// Resolves an element name to its id.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<ElementId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn def(&self, id: ElementId) -> &ElementDef {
        &self.defs[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &ElementDef)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, def)| (ElementId(i as u16), def))
    }

    /// Base colour without variation.
    #[must_use]
    pub fn base_color(&self, id: ElementId) -> Rgb {
        self.defs[id.index()].color
    }

    /// Draws a palette colour: one of the precomputed variations when the
    /// element varies, the base colour otherwise.
    pub fn pick_color(&self, id: ElementId, rng: &mut SmallRng) -> Rgb {
        let variants = &self.palette[id.index()];
        variants[rng.random_range(0..variants.len())]
    }

    /// Named part colour (plant stems, leaves, ...), falling back to base.
    #[must_use]
    pub fn part_color(&self, id: ElementId, part: &str) -> Rgb {
        let def = &self.defs[id.index()];
        def.part_colors.get(part).copied().unwrap_or(def.color)
    }
}

fn build_variants(def: &ElementDef) -> Vec<Rgb> {
    if !def.color_variation {
        return vec![def.color];
    }
    (0..PALETTE_VARIANTS)
        .map(|step| {
            let factor = 0.85 + 0.03 * step as f32;
            def.color.shaded(factor)
        })
        .collect()
}

/// Ids of the element kinds the behaviours know by name. Absent kinds turn
/// the corresponding behaviour into a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kinds {
    pub water: Option<ElementId>,
    pub cloud: Option<ElementId>,
    pub ether: Option<ElementId>,
    pub thunder: Option<ElementId>,
    pub fire: Option<ElementId>,
    pub crystal: Option<ElementId>,
    pub ruby: Option<ElementId>,
    pub plant: Option<ElementId>,
    pub oil: Option<ElementId>,
    pub soil: Option<ElementId>,
    pub sand: Option<ElementId>,
    pub mud: Option<ElementId>,
    pub clay: Option<ElementId>,
    pub stone: Option<ElementId>,
    pub magma: Option<ElementId>,
    pub peat: Option<ElementId>,
    pub fertile_soil: Option<ElementId>,
    pub seed: Option<ElementId>,
}

impl Kinds {
    /// Resolves the well-known names against a registry.
    #[must_use]
    pub fn resolve(registry: &ElementRegistry) -> Self {
        Self {
            water: registry.id("WATER"),
            cloud: registry.id("CLOUD"),
            ether: registry.id("ETHER"),
            thunder: registry.id("THUNDER"),
            fire: registry.id("FIRE"),
            crystal: registry.id("CRYSTAL"),
            ruby: registry.id("RUBY"),
            plant: registry.id("PLANT"),
            oil: registry.id("OIL"),
            soil: registry.id("SOIL"),
            sand: registry.id("SAND"),
            mud: registry.id("MUD"),
            clay: registry.id("CLAY"),
            stone: registry.id("STONE"),
            magma: registry.id("MAGMA"),
            peat: registry.id("PEAT"),
            fertile_soil: registry.id("FERTILE_SOIL"),
            seed: registry.id("SEED"),
        }
    }
}
