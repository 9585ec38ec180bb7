//! JSON asset pack loading: the element registry and the rule registry.
//!
//! Malformed documents and missing required fields are fatal at load time.
//! Rules that name elements absent from the registry are dropped with a
//! diagnostic instead of failing the whole pack.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::element::{
    ElementDef, ElementId, ElementRegistry, ElementState, Fluidity, RegistryError, Rgb,
};
use crate::rules::{AttributeProbe, Condition, EtherRule, RuleBook, TransformRule};

/// Errors raised while loading an asset pack.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("malformed asset document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid asset: {0}")]
    InvalidAsset(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    name: String,
    color: Rgb,
    density: f32,
    #[serde(default)]
    state: ElementState,
    #[serde(default)]
    fluidity: Option<Fluidity>,
    #[serde(default)]
    has_color_variation: bool,
    #[serde(default)]
    is_flammable: bool,
    #[serde(default)]
    is_static: bool,
    #[serde(default)]
    part_colors: HashMap<String, Rgb>,
}

/// Parses the element registry document.
pub fn load_elements(json: &str) -> Result<ElementRegistry, AssetError> {
    let raw: Vec<RawElement> = serde_json::from_str(json)?;
    let mut defs = Vec::with_capacity(raw.len());
    for element in raw {
        if element.name.is_empty() {
            return Err(AssetError::InvalidAsset("element with empty name".into()));
        }
        defs.push(ElementDef {
            name: element.name,
            color: element.color,
            density: element.density,
            state: element.state,
            fluidity: element.fluidity,
            color_variation: element.has_color_variation,
            flammable: element.is_flammable,
            is_static: element.is_static,
            part_colors: element.part_colors,
        });
    }
    Ok(ElementRegistry::from_defs(defs)?)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RawCondition {
    #[serde(rename_all = "camelCase")]
    Surrounding { element: String, min: u8, max: u8 },
    #[serde(rename_all = "camelCase")]
    Environment {
        element: String,
        radius: u8,
        present: bool,
    },
    #[serde(rename_all = "camelCase")]
    SurroundingAttribute {
        attribute: String,
        value: Value,
        min: u8,
        max: u8,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransform {
    from: String,
    to: String,
    probability: f64,
    threshold: u16,
    #[serde(default)]
    conditions: Vec<RawCondition>,
    #[serde(default)]
    consumes: Option<String>,
    #[serde(default)]
    spawn_particle: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInteraction {
    particle: String,
    from: String,
    to: String,
    probability: f64,
}

/// Parses the rule registry document against an already-loaded element
/// registry. Returns the rule book and the number of rules dropped because
/// they named unknown elements.
pub fn load_rules(json: &str, registry: &ElementRegistry) -> Result<(RuleBook, usize), AssetError> {
    let raw: Vec<Value> = serde_json::from_str(json)?;
    let mut book = RuleBook::new(registry.len());
    let mut dropped = 0usize;

    for entry in raw {
        let is_interaction = entry
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| kind == "particle_interaction");
        if is_interaction {
            let rule: RawInteraction = serde_json::from_value(entry)?;
            match resolve_interaction(&rule, registry)? {
                Some(resolved) => book.push_ether(resolved),
                None => dropped += 1,
            }
        } else {
            let rule: RawTransform = serde_json::from_value(entry)?;
            match resolve_transform(&rule, registry)? {
                Some(resolved) => book.push_transform(resolved),
                None => dropped += 1,
            }
        }
    }

    if dropped > 0 {
        warn!(dropped, "dropped rules naming unknown elements");
    }
    Ok((book, dropped))
}

fn lookup(registry: &ElementRegistry, name: &str, role: &str) -> Option<ElementId> {
    let id = registry.id(name);
    if id.is_none() {
        warn!(element = name, role, "rule names an unknown element");
    }
    id
}

fn resolve_interaction(
    rule: &RawInteraction,
    registry: &ElementRegistry,
) -> Result<Option<EtherRule>, AssetError> {
    if rule.particle != "ETHER" {
        return Err(AssetError::InvalidAsset(format!(
            "particle interaction for {:?}; only ETHER drift is supported",
            rule.particle
        )));
    }
    check_probability(rule.probability)?;
    let (Some(from), Some(to)) = (
        lookup(registry, &rule.from, "interaction.from"),
        lookup(registry, &rule.to, "interaction.to"),
    ) else {
        return Ok(None);
    };
    Ok(Some(EtherRule {
        from,
        to,
        probability: rule.probability,
    }))
}

fn resolve_transform(
    rule: &RawTransform,
    registry: &ElementRegistry,
) -> Result<Option<TransformRule>, AssetError> {
    check_probability(rule.probability)?;
    if rule.threshold == 0 {
        return Err(AssetError::InvalidAsset(format!(
            "rule {} -> {} has a zero threshold",
            rule.from, rule.to
        )));
    }
    let (Some(from), Some(to)) = (
        lookup(registry, &rule.from, "transform.from"),
        lookup(registry, &rule.to, "transform.to"),
    ) else {
        return Ok(None);
    };

    let consumes = match &rule.consumes {
        Some(name) => match lookup(registry, name, "transform.consumes") {
            Some(id) => Some(id),
            None => return Ok(None),
        },
        None => None,
    };
    let spawn_particle = match &rule.spawn_particle {
        Some(name) => match lookup(registry, name, "transform.spawnParticle") {
            Some(id) => Some(id),
            None => return Ok(None),
        },
        None => None,
    };

    let mut conditions = Vec::with_capacity(rule.conditions.len());
    for condition in &rule.conditions {
        match resolve_condition(condition, registry)? {
            Some(resolved) => conditions.push(resolved),
            None => return Ok(None),
        }
    }

    Ok(Some(TransformRule {
        from,
        to,
        probability: rule.probability,
        threshold: rule.threshold,
        conditions,
        consumes,
        spawn_particle,
    }))
}

fn resolve_condition(
    condition: &RawCondition,
    registry: &ElementRegistry,
) -> Result<Option<Condition>, AssetError> {
    Ok(match condition {
        RawCondition::Surrounding { element, min, max } => {
            lookup(registry, element, "condition.surrounding").map(|of| Condition::Surrounding {
                of,
                min: *min,
                max: *max,
            })
        }
        RawCondition::Environment {
            element,
            radius,
            present,
        } => lookup(registry, element, "condition.environment").map(|of| Condition::Environment {
            of,
            radius: *radius,
            present: *present,
        }),
        RawCondition::SurroundingAttribute {
            attribute,
            value,
            min,
            max,
        } => {
            let probe = parse_probe(attribute, value)?;
            Some(Condition::SurroundingAttribute {
                probe,
                min: *min,
                max: *max,
            })
        }
    })
}

fn parse_probe(attribute: &str, value: &Value) -> Result<AttributeProbe, AssetError> {
    match attribute {
        "state" => {
            let state: ElementState = serde_json::from_value(value.clone())?;
            Ok(AttributeProbe::State(state))
        }
        "isFlammable" => value
            .as_bool()
            .map(AttributeProbe::Flammable)
            .ok_or_else(|| AssetError::InvalidAsset("isFlammable probe wants a bool".into())),
        "isStatic" => value
            .as_bool()
            .map(AttributeProbe::Static)
            .ok_or_else(|| AssetError::InvalidAsset("isStatic probe wants a bool".into())),
        other => Err(AssetError::InvalidAsset(format!(
            "unknown probe attribute {other:?}"
        ))),
    }
}

fn check_probability(p: f64) -> Result<(), AssetError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(AssetError::InvalidAsset(format!(
            "probability {p} outside [0, 1]"
        )))
    }
}

/// The element pack shipped with the engine.
pub fn default_elements() -> Result<ElementRegistry, AssetError> {
    load_elements(include_str!("../assets/elements.json"))
}

/// The rule pack shipped with the engine, resolved against `registry`.
pub fn default_rules(registry: &ElementRegistry) -> Result<RuleBook, AssetError> {
    let (book, dropped) = load_rules(include_str!("../assets/rules.json"), registry)?;
    debug_assert_eq!(dropped, 0, "the built-in packs must agree");
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_packs_load_cleanly() {
        let registry = default_elements().expect("elements");
        assert!(registry.len() > 10);
        assert!(registry.id("SOIL").is_some());
        assert!(registry.id("CLOUD").is_some());
        assert_eq!(registry.id("EMPTY"), Some(crate::ElementId::EMPTY));

        let rules = default_rules(&registry).expect("rules");
        assert!(rules.transform_count() >= 5);
        assert!(rules.ether_count() >= 4);
    }

    #[test]
    fn missing_required_fields_are_fatal() {
        let err = load_elements(r##"[{ "name": "SOIL", "color": "#FFFFFF" }]"##).unwrap_err();
        assert!(matches!(err, AssetError::Malformed(_)));

        let err = load_elements(r##"[{ "color": "#FFFFFF", "density": 1.0 }]"##).unwrap_err();
        assert!(matches!(err, AssetError::Malformed(_)));
    }

    #[test]
    fn unknown_rule_elements_are_dropped_not_fatal() {
        let registry = load_elements(
            r##"[{ "name": "SOIL", "color": "#7A5230", "density": 1.5 }]"##,
        )
        .expect("registry");
        let (book, dropped) = load_rules(
            r#"[
                { "from": "SOIL", "to": "ADAMANTIUM", "probability": 0.5, "threshold": 2 },
                { "type": "particle_interaction", "particle": "ETHER",
                  "from": "SOIL", "to": "MITHRIL", "probability": 0.5 }
            ]"#,
            &registry,
        )
        .expect("rules");
        assert_eq!(dropped, 2);
        assert_eq!(book.transform_count(), 0);
        assert_eq!(book.ether_count(), 0);
    }

    #[test]
    fn bad_probability_and_threshold_are_invalid_assets() {
        let registry = load_elements(
            r##"[{ "name": "SOIL", "color": "#7A5230", "density": 1.5 }]"##,
        )
        .expect("registry");

        let err = load_rules(
            r#"[{ "from": "SOIL", "to": "SOIL", "probability": 2.0, "threshold": 2 }]"#,
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, AssetError::InvalidAsset(_)));

        let err = load_rules(
            r#"[{ "from": "SOIL", "to": "SOIL", "probability": 0.5, "threshold": 0 }]"#,
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, AssetError::InvalidAsset(_)));
    }

    #[test]
    fn non_ether_interactions_are_rejected() {
        let registry = load_elements(
            r##"[{ "name": "SOIL", "color": "#7A5230", "density": 1.5 }]"##,
        )
        .expect("registry");
        let err = load_rules(
            r#"[{ "type": "particle_interaction", "particle": "FIRE",
                  "from": "SOIL", "to": "SOIL", "probability": 0.5 }]"#,
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, AssetError::InvalidAsset(_)));
    }

    #[test]
    fn conditions_parse_all_three_shapes() {
        let registry = load_elements(
            r##"[
                { "name": "SOIL", "color": "#7A5230", "density": 1.5 },
                { "name": "WATER", "color": "#3D7EDB", "density": 1.0, "state": "liquid" }
            ]"##,
        )
        .expect("registry");
        let (book, dropped) = load_rules(
            r#"[{
                "from": "SOIL", "to": "WATER", "probability": 1.0, "threshold": 1,
                "conditions": [
                    { "type": "surrounding", "element": "WATER", "min": 1, "max": 8 },
                    { "type": "environment", "element": "WATER", "radius": 3, "present": true },
                    { "type": "surroundingAttribute", "attribute": "state",
                      "value": "liquid", "min": 1, "max": 8 }
                ]
            }]"#,
            &registry,
        )
        .expect("rules");
        assert_eq!(dropped, 0);
        let soil = registry.id("SOIL").expect("soil");
        assert_eq!(book.transforms_for(soil)[0].conditions.len(), 3);
    }
}
