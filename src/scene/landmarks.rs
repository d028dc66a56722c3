//! Landmark registry
//!
//! Continuity rules are data, not code. Each landmark room names a centerpiece
//! that must appear in every render of that room, a list of secondary features,
//! the state-conditioned overlays anchored to the centerpiece, and the flags
//! allowed to select an alternate (still deterministic) composition.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::ParsedState;

/// Placeholder an overlay clause uses to refer to the room's centerpiece
pub const LANDMARK_PLACEHOLDER: &str = "{landmark}";

/// Placeholder the style clause uses for the requested room name
pub const ROOM_PLACEHOLDER: &str = "{room}";

/// Default seed key suffix for a recomposed scene
pub const DEFAULT_VARIANT_TAG: &str = "variantB";

/// Registry validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("landmark room name is empty")]
    EmptyRoom,

    #[error("landmark room '{0}' is defined more than once")]
    DuplicateRoom(String),

    #[error("landmark room '{0}' has an empty centerpiece")]
    EmptyCenterpiece(String),

    #[error("overlay #{index} of room '{room}' does not reference {{landmark}}")]
    UnanchoredOverlay { room: String, index: usize },

    #[error("landmark room '{0}' has an empty variant tag")]
    EmptyVariantTag(String),
}

/// A state membership test, e.g. `{ kind = "flag", name = "candle_lit" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Condition {
    Flag(String),
    Milestone(String),
}

impl Condition {
    pub fn matches(&self, state: &ParsedState) -> bool {
        match self {
            Condition::Flag(flag) => state.has_flag(flag),
            Condition::Milestone(milestone) => state.has_milestone(milestone),
        }
    }
}

/// State-conditioned detail placed relative to the room's centerpiece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    pub when: Condition,
    /// Clause text; must contain `{landmark}`
    pub clause: String,
}

/// Room-independent modifier (lighting, weather) appended last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientModifier {
    pub when: Condition,
    pub clause: String,
}

/// A continuity-locked room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    /// Room identifier, matched case-insensitively
    pub room: String,
    /// Named focal feature present in every render
    pub centerpiece: String,
    /// Secondary landmarks, rendered in this order
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
    /// Flags that select the alternate composition
    #[serde(default)]
    pub triggers: BTreeSet<String>,
    #[serde(default = "default_variant_tag")]
    pub variant_tag: String,
}

fn default_variant_tag() -> String {
    DEFAULT_VARIANT_TAG.to_string()
}

impl Landmark {
    /// The establishing clause. Emitted for every state of the room.
    pub fn establishing_clause(&self) -> String {
        let mut clause = format!(
            "Establishing features: a {} is always present in the {};",
            self.centerpiece, self.room
        );
        if !self.features.is_empty() {
            clause.push(' ');
            clause.push_str(&self.features.join(", "));
            clause.push(';');
        }
        clause.push_str(
            " keep the same layout and landmarks across renders; only mood/characters may change.",
        );
        clause
    }

    /// Overlay clauses active for this state, in registry order
    pub fn overlay_clauses<'a>(
        &'a self,
        state: &'a ParsedState,
    ) -> impl Iterator<Item = String> + 'a {
        self.overlays
            .iter()
            .filter(move |o| o.when.matches(state))
            .map(move |o| o.clause.replace(LANDMARK_PLACEHOLDER, &self.centerpiece))
    }

    /// Whether any recomposition trigger flag is set
    pub fn is_recomposed(&self, state: &ParsedState) -> bool {
        self.triggers.iter().any(|flag| state.has_flag(flag))
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.room.trim().is_empty() {
            return Err(RegistryError::EmptyRoom);
        }
        if self.centerpiece.trim().is_empty() {
            return Err(RegistryError::EmptyCenterpiece(self.room.clone()));
        }
        if self.variant_tag.trim().is_empty() {
            return Err(RegistryError::EmptyVariantTag(self.room.clone()));
        }
        for (index, overlay) in self.overlays.iter().enumerate() {
            if !overlay.clause.contains(LANDMARK_PLACEHOLDER) {
                return Err(RegistryError::UnanchoredOverlay {
                    room: self.room.clone(),
                    index,
                });
            }
        }
        Ok(())
    }
}

/// Scene configuration: style lock, landmark rooms and ambient modifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Base style clause; `{room}` is replaced with the requested room
    pub style: String,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub ambient: Vec<AmbientModifier>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            style: "Ultra realistic cinematic gothic horror. \
                    Scene: {room}. Fog, moonlight, ancient stone, dramatic shadows. \
                    High detail, cinematic lighting, moody atmosphere. \
                    No text, no watermark, no modern objects."
                .to_string(),
            landmarks: vec![Landmark {
                room: "courtyard".to_string(),
                centerpiece: "central cracked stone fountain".to_string(),
                features: vec![
                    "wet cobblestones".to_string(),
                    "ivy-covered stone walls".to_string(),
                    "weathered statues".to_string(),
                    "wrought-iron gate in the distance".to_string(),
                ],
                overlays: vec![Overlay {
                    when: Condition::Flag("courtyard_ghost_seen".to_string()),
                    clause: "Include a tall pale ghostly apparition beside the {landmark}; \
                             semi-transparent, subtle glow, Victorian haunting presence; \
                             mist coiling around its feet; eerie but clear focal subject."
                        .to_string(),
                }],
                // No trigger: one courtyard composition for every state
                triggers: BTreeSet::new(),
                variant_tag: default_variant_tag(),
            }],
            ambient: vec![AmbientModifier {
                when: Condition::Flag("candle_lit".to_string()),
                clause: "Add warm candlelight highlights and deeper shadow contrast.".to_string(),
            }],
        }
    }
}

/// Validated, case-insensitive lookup over the configured landmarks
#[derive(Debug, Clone)]
pub struct LandmarkRegistry {
    landmarks: Vec<Landmark>,
    by_room: HashMap<String, usize>,
}

impl LandmarkRegistry {
    /// Build a registry, rejecting invalid or duplicate entries
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self, RegistryError> {
        let mut by_room = HashMap::with_capacity(landmarks.len());
        for (index, landmark) in landmarks.iter().enumerate() {
            landmark.validate()?;
            let key = normalize_room(&landmark.room);
            if by_room.insert(key, index).is_some() {
                return Err(RegistryError::DuplicateRoom(landmark.room.clone()));
            }
        }
        Ok(Self { landmarks, by_room })
    }

    /// Find the landmark entry for a room, if it is continuity-locked
    pub fn lookup(&self, room: &str) -> Option<&Landmark> {
        self.by_room
            .get(&normalize_room(room))
            .map(|&index| &self.landmarks[index])
    }

    /// Configured landmark room names
    pub fn rooms(&self) -> impl Iterator<Item = &str> {
        self.landmarks.iter().map(|l| l.room.as_str())
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

fn normalize_room(room: &str) -> String {
    room.trim().to_lowercase()
}
