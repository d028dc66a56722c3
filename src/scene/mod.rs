//! Scene planning
//!
//! Turns a scene request into the generation inputs:
//! - Narrative state parsing
//! - Prompt composition with landmark continuity
//! - Seed key policy and the numeric seed

mod landmarks;
mod prompt;
mod request;
mod seed;
mod state;

pub use landmarks::{
    AmbientModifier, Condition, Landmark, LandmarkRegistry, Overlay, RegistryError, SceneConfig,
    DEFAULT_VARIANT_TAG, LANDMARK_PLACEHOLDER,
};
pub use prompt::compose;
pub use request::{ScenePayload, SceneRequest, DEFAULT_DIMENSION, DEFAULT_ROOM};
pub use seed::seed_key;
pub use state::ParsedState;

use crate::hashing;

/// Everything needed to call the image generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePlan {
    pub prompt: String,
    pub seed_key: String,
    pub seed: u32,
}

/// Validated scene rules shared by all requests
#[derive(Debug, Clone)]
pub struct ScenePolicy {
    style: String,
    registry: LandmarkRegistry,
    ambient: Vec<AmbientModifier>,
}

impl ScenePolicy {
    /// Build the policy from configuration
    pub fn new(config: SceneConfig) -> Result<Self, RegistryError> {
        Ok(Self {
            style: config.style,
            registry: LandmarkRegistry::new(config.landmarks)?,
            ambient: config.ambient,
        })
    }

    pub fn registry(&self) -> &LandmarkRegistry {
        &self.registry
    }

    /// Compose the prompt and derive the seed for a request
    pub fn plan(&self, request: &SceneRequest) -> ScenePlan {
        let state = ParsedState::parse(&request.state);
        let prompt = compose(
            &self.style,
            &self.registry,
            &self.ambient,
            &request.room,
            &state,
        );
        let seed_key = seed_key(&self.registry, request, &state);
        let seed = hashing::seed_from(&seed_key);

        ScenePlan {
            prompt,
            seed_key,
            seed,
        }
    }
}
