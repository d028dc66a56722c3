//! Seed policy
//!
//! Landmark rooms seed from `room::token` so that narrative state changes keep
//! the camera and layout. A recomposition trigger appends the landmark's
//! variant tag instead of raw state text. Every other room seeds from
//! `room::state::token`.

use super::landmarks::LandmarkRegistry;
use super::request::SceneRequest;
use super::state::ParsedState;

const KEY_SEPARATOR: &str = "::";

/// Build the seed key for a request
pub fn seed_key(
    registry: &LandmarkRegistry,
    request: &SceneRequest,
    state: &ParsedState,
) -> String {
    match registry.lookup(&request.room) {
        Some(landmark) => {
            let mut key = [request.room.as_str(), request.seed_token.as_str()].join(KEY_SEPARATOR);
            if landmark.is_recomposed(state) {
                key.push_str(KEY_SEPARATOR);
                key.push_str(&landmark.variant_tag);
            }
            key
        }
        None => [
            request.room.as_str(),
            request.state.as_str(),
            request.seed_token.as_str(),
        ]
        .join(KEY_SEPARATOR),
    }
}
