//! Scene request identity

use serde::Serialize;

/// Room used when an image request names none
pub const DEFAULT_ROOM: &str = "gothic estate";

/// Square edge length recorded in redirect image ids
pub const DEFAULT_DIMENSION: u32 = 768;

/// The inputs that fully determine a scene image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRequest {
    pub room: String,
    /// Raw state string, exactly as requested (trimmed)
    pub state: String,
    /// Seed token; defaults to the room
    pub seed_token: String,
}

impl SceneRequest {
    /// Build a request from raw query values, trimming each and applying
    /// the defaults. Returns `None` if `room` is empty and no default room
    /// is given.
    pub fn from_query(
        room: Option<&str>,
        state: Option<&str>,
        seed: Option<&str>,
        default_room: Option<&str>,
    ) -> Option<Self> {
        let room = non_empty(room).or(default_room)?.to_string();
        let state = state.map(str::trim).unwrap_or_default().to_string();
        let seed_token = non_empty(seed).unwrap_or(&room).to_string();

        Some(Self {
            room,
            state,
            seed_token,
        })
    }

    /// Payload hashed into the redirect's content id
    pub fn id_payload(&self) -> ScenePayload<'_> {
        ScenePayload {
            room: &self.room,
            state: &self.state,
            seed: &self.seed_token,
            w: DEFAULT_DIMENSION,
            h: DEFAULT_DIMENSION,
        }
    }
}

/// Serialized form of a scene for content ids; field order is significant
#[derive(Debug, Serialize)]
pub struct ScenePayload<'a> {
    pub room: &'a str,
    pub state: &'a str,
    pub seed: &'a str,
    pub w: u32,
    pub h: u32,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
