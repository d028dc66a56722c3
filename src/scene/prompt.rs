//! Prompt composition
//!
//! Clauses are appended in a fixed order and never rewritten:
//! 1. style lock and room naming
//! 2. landmark establishing clause (landmark rooms, every state)
//! 3. overlays anchored to the landmark, gated on state
//! 4. ambient modifiers

use super::landmarks::{AmbientModifier, LandmarkRegistry, ROOM_PLACEHOLDER};
use super::state::ParsedState;

/// Accumulates prompt clauses separated by single spaces
#[derive(Debug, Default)]
struct PromptBuilder {
    text: String,
}

impl PromptBuilder {
    fn push(&mut self, clause: &str) {
        let clause = clause.trim();
        if clause.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(clause);
    }

    fn finish(self) -> String {
        self.text
    }
}

/// Compose the generation prompt for a room in a given state
pub fn compose(
    style: &str,
    registry: &LandmarkRegistry,
    ambient: &[AmbientModifier],
    room: &str,
    state: &ParsedState,
) -> String {
    let mut prompt = PromptBuilder::default();

    prompt.push(&style.replace(ROOM_PLACEHOLDER, room));

    if let Some(landmark) = registry.lookup(room) {
        prompt.push(&landmark.establishing_clause());
        for clause in landmark.overlay_clauses(state) {
            prompt.push(&clause);
        }
    }

    for modifier in ambient.iter().filter(|m| m.when.matches(state)) {
        prompt.push(&modifier.clause);
    }

    prompt.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::landmarks::SceneConfig;

    const FOUNTAIN: &str = "central cracked stone fountain";

    fn compose_default(room: &str, state: &str) -> String {
        let config = SceneConfig::default();
        let registry = LandmarkRegistry::new(config.landmarks).unwrap();
        compose(
            &config.style,
            &registry,
            &config.ambient,
            room,
            &ParsedState::parse(state),
        )
    }

    #[test]
    fn test_base_clause() {
        let prompt = compose_default("library", "");
        assert!(prompt.starts_with("Ultra realistic cinematic gothic horror. Scene: library."));
        assert!(prompt.ends_with("No text, no watermark, no modern objects."));
        assert!(!prompt.contains("Establishing features"));
    }

    #[test]
    fn test_landmark_present_in_every_state() {
        for state in [
            "",
            "f:courtyard_ghost_seen",
            "f:candle_lit",
            "f:courtyard_ghost_seen,candle_lit|m:m_courtyard_first",
            "garbage",
        ] {
            let prompt = compose_default("courtyard", state);
            assert!(prompt.contains(FOUNTAIN), "state {:?}", state);
            assert!(prompt.contains("Establishing features: a central cracked stone fountain"));
        }
    }

    #[test]
    fn test_apparition_anchored_to_landmark() {
        let prompt = compose_default("courtyard", "f:courtyard_ghost_seen");
        assert!(prompt.contains("apparition beside the central cracked stone fountain"));

        let establishing = prompt.find("Establishing features").unwrap();
        let apparition = prompt.find("apparition").unwrap();
        assert!(establishing < apparition);

        let plain = compose_default("courtyard", "");
        assert!(!plain.contains("apparition"));
        assert!(prompt.starts_with(&plain));
    }

    #[test]
    fn test_overlay_only_for_its_room() {
        let prompt = compose_default("library", "f:courtyard_ghost_seen");
        assert!(!prompt.contains("apparition"));
        assert!(!prompt.contains(FOUNTAIN));
    }

    #[test]
    fn test_ambient_appended_last() {
        let prompt = compose_default("courtyard", "f:candle_lit,courtyard_ghost_seen");
        assert!(prompt.ends_with("Add warm candlelight highlights and deeper shadow contrast."));

        let library = compose_default("library", "f:candle_lit");
        assert!(library.contains("candlelight"));
    }

    #[test]
    fn test_room_matched_case_insensitively() {
        let prompt = compose_default("Courtyard", "");
        assert!(prompt.contains("Scene: Courtyard."));
        assert!(prompt.contains(FOUNTAIN));
    }

    #[test]
    fn test_deterministic() {
        let a = compose_default("courtyard", "f:courtyard_ghost_seen,candle_lit");
        let b = compose_default("courtyard", "f:candle_lit,courtyard_ghost_seen");
        assert_eq!(a, b);
        assert_eq!(a, compose_default("courtyard", "f:courtyard_ghost_seen,candle_lit"));
    }

    #[test]
    fn test_single_spaced() {
        let prompt = compose_default("courtyard", "f:courtyard_ghost_seen,candle_lit");
        assert!(!prompt.contains("  "));
    }
}
