//! Narrative state parsing
//!
//! State strings look like `f:courtyard_ghost_seen,candle_lit|m:m_courtyard_first`.
//! Segments are separated by `|`; `f:` carries story flags and `m:` carries
//! reached milestones. Unknown segments are skipped so newer clients can send
//! data this parser does not know about yet.

use std::collections::BTreeSet;

const FLAG_PREFIX: &str = "f:";
const MILESTONE_PREFIX: &str = "m:";
const SEGMENT_SEPARATOR: char = '|';
const TOKEN_SEPARATOR: char = ',';

/// Flags and milestones decoded from a state string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedState {
    pub flags: BTreeSet<String>,
    pub milestones: BTreeSet<String>,
}

impl ParsedState {
    /// Parse a state string. Never fails; garbage yields empty sets.
    pub fn parse(state: &str) -> Self {
        let mut parsed = Self::default();

        for segment in state.split(SEGMENT_SEPARATOR) {
            let segment = segment.trim_start();
            if let Some(tokens) = segment.strip_prefix(FLAG_PREFIX) {
                collect_tokens(tokens, &mut parsed.flags);
            } else if let Some(tokens) = segment.strip_prefix(MILESTONE_PREFIX) {
                collect_tokens(tokens, &mut parsed.milestones);
            }
        }

        parsed
    }

    /// Check whether a story flag is set
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Check whether a milestone has been reached
    pub fn has_milestone(&self, milestone: &str) -> bool {
        self.milestones.contains(milestone)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.milestones.is_empty()
    }
}

fn collect_tokens(tokens: &str, into: &mut BTreeSet<String>) {
    into.extend(
        tokens
            .split(TOKEN_SEPARATOR)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    );
}
