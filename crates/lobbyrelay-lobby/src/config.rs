//! Lobby code configuration.

use serde::{Deserialize, Serialize};

/// How lobby codes are generated.
///
/// The defaults give 26^5 (about 11.8 million) codes. Codes are never
/// reused within a process, so a relay that runs long enough to issue most
/// of them starts hitting `max_code_attempts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Number of characters in a code.
    pub code_length: usize,

    /// Characters a code is drawn from.
    pub code_alphabet: String,

    /// Draws attempted before giving up with `CodeSpaceExhausted`.
    pub max_code_attempts: u32,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            code_length: 5,
            code_alphabet: "ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
            max_code_attempts: 10_000,
        }
    }
}
