//! The conversation core: reply parsing, the turn state machine and the
//! shadowing drill. Nothing here touches the terminal or the network directly.

pub mod audio_gate;
pub mod configuration;
pub mod markers;
pub mod prompt;
pub mod recitation;
pub mod session;
pub mod shadowing;
pub mod transcript;
