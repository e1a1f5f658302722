//! Chip specific register protocols.
pub mod mcp23s17;
