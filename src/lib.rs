extern crate rust_poker;

/// Declare common crate modules for linking
pub mod action;
pub mod agent;
pub mod card;
pub mod cleaner;
pub mod equity;
pub mod error;
pub mod eval;
pub mod features;
pub mod model;
pub mod odds;
pub mod record;
pub mod replay;
pub mod round;
pub mod scores;
