//! Secret Santa Trustee: draws a derangement for a small group, reveals each
//! assignment privately on one shared terminal, and can leave an encrypted
//! backup whose password only the whole group can put back together.

pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod derangement;
pub mod interrupt;
pub mod menu;
pub mod reveal;
pub mod roster;
pub mod scratch;
pub mod session;
pub mod telemetry;
pub mod terminal;
