//! CLI command implementations

pub mod check;
pub mod sweep;

pub use check::CheckArgs;
pub use sweep::SweepArgs;
