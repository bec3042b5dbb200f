// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod config;
pub mod leaderboard;
pub mod palette;
pub mod profile;
pub mod rank;
pub mod recorder;
pub mod round;
pub mod runtime;
pub mod session;
pub mod util;
