pub mod config;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod game;
pub mod persist;
pub mod registry;
pub mod replay;
pub mod telemetry;
pub mod util;
pub mod worker;
