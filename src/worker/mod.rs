pub mod evaluation;
pub mod self_play;
pub mod training;
