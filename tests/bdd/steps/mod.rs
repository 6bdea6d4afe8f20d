pub mod protocol_steps;
pub mod world;
