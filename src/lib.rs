pub mod actuator;
pub mod config;
pub mod demo;
pub mod motion;
pub mod sequencer;
