//! Session sources for RaceReplay

pub mod demo;
pub mod file;

pub use demo::DemoSource;
pub use file::{save, FileSource};
