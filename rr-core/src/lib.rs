//! RaceReplay Core Library
//!
//! This crate provides the race session data model, the session source
//! trait, and the replay engine that turns one loaded session into a
//! seekable, frame-by-frame replay with live standings.

pub mod adapter;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod history;
pub mod live;
pub mod lookups;
pub mod model;
pub mod replay;
pub mod roster;
pub mod series;
pub mod units;

pub use adapter::SessionSource;
pub use config::{RacePolicy, ReplayConfig};
pub use error::{ChannelError, GeometryError, ReplayError};
pub use history::LapHistory;
pub use live::LiveState;
pub use model::{FrameMask, ReplayFrame, Session};
pub use replay::{build_replay, ReplayBundle};
pub use series::TimeIndexedSeries;
