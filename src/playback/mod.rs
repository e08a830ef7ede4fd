//! The playback core: per-guild state, engine events and the controller that
//! routes commands to whichever engine owns a guild.

pub mod aggregator;
pub mod controller;
pub mod dispatch;
pub mod event;
pub mod state;

pub use aggregator::{new_aggregator, Aggregator, ApplyOutcome, SharedAggregator};
pub use controller::{PlaybackController, Stopped};
pub use event::{BackendEvent, BackendId, EngineEvent, Generation};
pub use state::{BackendStatus, PlaybackState, StatusSnapshot};
