//! Outbound event pipeline
//!
//! - `main_loop`: the serialized context every delivery runs on
//! - `sink`: diagnostic `{key, value}` records to at most one listener
//! - `background`: location deliveries to the background channel

pub mod background;
pub mod main_loop;
pub mod sink;

pub use background::{BackgroundChannel, BackgroundEngine, LocationDispatcher, LocationEvent};
pub use main_loop::{main_context, MainHandle, MainLoop};
pub use sink::{EventListener, EventRecord, EventSink};
