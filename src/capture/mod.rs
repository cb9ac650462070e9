//! Adapters that feed log events into a running shipper.

pub mod layer;
pub mod lines;

pub use layer::ShipperLayer;
pub use lines::{ship_lines, LineDecoder};
