pub mod accumulator;
pub mod hour;
pub mod render;

pub use accumulator::{AddResult, HourlyAccumulator};
pub use hour::{next_flush_boundary, next_hour_boundary, HourLabel};
pub use render::render_csv;
