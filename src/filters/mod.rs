pub mod fixed_gain;

pub use fixed_gain::{FilterState, FixedGainFilter};
