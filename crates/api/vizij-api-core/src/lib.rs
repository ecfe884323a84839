//! vizij-api-core: attribute values and node paths shared by the pose crates
//! (host-agnostic).

pub mod blend;
pub mod coercion;
pub mod node_path;
pub mod value;

pub use blend::{add_values, blend_values, step_blend};
pub use node_path::NodeReference;
pub use value::Value;
