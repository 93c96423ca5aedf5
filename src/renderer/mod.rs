//! Rendering module using the egui painter
//!
//! Draws the Earth, satellite markers, trajectory paths and ground tracks in
//! either an overhead map or a globe view.

mod camera;
mod earth;
mod scene;
mod sink;
mod textures;

pub use camera::*;
pub use scene::*;
pub use sink::*;
pub use textures::*;
