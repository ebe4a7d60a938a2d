//! Helper items to assist the working of `orbopt`.

pub mod template_systems;
pub mod timer;
