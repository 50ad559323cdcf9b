pub mod element;
pub mod timeline;
pub mod transport;
pub mod controller;
pub mod fade;
pub mod cue_player;

#[cfg(test)]
mod controller_test;

pub use element::*;
pub use timeline::*;
pub use transport::*;
pub use controller::*;
pub use cue_player::*;
