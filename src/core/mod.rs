pub mod config;
pub mod error;
pub mod media;
pub mod subtitle;
pub mod subtitle_list;


pub use config::*;
pub use error::*;
pub use media::*;
pub use subtitle::*;
pub use subtitle_list::*;
