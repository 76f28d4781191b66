pub use timestamp::*;
pub use user::*;
pub use video::*;

mod timestamp;
mod user;
mod video;
