pub mod refresh;
pub mod serve;
pub mod status;

pub use refresh::refresh;
pub use serve::serve;
pub use status::status;
