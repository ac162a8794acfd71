pub mod chunks;
pub mod conll;
pub mod input;
pub mod output;
pub mod resources;

pub use chunks::*;
pub use conll::*;
pub use input::*;
pub use output::*;
pub use resources::*;
