pub mod actions;
pub mod assertions;
pub mod fixtures;
pub mod setup;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
pub use setup::*;
