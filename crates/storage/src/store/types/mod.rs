#![forbid(unsafe_code)]

mod bulk;
mod lease;
mod rows;
mod tables;
mod view_state;

pub use bulk::*;
pub use lease::*;
pub use rows::*;
pub use tables::*;
pub use view_state::*;
