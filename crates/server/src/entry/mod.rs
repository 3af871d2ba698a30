#![forbid(unsafe_code)]

mod stdio;

pub(crate) use stdio::{run_stdio, write_response};
