pub mod path;
pub mod signal;
