pub mod error;
pub mod sample;
