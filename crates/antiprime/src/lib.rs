#![doc = include_str!("../README.md")]

mod config;
mod divisors;
mod engine;
mod error;
mod number;
mod sequence;

pub use crate::config::*;
pub use crate::divisors::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::number::*;
pub use crate::sequence::*;
