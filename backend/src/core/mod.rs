//! Core building blocks: time, fixed-point math, configuration, errors

pub mod config;
pub mod error;
pub mod math;
pub mod time;
