//! Core logic

pub mod model;
