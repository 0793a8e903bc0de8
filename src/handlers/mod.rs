//! HTTP handlers

pub mod predict;
