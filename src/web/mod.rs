//! The web module for the bridge's HTTP surface.
//! This file declares the other files in this directory as sub-modules.

pub mod api;
pub mod models;
