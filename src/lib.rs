//! Loads archives of cave scan models into a live model tree, reconciles them with the metadata
//! that has been saved alongside, and writes them back.

pub mod asset_graph;
pub mod io;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod settings;
