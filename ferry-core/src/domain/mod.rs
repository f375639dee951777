//! Core domain types
//!
//! This module contains the structures shared by the deployment engine and the
//! CLI. The descriptor types describe what the user asked for; blueprints, module
//! configs and nodes describe what is sent to the network.

pub mod blueprint;
pub mod descriptor;
pub mod module;
pub mod network;
pub mod node;
pub mod ordered_map;

pub use ordered_map::OrderedMap;
