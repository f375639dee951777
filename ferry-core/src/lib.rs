//! Ferry Core
//!
//! Core types and abstractions for the Ferry deployment tool.
//!
//! This crate contains:
//! - Domain types: deployment descriptor, modules, blueprints, nodes and networks
//! - DTOs: request and response bodies exchanged with execution nodes

pub mod domain;
pub mod dto;
