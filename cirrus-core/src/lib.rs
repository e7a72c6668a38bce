//! Cirrus Core
//!
//! Core library for declarative cloud resource management: the resource model,
//! attribute schemas, the Provider abstraction and the plan/apply engine.

pub mod differ;
pub mod effect;
pub mod identifier;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod wait;
