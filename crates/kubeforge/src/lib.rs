//! Turns Kubernetes manifests annotated with marker comments into the model
//! of an operator project.
//!
//! The entry point is [`Project::load`], which reads a workload
//! configuration, processes all manifests it declares and returns the
//! [`Project`] the templates of the generated operator are rendered from.
pub mod api;
pub mod codegen;
pub mod config;
pub mod dependency;
pub mod manifest;
pub mod marker;
pub mod naming;
pub mod project;
pub mod rbac;
pub mod resource;
pub mod yaml;

pub use project::{Project, WorkloadModel};
