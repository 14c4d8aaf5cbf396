//! Centralized constants for the appset-operator project.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod controller;
pub mod labels;
pub mod paths;
pub mod rbac;
pub mod state;
