//! # API Shared
//!
//! Wire types for the patient registry API.
//!
//! Contains:
//! - Response bodies (`PatientRes`, `PatientPageRes`, `ErrorRes`, ...) with their OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! `registry-core` converts its read models into these types; `api-rest` serialises them.

pub mod health;
pub mod models;

pub use health::HealthService;
pub use models::*;
