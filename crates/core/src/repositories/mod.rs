//! Data access for the `patients` and `files` tables.
//!
//! Every function takes a `&mut SqliteConnection`, so the same code runs inside a
//! [`UnitOfWork`](crate::UnitOfWork) transaction or on a plain pooled connection for reads.

pub mod files;
pub mod patients;
