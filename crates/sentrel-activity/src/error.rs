//! Error handling for the activity log store.
//!
//! This crate re-exports [`sentrel_data::DataError`] rather than wrapping
//! it: every failure here is already one of the persistence envelope's
//! error classes, and a store-specific wrapper would add nothing but
//! boilerplate `From` impls.

pub use sentrel_data::{DataError as ActivityError, DataResult as ActivityResult};
