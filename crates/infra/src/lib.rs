//! Infrastructure layer: storage port and adapters, schema bootstrap, and the
//! service that the API talks to.

pub mod db;
pub mod service;
pub mod store;
