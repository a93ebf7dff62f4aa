//! Database record models matching table schemas.
//!
//! These structs are what repositories accept for inserts/updates and return from queries.
//! They are distinct from the API models so storage and API representations can evolve
//! independently; API models convert from them with `From`.
//!
//! - [`members`]: Members, their create/update requests and the join projection
//! - [`teams`]: Teams and their create/update requests

pub mod members;
pub mod teams;
