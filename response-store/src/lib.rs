//! `ResponseStore` contract (spec §4.2) and the in-memory reference
//! implementation (spec §4.3). Backed stores (Postgres, Redis, ...) live in
//! their own crates downstream of this one and implement `ResponseStore`.

pub mod error;
pub mod in_memory;
pub mod store;

pub use error::StoreError;
pub use in_memory::InMemoryResponseStore;
pub use store::{ItemList, ResponseList, ResponseStore, StoreContext};
