//! Certificate management for the dynamic TLS listener.
//!
//! Three pieces:
//! - `ca`: load an existing root CA from disk or generate and persist one
//! - `storage`: where issued leaf certificates live (in-memory by default)
//! - `resolver`: a rustls certificate resolver that issues a leaf per SNI
//!   name on first sight, signed by the CA

pub mod ca;
mod resolver;
mod storage;

pub use ca::{load_or_gen, CaPair};
pub use resolver::DynamicResolver;
pub use storage::{MemoryStorage, TlsStorage};
