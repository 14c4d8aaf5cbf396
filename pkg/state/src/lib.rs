pub mod client;
pub mod error;
pub mod memory;
pub mod object;
pub mod registry;

pub use client::StateStore;
pub use error::ClientError;
pub use memory::MemoryClient;
pub use object::ObjectClient;
pub use registry::RegistryClient;
