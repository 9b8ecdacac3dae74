// Backend implementations
pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;
