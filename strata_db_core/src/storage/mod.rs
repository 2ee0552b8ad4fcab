pub mod engine;
pub mod mem;

pub use engine::StorageEngine;
pub use mem::MemStorage;
