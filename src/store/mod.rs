pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpAttributeStore;
pub use memory::MemoryStore;
pub use traits::{Attribute, AttributeStore, StoreError, StoreItem};
