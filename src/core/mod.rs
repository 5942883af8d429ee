pub mod atomic;
pub mod backup;
pub mod context;
pub mod error;
pub mod logging;
pub mod paths;
pub mod sanitizer;
pub mod vocabulary;

pub use context::StoreContext;
pub use error::{VocabError, VocabResult};
