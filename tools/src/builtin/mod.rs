pub mod code_interpreter;
pub mod file_search;
pub mod web_search;

pub use code_interpreter::{CodeInterpreterProvider, SandboxAcquirer, StaticSandbox};
pub use file_search::{EmbeddingClient, FileSearchProvider, OpenAiEmbeddingClient, VectorHit, VectorStoreBackend};
pub use web_search::{SearchBackend, SearchHit, SearxngBackend, WebSearchProvider};
