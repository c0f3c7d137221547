/*!
 * Markdown translation pipeline.
 *
 * The pipeline is split into several submodules:
 *
 * - `protector`: shields code, links, images, tables, LaTeX and HTML behind tokens
 * - `chunker`: section-aware, size-bounded splitting
 * - `cache`: content-addressed translation cache
 * - `orchestrator`: concurrent, cache-first, retrying chunk translation
 * - `restorer`: puts the shielded elements back
 * - `core`: request-level service tying the stages together
 */

// Re-export main types for easier usage
pub use self::cache::{CacheEntry, CacheKey, CacheStorage, InMemoryStorage, TranslationCache};
pub use self::chunker::{chunk, Chunk};
pub use self::core::{TranslationRequest, TranslationResponse, TranslationService};
pub use self::elements::{ElementKind, ElementMap, ProtectedElement};
pub use self::orchestrator::{Orchestrator, ProgressCallback, RetryPolicy, TranslationParams, TranslationResult};
pub use self::prompts::PromptTemplate;
pub use self::protector::{protect, ElementProtector, ProtectedText};
pub use self::restorer::{restore, restore_with_report, RestorationReport};

// Submodules
pub mod analysis;
pub mod cache;
pub mod chunker;
pub mod concurrency;
pub mod core;
pub mod elements;
pub mod orchestrator;
pub mod prompts;
pub mod protector;
pub mod restorer;
