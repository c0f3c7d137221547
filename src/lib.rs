/*!
 * # mdtranslate - Markdown translation with AI
 *
 * A Rust library for translating long Markdown documents with a chat
 * completion model while keeping their structure intact.
 *
 * ## Features
 *
 * - Code, links, images, tables, LaTeX and raw HTML are shielded from the
 *   model behind placeholder tokens and restored afterwards
 * - Section-aware chunking that never breaks a sentence or a token
 * - Concurrent translation with a bounded worker pool, retries with
 *   exponential back-off and ordered reassembly
 * - Persistent SQLite translation cache with a 30-day lifetime
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The pipeline:
 *   - `translation::protector` / `translation::restorer`: element shielding
 *   - `translation::chunker`: chunk splitting
 *   - `translation::orchestrator`: concurrent chunk translation
 *   - `translation::cache`: translation cache
 *   - `translation::core`: request-level service
 * - `database`: SQLite storage for the cache
 * - `providers`: Chat completion clients (OpenAI-compatible, mock)
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::{TranslationRequest, TranslationResponse, TranslationService};
