//! Image caching and generation module
//!
//! Provides:
//! - Request-keyed image cache (edge cache analogue)
//! - Scene image pipeline (cache lookup, generation, background cache fill)

mod gen;
mod store;

pub use gen::{ImagePipeline, ImageSource, PipelineError, RenderedImage, IMAGE_MIME_TYPE};
pub use store::{CacheConfig, CacheError, CacheKey, CacheStore, CachedImage, MemoryCache};
