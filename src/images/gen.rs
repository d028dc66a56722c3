//! Scene image pipeline
//!
//! Per request: cache lookup, then on a miss plan the scene (prompt + seed),
//! call the generator, hand the bytes back and populate the cache in the
//! background.
//!
//! The miss path runs in a detached task. If the client disconnects the
//! generation still finishes and the result is still cached.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::images::{CacheKey, CacheStore, CachedImage};
use crate::scene::{ScenePlan, ScenePolicy, SceneRequest};
use crate::workers_ai::{GenerateError, GeneratorOutput, ImageGenerator};

/// MIME type of generated scene images
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image generation capability is not configured")]
    Unavailable,

    #[error("{0}")]
    Generation(#[from] GenerateError),

    #[error("generation task ended without a result")]
    Aborted,
}

/// Where a rendered image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Cache,
    Generated,
}

/// Image bytes ready to serve
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub image: CachedImage,
    pub source: ImageSource,
}

/// Cache-backed scene image generator
#[derive(Clone)]
pub struct ImagePipeline {
    cache: Arc<dyn CacheStore>,
    generator: Option<Arc<dyn ImageGenerator>>,
    policy: Arc<ScenePolicy>,
    model: String,
}

impl ImagePipeline {
    /// Create a new pipeline. `generator` is `None` when no capability is bound.
    pub fn new(
        cache: Arc<dyn CacheStore>,
        generator: Option<Arc<dyn ImageGenerator>>,
        policy: Arc<ScenePolicy>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            generator,
            policy,
            model: model.into(),
        }
    }

    /// Check if an image generator is bound
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn policy(&self) -> &ScenePolicy {
        &self.policy
    }

    /// Serve a scene image from cache, generating it on a miss
    pub async fn render(
        &self,
        key: CacheKey,
        request: &SceneRequest,
    ) -> Result<RenderedImage, PipelineError> {
        if let Some(image) = self.cache.get(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(RenderedImage {
                image,
                source: ImageSource::Cache,
            });
        }
        debug!("Cache miss for {}", key);

        let generator = self.generator.clone().ok_or(PipelineError::Unavailable)?;
        let plan = self.policy.plan(request);

        info!(
            "Generating image for room '{}' (seed key '{}', seed {})",
            request.room, plan.seed_key, plan.seed
        );
        debug!("Prompt: {}", plan.prompt);

        let (tx, rx) = oneshot::channel();
        let cache = self.cache.clone();
        let model = self.model.clone();

        tokio::spawn(async move {
            match generate_bytes(generator.as_ref(), &model, &plan).await {
                Ok(image) => {
                    if tx.send(Ok(image.clone())).is_err() {
                        debug!("Client left before {} was ready; caching anyway", key);
                    }
                    match cache.put(key.clone(), image).await {
                        Ok(()) => debug!("Cached {}", key),
                        Err(e) => warn!("Failed to cache {}: {}", key, e),
                    }
                }
                Err(e) => {
                    warn!("Image generation failed for {}: {}", key, e);
                    let _ = tx.send(Err(e));
                }
            }
        });

        match rx.await {
            Ok(Ok(image)) => Ok(RenderedImage {
                image,
                source: ImageSource::Generated,
            }),
            Ok(Err(e)) => Err(PipelineError::Generation(e)),
            Err(_) => Err(PipelineError::Aborted),
        }
    }
}

async fn generate_bytes(
    generator: &dyn ImageGenerator,
    model: &str,
    plan: &ScenePlan,
) -> Result<CachedImage, GenerateError> {
    let data = generator
        .generate(model, &plan.prompt, plan.seed)
        .await
        .map(GeneratorOutput::into_bytes)?;

    if data.is_empty() {
        return Err(GenerateError::EmptyImage);
    }

    Ok(CachedImage {
        data,
        mime_type: IMAGE_MIME_TYPE.to_string(),
    })
}
