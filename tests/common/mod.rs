//! Common test utilities - SceneTest harness for end-to-end testing

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Bytes;
use parking_lot::Mutex;
use reqwest::{redirect::Policy, Client};
use scened::images::{CacheStore, MemoryCache};
use scened::workers_ai::{GenerateError, GeneratorOutput, ImageGenerator};
use scened::{Config, Server};
use tokio::task::JoinHandle;

/// One recorded generator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateCall {
    pub model: String,
    pub prompt: String,
    pub seed: u32,
}

/// In-process image generator that records calls and can be told to fail
#[derive(Debug, Default)]
pub struct FakeGenerator {
    calls: AtomicUsize,
    fail: AtomicBool,
    log: Mutex<Vec<GenerateCall>>,
}

impl FakeGenerator {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn log(&self) -> Vec<GenerateCall> {
        self.log.lock().clone()
    }

    pub fn last(&self) -> Option<GenerateCall> {
        self.log.lock().last().cloned()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        seed: u32,
    ) -> Result<GeneratorOutput, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(GenerateCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
            seed,
        });

        if self.fail.load(Ordering::SeqCst) {
            return Err(GenerateError::Other("simulated model failure".to_string()));
        }

        // Alternate between both output shapes the pipeline must accept
        let image = Bytes::from(format!("\u{ff}jpeg seed={} len={}", seed, prompt.len()));
        if seed % 2 == 0 {
            Ok(GeneratorOutput::Raw(image))
        } else {
            Ok(GeneratorOutput::Wrapped { image })
        }
    }
}

/// Test harness that spawns a real scened server on a random port
pub struct SceneTest {
    pub addr: SocketAddr,
    pub client: Client,
    pub cache: Arc<MemoryCache>,
    fake: Option<Arc<FakeGenerator>>,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl SceneTest {
    /// Start a server with default configuration and a fake generator
    pub async fn start() -> Result<Self> {
        Self::start_with(Config::default(), Some(FakeGenerator::shared())).await
    }

    /// Start a server with the given configuration and generator
    pub async fn start_with(
        mut config: Config,
        generator: Option<Arc<FakeGenerator>>,
    ) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        config.bind_addr = addr;

        let cache = Arc::new(MemoryCache::from_config(&config.cache));
        let server = Arc::new(Server::with_backends(
            config,
            cache.clone() as Arc<dyn CacheStore>,
            generator.clone().map(|g| g as Arc<dyn ImageGenerator>),
        )?);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        // Redirects are asserted on, not followed
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .redirect(Policy::none())
            .build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            cache,
            fake: generator,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a POST request with a raw body
    pub async fn post_raw(&self, path: &str, body: &'static str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?)
    }

    /// The fake generator (panics if the server was started without one)
    pub fn generator(&self) -> &FakeGenerator {
        self.fake
            .as_deref()
            .expect("server started without a generator")
    }

    /// Wait for the background cache write to land
    pub async fn wait_for_cache_len(&self, len: usize) -> bool {
        for _ in 0..50 {
            if self.cache.len() == len {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

impl Drop for SceneTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}
