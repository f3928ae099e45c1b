#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use unified_scraper::{
    Backend, BackendKind, BackendRegistry, Error, IntelligenceOptions, Result, ScrapeResult,
    ScraperIntelligence, TargetOptions, UnifiedScraper,
};

#[derive(Clone)]
pub enum Behaviour {
    /// Returns this text as page content.
    Content(String),
    /// Fails with this message.
    Fail(String),
    /// Fails on the first `n` calls, then returns the content.
    FailTimes(usize, String),
}

/// Scripted backend that remembers when it was called.
#[derive(Clone)]
pub struct FakeBackend {
    kind: BackendKind,
    behaviour: Behaviour,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl FakeBackend {
    pub fn new(kind: BackendKind, behaviour: Behaviour) -> Self {
        Self {
            kind,
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn content(kind: BackendKind, text: &str) -> Self {
        Self::new(kind, Behaviour::Content(text.to_string()))
    }

    pub fn failing(kind: BackendKind, message: &str) -> Self {
        Self::new(kind, Behaviour::Fail(message.to_string()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn fetch(
        &self,
        url: &str,
        _target: &TargetOptions,
        _timeout: Duration,
    ) -> Result<ScrapeResult> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len()
        };
        match &self.behaviour {
            Behaviour::Content(text) => Ok(ScrapeResult::new(url, text.clone(), "Fake".into())),
            Behaviour::Fail(message) => Err(Error::Extraction(message.clone())),
            Behaviour::FailTimes(n, text) if call > *n => {
                Ok(ScrapeResult::new(url, text.clone(), "Fake".into()))
            }
            Behaviour::FailTimes(_, _) => Err(Error::Extraction(format!("flaky call {}", call))),
        }
    }
}

/// Text comfortably above the acceptance floor.
pub fn article() -> String {
    "Copper prices climbed again as smelters cut output. ".repeat(5)
}

pub async fn memory_store() -> Arc<ScraperIntelligence> {
    Arc::new(
        ScraperIntelligence::in_memory(IntelligenceOptions::default())
            .await
            .unwrap(),
    )
}

pub fn registry(backends: &[&FakeBackend]) -> BackendRegistry {
    let mut registry = BackendRegistry::empty();
    for backend in backends {
        registry.register(Arc::new((*backend).clone()));
    }
    registry
}

pub async fn scraper_with(backends: &[&FakeBackend]) -> UnifiedScraper {
    UnifiedScraper::new(memory_store().await, registry(backends), None)
}
