//! Listener context collaborators: health readings and environment
//!
//! Both sources are best-effort and infallible from the caller's point of
//! view; lookup failures surface as absent fields.

mod weather;

pub use weather::HttpEnvironmentSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Latest health readings; either may be unavailable
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub heart_rate: Option<f64>,
    pub steps: Option<u64>,
}

/// Weather and news around the listener
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub city: Option<String>,
    pub temperature_c: Option<f64>,
    pub weather_description: Option<String>,
    pub news_headline: Option<String>,
}

/// Supplies health snapshots; may be called repeatedly
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn fetch_health_snapshot(&self) -> HealthSnapshot;
}

/// Supplies the environment context
#[async_trait]
pub trait EnvironmentSource: Send + Sync {
    async fn fetch_environment_context(&self) -> EnvironmentContext;
}

/// Fixed readings, e.g. taken from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticHealthSource {
    snapshot: HealthSnapshot,
}

impl StaticHealthSource {
    pub fn new(snapshot: HealthSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl HealthSource for StaticHealthSource {
    async fn fetch_health_snapshot(&self) -> HealthSnapshot {
        self.snapshot
    }
}

/// No health device available
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableHealthSource;

#[async_trait]
impl HealthSource for UnavailableHealthSource {
    async fn fetch_health_snapshot(&self) -> HealthSnapshot {
        HealthSnapshot::default()
    }
}

/// Fixed environment, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironmentSource {
    context: EnvironmentContext,
}

impl StaticEnvironmentSource {
    pub fn new(context: EnvironmentContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl EnvironmentSource for StaticEnvironmentSource {
    async fn fetch_environment_context(&self) -> EnvironmentContext {
        self.context.clone()
    }
}
