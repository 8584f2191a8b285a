//! Pipeline configuration resolution
//!
//! Combines the TOML config, environment variables and CLI overrides into
//! one [`PipelineConfig`], and builds the collaborators it describes. API
//! keys resolve ENV → TOML; a live provider without a key falls back to
//! mock mode.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use moodwave_common::config::{
    resolve_api_key, resolve_root_folder, LocationConfig, ProviderEndpoints, TomlConfig,
};

use crate::artifacts::FsArtifactStore;
use crate::context::HttpEnvironmentSource;
use crate::error::Result;
use crate::jobs::{
    ApiEndpoint, Backend, JobClient, MockTiming, MurekaApi, PollPolicy, Provider, ReplicateApi,
    SunoApi,
};
use crate::lyrics::{ChatLyricsClient, LyricsGenerator, MockLyricist};
use crate::notification::NotificationChannel;
use crate::orchestrator::OrchestratorSettings;
use crate::prompt::UserInput;

/// API keys after ENV → TOML resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedKeys {
    pub suno: Option<String>,
    pub replicate: Option<String>,
    pub mureka: Option<String>,
    pub lyrics: Option<String>,
    pub openweather: Option<String>,
    pub news: Option<String>,
}

impl ResolvedKeys {
    pub fn resolve(config: &TomlConfig) -> Self {
        let keys = &config.api_keys;
        Self {
            suno: resolve_api_key(Provider::Suno.api_key_env_var(), keys.suno.as_deref()),
            replicate: resolve_api_key(
                Provider::Replicate.api_key_env_var(),
                keys.replicate.as_deref(),
            ),
            mureka: resolve_api_key(Provider::Mureka.api_key_env_var(), keys.mureka.as_deref()),
            lyrics: resolve_api_key("LYRICS_API_KEY", keys.lyrics.as_deref()),
            openweather: resolve_api_key("OPENWEATHER_API_KEY", keys.openweather.as_deref()),
            news: resolve_api_key("NEWS_API_KEY", keys.news.as_deref()),
        }
    }

    pub fn for_provider(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Suno => self.suno.as_deref(),
            Provider::Replicate => self.replicate.as_deref(),
            Provider::Mureka => self.mureka.as_deref(),
        }
    }
}

/// Command-line values that win over every other source
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub provider: Option<Provider>,
    pub mock: bool,
    pub listen_before_generate_ms: Option<u64>,
    pub trajectory_steps: Option<usize>,
}

/// Fully resolved pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub root_folder: PathBuf,
    pub provider: Provider,
    /// Mock mode requested (by config or CLI) or forced by a missing key
    pub mock: bool,
    pub poll: PollPolicy,
    pub mock_timing: MockTiming,
    pub orchestrator: OrchestratorSettings,
    pub endpoints: ProviderEndpoints,
    pub location: LocationConfig,
    pub keys: ResolvedKeys,
}

impl PipelineConfig {
    pub fn resolve(config: &TomlConfig, overrides: &CliOverrides) -> Result<Self> {
        let generation = &config.generation;

        let provider = match overrides.provider {
            Some(provider) => provider,
            None => generation.provider.parse()?,
        };
        let keys = ResolvedKeys::resolve(config);

        let mut mock = overrides.mock || generation.mock;
        if !mock && keys.for_provider(provider).is_none() {
            warn!(
                provider = %provider,
                env_var = provider.api_key_env_var(),
                "No API key configured, falling back to mock mode"
            );
            mock = true;
        }

        let root_folder = resolve_root_folder(overrides.root_folder.as_deref(), config);

        Ok(Self {
            root_folder,
            provider,
            mock,
            poll: PollPolicy::new(
                Duration::from_millis(generation.poll_interval_ms),
                generation.max_poll_attempts,
            ),
            mock_timing: MockTiming {
                song_delay: Duration::from_millis(generation.mock_song_delay_ms),
                final_delay: Duration::from_millis(generation.mock_final_delay_ms),
            },
            orchestrator: OrchestratorSettings {
                listen_before_generate: Duration::from_millis(
                    overrides
                        .listen_before_generate_ms
                        .unwrap_or(generation.listen_before_generate_ms),
                ),
                trajectory_steps: overrides
                    .trajectory_steps
                    .unwrap_or(generation.trajectory_steps),
            },
            endpoints: config.providers.clone(),
            location: config.location.clone(),
            keys,
        })
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.root_folder.join("artifacts")
    }

    /// Live backend for the configured provider, if it has a key
    pub fn backend(&self, http_client: &reqwest::Client) -> Option<Backend> {
        let key = self.keys.for_provider(self.provider)?.to_string();
        let endpoints = &self.endpoints;

        let backend = match self.provider {
            Provider::Suno => Backend::Suno(SunoApi::new(
                http_client.clone(),
                ApiEndpoint::new(&endpoints.suno_base_url, key, &endpoints.suno_model),
            )),
            Provider::Replicate => Backend::Replicate(ReplicateApi::new(
                http_client.clone(),
                ApiEndpoint::new(
                    &endpoints.replicate_base_url,
                    key,
                    &endpoints.replicate_version,
                ),
            )),
            Provider::Mureka => Backend::Mureka(MurekaApi::new(
                http_client.clone(),
                ApiEndpoint::new(&endpoints.mureka_base_url, key, &endpoints.mureka_model),
            )),
        };
        Some(backend)
    }

    /// Job client for the configured provider, live or mock
    pub fn job_client(
        &self,
        http_client: &reqwest::Client,
        notifications: NotificationChannel,
    ) -> JobClient {
        let backend = if self.mock {
            None
        } else {
            self.backend(http_client)
        };

        match backend {
            Some(backend) => {
                info!(provider = %self.provider, "Using live job client");
                let store = Arc::new(FsArtifactStore::new(&self.root_folder, http_client.clone()));
                JobClient::live(backend, self.poll, store, notifications)
            }
            None => {
                info!(provider = %self.provider, "Using mock job client");
                JobClient::mock(self.provider, self.mock_timing, notifications)
            }
        }
    }

    /// Lyrics generator: chat client with a key, mock lyricist without
    pub fn lyrics_generator(
        &self,
        http_client: &reqwest::Client,
        input: &UserInput,
    ) -> Arc<dyn LyricsGenerator> {
        match &self.keys.lyrics {
            Some(key) if !self.mock => Arc::new(ChatLyricsClient::new(
                http_client.clone(),
                &self.endpoints.lyrics_base_url,
                key,
                &self.endpoints.lyrics_model,
            )),
            _ => {
                info!("Using mock lyricist");
                Arc::new(MockLyricist::new(
                    &input.name,
                    None,
                    &input.current_mood,
                    &input.desired_mood,
                ))
            }
        }
    }

    pub fn environment_source(&self, http_client: &reqwest::Client) -> HttpEnvironmentSource {
        let coordinates = self.location.latitude.zip(self.location.longitude);
        HttpEnvironmentSource::new(
            http_client.clone(),
            self.keys.openweather.clone(),
            self.keys.news.clone(),
            coordinates,
            &self.location.news_country,
        )
    }
}
