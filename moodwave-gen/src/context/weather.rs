//! OpenWeatherMap and NewsAPI lookups

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{EnvironmentContext, EnvironmentSource};

const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const NEWSAPI_URL: &str = "https://newsapi.org/v2/top-headlines";

const MOCK_CITY: &str = "Singapore (mock)";
const MOCK_TEMPERATURE_C: f64 = 25.0;
const MOCK_WEATHER: &str = "Clear Sky (mock)";
const MOCK_HEADLINE: &str = "Mock Headline";

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    name: Option<String>,
    main: WeatherMain,
    #[serde(default)]
    weather: Vec<WeatherCondition>,
    #[serde(default)]
    sys: Option<WeatherSys>,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherSys {
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    #[serde(default)]
    title: Option<String>,
}

struct Weather {
    city: Option<String>,
    temperature_c: f64,
    description: Option<String>,
}

/// Environment from live weather and news APIs
///
/// A missing key yields mock values for that half; a failed lookup yields
/// absent fields.
pub struct HttpEnvironmentSource {
    http_client: reqwest::Client,
    openweather_key: Option<String>,
    news_key: Option<String>,
    coordinates: Option<(f64, f64)>,
    news_country: String,
    weather_url: String,
    news_url: String,
}

impl HttpEnvironmentSource {
    pub fn new(
        http_client: reqwest::Client,
        openweather_key: Option<String>,
        news_key: Option<String>,
        coordinates: Option<(f64, f64)>,
        news_country: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            openweather_key,
            news_key,
            coordinates,
            news_country: news_country.into(),
            weather_url: OPENWEATHER_URL.to_string(),
            news_url: NEWSAPI_URL.to_string(),
        }
    }

    /// Point both lookups at other endpoints
    pub fn with_urls(mut self, weather_url: impl Into<String>, news_url: impl Into<String>) -> Self {
        self.weather_url = weather_url.into();
        self.news_url = news_url.into();
        self
    }

    async fn fetch_weather(&self, api_key: &str, lat: f64, lon: f64) -> Result<Weather, reqwest::Error> {
        let response: WeatherResponse = self
            .http_client
            .get(&self.weather_url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", "metric".to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Weather {
            city: response
                .name
                .filter(|n| !n.is_empty())
                .or_else(|| response.sys.and_then(|s| s.country)),
            temperature_c: response.main.temp.round(),
            description: response.weather.into_iter().next().map(|w| w.description),
        })
    }

    async fn fetch_headline(&self, api_key: &str) -> Result<Option<String>, reqwest::Error> {
        let response: NewsResponse = self
            .http_client
            .get(&self.news_url)
            .query(&[
                ("country", self.news_country.as_str()),
                ("pageSize", "1"),
                ("apiKey", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.articles.into_iter().find_map(|a| a.title))
    }
}

#[async_trait]
impl EnvironmentSource for HttpEnvironmentSource {
    async fn fetch_environment_context(&self) -> EnvironmentContext {
        let mut context = EnvironmentContext::default();

        match (&self.openweather_key, self.coordinates) {
            (None, _) => {
                warn!("OpenWeather API key not set, using mock weather");
                context.city = Some(MOCK_CITY.to_string());
                context.temperature_c = Some(MOCK_TEMPERATURE_C);
                context.weather_description = Some(MOCK_WEATHER.to_string());
            }
            (Some(_), None) => debug!("No location configured, skipping weather lookup"),
            (Some(key), Some((lat, lon))) => match self.fetch_weather(key, lat, lon).await {
                Ok(weather) => {
                    context.city = weather.city;
                    context.temperature_c = Some(weather.temperature_c);
                    context.weather_description = weather.description;
                }
                Err(e) => warn!(error = %e, "Weather lookup failed"),
            },
        }

        match &self.news_key {
            None => {
                warn!("News API key not set, using mock headline");
                context.news_headline = Some(MOCK_HEADLINE.to_string());
            }
            Some(key) => match self.fetch_headline(key).await {
                Ok(headline) => context.news_headline = headline,
                Err(e) => warn!(error = %e, "News lookup failed"),
            },
        }

        context
    }
}
