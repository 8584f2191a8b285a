//! Lyrics text generation
//!
//! An OpenAI-compatible chat completions client and an offline mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::LyricsError;

/// Lyric used when lyrics generation fails
pub const FALLBACK_LYRICS: &str = "Uplifting song";

/// Generates lyrics text from a prompt
#[async_trait]
pub trait LyricsGenerator: Send + Sync {
    async fn generate_lyrics(&self, prompt: &str) -> Result<String, LyricsError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions lyrics client (`{base}/chat/completions`)
pub struct ChatLyricsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatLyricsClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LyricsGenerator for ChatLyricsClient {
    async fn generate_lyrics(&self, prompt: &str) -> Result<String, LyricsError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting lyrics");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LyricsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LyricsError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LyricsError::Parse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let lyrics = flatten_lyrics(&content).ok_or(LyricsError::Empty)?;
        info!(chars = lyrics.len(), "Lyrics generated");
        Ok(lyrics)
    }
}

/// Turn a model reply into plain lyrics text
///
/// A `{"lyrics": {verse1, chorus, verse2, outro}}` object becomes labelled
/// sections with the chorus repeated; any other reply is used verbatim.
/// Returns None for a blank reply.
pub fn flatten_lyrics(reply: &str) -> Option<String> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return None;
    }

    let unfenced = strip_code_fence(trimmed);
    let parsed: Option<Value> = serde_json::from_str(unfenced).ok();
    let sections = parsed.as_ref().and_then(|v| v.get("lyrics"));

    let Some(sections) = sections else {
        return Some(trimmed.to_string());
    };
    if let Some(text) = sections.as_str() {
        return Some(text.trim().to_string()).filter(|t| !t.is_empty());
    }

    let part = |key: &str| {
        sections
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let layout = [
        ("Verse 1", part("verse1")),
        ("Chorus", part("chorus")),
        ("Verse 2", part("verse2")),
        ("Chorus", part("chorus")),
        ("Outro", part("outro")),
    ];

    let text = layout
        .iter()
        .filter_map(|(label, body)| body.map(|b| format!("[{}]\n{}", label, b)))
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Offline lyricist used when no lyrics API key is configured
#[derive(Debug, Clone, Default)]
pub struct MockLyricist {
    name: String,
    city: Option<String>,
    from_mood: String,
    to_mood: String,
}

impl MockLyricist {
    pub fn new(
        name: impl Into<String>,
        city: Option<String>,
        from_mood: impl Into<String>,
        to_mood: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            city,
            from_mood: from_mood.into(),
            to_mood: to_mood.into(),
        }
    }
}

#[async_trait]
impl LyricsGenerator for MockLyricist {
    async fn generate_lyrics(&self, _prompt: &str) -> Result<String, LyricsError> {
        Ok(format!(
            "(Mock lyrics for {name})\n\n\
             In the city of {city},\n\
             Walking through the mist,\n\
             Finding my own space.\n\n\
             From {from} shadows,\n\
             To {to} light,\n\
             This song guides me,\n\
             Through the day and night.",
            name = self.name,
            city = self.city.as_deref().unwrap_or("Dreams"),
            from = self.from_mood,
            to = self.to_mood,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_json_lyrics() {
        let reply = r#"{"lyrics": {"verse1": "Rain on glass", "chorus": "Rise up", "verse2": "Sun breaks", "outro": "Home"}}"#;
        let text = flatten_lyrics(reply).unwrap();
        assert_eq!(
            text,
            "[Verse 1]\nRain on glass\n\n[Chorus]\nRise up\n\n[Verse 2]\nSun breaks\n\n[Chorus]\nRise up\n\n[Outro]\nHome"
        );
    }

    #[test]
    fn test_flatten_fenced_json() {
        let reply = "```json\n{\"lyrics\": {\"verse1\": \"a\", \"chorus\": \"b\"}}\n```";
        assert_eq!(
            flatten_lyrics(reply).unwrap(),
            "[Verse 1]\na\n\n[Chorus]\nb\n\n[Chorus]\nb"
        );
    }

    #[test]
    fn test_plain_reply_used_verbatim() {
        assert_eq!(flatten_lyrics("  la la la \n").unwrap(), "la la la");
        assert_eq!(flatten_lyrics("{\"title\": \"x\"}").unwrap(), "{\"title\": \"x\"}");
    }

    #[test]
    fn test_blank_reply_is_none() {
        assert!(flatten_lyrics("   ").is_none());
        assert!(flatten_lyrics(r#"{"lyrics": {}}"#).is_none());
    }

    #[tokio::test]
    async fn test_mock_lyricist_mentions_moods() {
        let lyricist = MockLyricist::new("Sam", None, "Sad", "Joyful");
        let text = lyricist.generate_lyrics("ignored").await.unwrap();
        assert!(text.contains("Sam"));
        assert!(text.contains("Dreams"));
        assert!(text.contains("From Sad shadows"));
        assert!(text.contains("To Joyful light"));
    }
}
