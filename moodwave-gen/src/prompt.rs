//! Listener input and the songwriter prompt built from it

use serde::{Deserialize, Serialize};

use crate::context::{EnvironmentContext, HealthSnapshot};

/// Form data describing the listener and the requested mood transition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub age: String,
    pub current_mood: String,
    pub desired_mood: String,
    pub favorite_genre: String,
    pub favorite_band: String,
    pub activity: String,
}

impl UserInput {
    /// Every field is non-blank
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of blank fields
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("age", &self.age),
            ("current_mood", &self.current_mood),
            ("desired_mood", &self.desired_mood),
            ("favorite_genre", &self.favorite_genre),
            ("favorite_band", &self.favorite_band),
            ("activity", &self.activity),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// Songwriter prompt for one song at `mood`
pub fn build_prompt(
    input: &UserInput,
    mood: &str,
    health: &HealthSnapshot,
    environment: &EnvironmentContext,
) -> String {
    let heart_rate = health
        .heart_rate
        .map(|bpm| format!("{:.0} bpm", bpm))
        .unwrap_or_else(|| "Unknown".to_string());
    let steps = health
        .steps
        .map(|s| format!("{} steps", s))
        .unwrap_or_else(|| "Unknown".to_string());
    let activity = match input.activity.trim() {
        "" => "None specified",
        activity => activity,
    };
    let location = environment.city.as_deref().unwrap_or("Unknown");
    let weather = match (environment.temperature_c, environment.weather_description.as_deref()) {
        (Some(temp), Some(description)) => format!("{:.0}°C, {}", temp, description),
        (Some(temp), None) => format!("{:.0}°C", temp),
        (None, Some(description)) => description.to_string(),
        (None, None) => "Unknown".to_string(),
    };
    let headline = environment.news_headline.as_deref().unwrap_or("N/A");

    format!(
        r#"You are a creative songwriter. Generate original song lyrics personalized to the following inputs:

USER
- Name: {name}
- Age: {age}

MUSIC STYLE
- Genre preference: {genre}
- Stylistic influence (do NOT imitate or quote): {band}
- Mood: {mood}

PHYSICAL CONTEXT
- Heart rate: {heart_rate}
- Daily activity: {steps}
- Current or upcoming activity: {activity}

ENVIRONMENT
- Location: {location}
- Weather: {weather}
- News mood cue (optional): {headline}

TASK:
Write cohesive song lyrics.
1. Structure: Verse 1, Chorus, Verse 2, Chorus (exact repeat), and Outro.
2. Tone: motivational, uplifting, and emotionally grounded.
3. Length: Target ~180-220 words total.
4. Integration: Weave in the physical state, environment and (if relevant) the news mood subtly and metaphorically.
5. Originality: Avoid cliches and generic motivational phrases.
6. Style: Use the genre and stylistic influence only for rhythm, imagery and tone guidance; do not imitate or quote them.

OUTPUT FORMAT (STRICT):
Return ONLY valid JSON. No preamble or markdown. Use the following structure:
{{
  "lyrics": {{
    "verse1": "...",
    "chorus": "...",
    "verse2": "...",
    "outro": "..."
  }}
}}"#,
        name = input.name.trim(),
        age = input.age.trim(),
        genre = input.favorite_genre.trim(),
        band = input.favorite_band.trim(),
        mood = mood,
        heart_rate = heart_rate,
        steps = steps,
        activity = activity,
        location = location,
        weather = weather,
        headline = headline,
    )
}
