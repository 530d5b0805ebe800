//! Generation request model, style/mood catalogues, and validation.
//!
//! Pure functions shared by the job registry and the artifact synthesizer.
//! Lives in `core` so the pipeline crate owns only the stateful parts.

use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::error::CoreError;
use crate::tiers::TierLimits;

// ---------------------------------------------------------------------------
// Style and mood catalogues
// ---------------------------------------------------------------------------

/// Styles offered for video generation.
pub const VIDEO_STYLES: &[&str] = &[
    "Cinematic",
    "Anime",
    "Realistic",
    "Abstract",
    "Sci-Fi",
    "Fantasy",
    "Documentary",
];

/// Styles offered for music generation.
pub const MUSIC_STYLES: &[&str] = &[
    "Pop",
    "Rock",
    "Classical",
    "Jazz",
    "Electronic",
    "Hip-Hop",
    "Ambient",
    "Folk",
];

/// Moods offered for either kind.
pub const MOODS: &[&str] = &[
    "Happy",
    "Sad",
    "Energetic",
    "Calm",
    "Mysterious",
    "Romantic",
    "Epic",
    "Dark",
];

/// Number of prompt characters kept in a generated title.
pub const TITLE_PROMPT_CHARS: usize = 30;

/// Styles available for a content kind.
pub fn available_styles(kind: ContentKind) -> &'static [&'static str] {
    match kind {
        ContentKind::Video => VIDEO_STYLES,
        ContentKind::Music => MUSIC_STYLES,
    }
}

/// Resolve `input` against `allowed`, ignoring ASCII case, and return the
/// canonical spelling.
fn canonical<'a>(allowed: &[&'a str], input: &str) -> Option<&'a str> {
    let input = input.trim();
    allowed
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(input))
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A caller's generation submission, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: ContentKind,
    pub prompt: String,
    pub style: String,
    pub mood: Option<String>,
    pub duration_secs: u32,
}

impl GenerationRequest {
    pub fn new(
        kind: ContentKind,
        prompt: impl Into<String>,
        style: impl Into<String>,
        duration_secs: u32,
    ) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            style: style.into(),
            mood: None,
            duration_secs,
        }
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }
}

/// A request that passed validation, with style and mood in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub kind: ContentKind,
    pub prompt: String,
    pub style: &'static str,
    pub mood: Option<&'static str>,
    pub duration_secs: u32,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a prompt.
///
/// Rules:
/// - Must not be empty or whitespace-only.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    Ok(())
}

/// Validate a style for the given kind, returning its canonical name.
pub fn validate_style(kind: ContentKind, style: &str) -> Result<&'static str, CoreError> {
    let allowed = available_styles(kind);
    canonical(allowed, style).ok_or_else(|| {
        CoreError::Validation(format!(
            "Invalid {kind} style '{style}'. Must be one of: {}",
            allowed.join(", ")
        ))
    })
}

/// Validate an optional mood, returning its canonical name.
pub fn validate_mood(mood: Option<&str>) -> Result<Option<&'static str>, CoreError> {
    match mood {
        None => Ok(None),
        Some(m) if m.trim().is_empty() => Ok(None),
        Some(m) => canonical(MOODS, m).map(Some).ok_or_else(|| {
            CoreError::Validation(format!(
                "Invalid mood '{m}'. Must be one of: {}",
                MOODS.join(", ")
            ))
        }),
    }
}

/// Validate a full submission against the caller's tier limits.
pub fn validate_request(
    request: &GenerationRequest,
    limits: &TierLimits,
) -> Result<ValidatedRequest, CoreError> {
    validate_prompt(&request.prompt)?;
    let style = validate_style(request.kind, &request.style)?;
    let mood = validate_mood(request.mood.as_deref())?;
    limits.check_duration(request.duration_secs)?;
    limits.check_credits()?;

    Ok(ValidatedRequest {
        kind: request.kind,
        prompt: request.prompt.trim().to_string(),
        style,
        mood,
        duration_secs: request.duration_secs,
    })
}

// ---------------------------------------------------------------------------
// Artifact text
// ---------------------------------------------------------------------------

/// Title for a generated artifact: the kind plus the start of the prompt.
///
/// The prompt is cut at [`TITLE_PROMPT_CHARS`] characters and `...` is
/// appended only when a cut happened, so short prompts keep a clean title.
/// Trailing whitespace before the marker is dropped.
pub fn artifact_title(kind: ContentKind, prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(TITLE_PROMPT_CHARS).collect();
    if chars.next().is_some() {
        format!("Generated {kind}: {}...", head.trim_end())
    } else {
        format!("Generated {kind}: {head}")
    }
}

/// Description for a generated artifact.
pub fn artifact_description(kind: ContentKind, prompt: &str, style: &str) -> String {
    format!("AI-generated {kind} based on: \"{prompt}\" with {style} style")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn music(prompt: &str, style: &str, duration: u32) -> GenerationRequest {
        GenerationRequest::new(ContentKind::Music, prompt, style, duration)
    }

    // -- Prompt --

    #[test]
    fn prompt_whitespace_only_is_empty() {
        assert_matches!(validate_prompt("   "), Err(CoreError::Validation(_)));
    }

    #[test]
    fn long_prompt_is_accepted() {
        let long = "a".repeat(5000);
        assert!(validate_prompt(&long).is_ok());
    }

    // -- Style --

    #[test]
    fn style_is_canonicalised() {
        assert_eq!(
            validate_style(ContentKind::Music, "electronic").unwrap(),
            "Electronic"
        );
    }

    #[test]
    fn style_from_other_kind_is_rejected() {
        assert_matches!(
            validate_style(ContentKind::Music, "Cinematic"),
            Err(CoreError::Validation(_))
        );
    }

    // -- Mood --

    #[test]
    fn mood_absent_or_blank_is_none() {
        assert_eq!(validate_mood(None).unwrap(), None);
        assert_eq!(validate_mood(Some("  ")).unwrap(), None);
    }

    #[test]
    fn unknown_mood_is_rejected() {
        assert!(validate_mood(Some("Grumpy")).is_err());
    }

    // -- Full request --

    #[test]
    fn valid_request_passes() {
        let request = music("Upbeat synth", "Electronic", 30).with_mood("energetic");
        let validated = validate_request(&request, &TierLimits::new(10, 30)).unwrap();
        assert_eq!(validated.style, "Electronic");
        assert_eq!(validated.mood, Some("Energetic"));
        assert_eq!(validated.duration_secs, 30);
    }

    #[test]
    fn duration_over_tier_max_fails() {
        let request = music("Upbeat synth", "Electronic", 400);
        assert_matches!(
            validate_request(&request, &TierLimits::new(10, 30)),
            Err(CoreError::Validation(_))
        );
    }

    // -- Artifact text --

    #[test]
    fn short_prompt_title_has_no_ellipsis() {
        assert_eq!(
            artifact_title(ContentKind::Music, "Upbeat synth"),
            "Generated music: Upbeat synth"
        );
    }

    #[test]
    fn long_prompt_title_is_truncated() {
        let title = artifact_title(
            ContentKind::Video,
            "A very long prompt that keeps going well past thirty characters",
        );
        assert_eq!(title, "Generated video: A very long prompt that keeps...");
    }

    #[test]
    fn description_mentions_prompt_and_style() {
        let description = artifact_description(ContentKind::Music, "Upbeat synth", "Electronic");
        assert_eq!(
            description,
            "AI-generated music based on: \"Upbeat synth\" with Electronic style"
        );
    }
}
