//! Artifact synthesis for the final generation step.
//!
//! No media is produced: [`MockSynthesizer`] assembles a catalog entry from
//! the job's fields and picks thumbnail/media URIs from a fixed per-kind
//! asset pool.

use chrono::Utc;
use genstream_core::content::{ContentArtifact, ContentKind, SYNTHETIC_TAG};
use genstream_core::generation::{artifact_description, artifact_title};
use genstream_core::job::Job;
use uuid::Uuid;

/// Failure while turning a finished job into an artifact.
///
/// Never returned to a submitter; the processor records it as a failed job.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The asset pool for a kind has no entries to pick from.
    #[error("No {0} assets available")]
    NoAssets(ContentKind),

    /// Any other synthesis failure.
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// The synthesizer panicked; carries the panic message.
    #[error("Synthesizer panicked: {0}")]
    Panicked(String),
}

/// Produces the artifact for a job that reached its final step.
pub trait ArtifactSynthesizer: Send + Sync {
    fn synthesize(&self, job: &Job) -> Result<ContentArtifact, GenerationError>;
}

// ---------------------------------------------------------------------------
// Asset pools
// ---------------------------------------------------------------------------

const VIDEO_THUMBNAILS: &[&str] = &[
    "https://images.pexels.com/photos/7991579/pexels-photo-7991579.jpeg?auto=compress&cs=tinysrgb&w=800",
    "https://images.pexels.com/photos/2524874/pexels-photo-2524874.jpeg?auto=compress&cs=tinysrgb&w=800",
    "https://images.pexels.com/photos/147411/italy-mountains-dawn-daybreak-147411.jpeg?auto=compress&cs=tinysrgb&w=800",
];

const VIDEO_MEDIA: &[&str] = &["https://sample-videos.com/zip/10/mp4/SampleVideo_1280x720_1mb.mp4"];

const MUSIC_THUMBNAILS: &[&str] = &[
    "https://images.pexels.com/photos/1105666/pexels-photo-1105666.jpeg?auto=compress&cs=tinysrgb&w=800",
    "https://images.pexels.com/photos/164821/pexels-photo-164821.jpeg?auto=compress&cs=tinysrgb&w=800",
    "https://images.pexels.com/photos/167636/pexels-photo-167636.jpeg?auto=compress&cs=tinysrgb&w=800",
];

const MUSIC_MEDIA: &[&str] = &["https://www.soundjay.com/misc/sounds/bell-ringing-05.wav"];

/// Thumbnail and media URIs available for one content kind.
#[derive(Debug, Clone, Default)]
pub struct AssetPool {
    pub thumbnails: Vec<String>,
    pub media: Vec<String>,
}

impl AssetPool {
    pub fn new(thumbnails: &[&str], media: &[&str]) -> Self {
        Self {
            thumbnails: thumbnails.iter().map(|s| s.to_string()).collect(),
            media: media.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Built-in pool for a kind.
    pub fn builtin(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Video => Self::new(VIDEO_THUMBNAILS, VIDEO_MEDIA),
            ContentKind::Music => Self::new(MUSIC_THUMBNAILS, MUSIC_MEDIA),
        }
    }

    /// Pick a (thumbnail, media) pair using `seed` as the index source.
    fn pick(&self, seed: u64) -> Option<(&str, &str)> {
        let thumbnail = pick_from(&self.thumbnails, seed)?;
        let media = pick_from(&self.media, seed)?;
        Some((thumbnail, media))
    }
}

fn pick_from(items: &[String], seed: u64) -> Option<&str> {
    if items.is_empty() {
        return None;
    }
    let index = (seed % items.len() as u64) as usize;
    items.get(index).map(String::as_str)
}

/// 64-bit FNV-1a; stable across runs and toolchains, unlike `DefaultHasher`.
fn stable_hash(text: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    text.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

// ---------------------------------------------------------------------------
// MockSynthesizer
// ---------------------------------------------------------------------------

/// Deterministic synthesizer backed by fixed asset pools.
///
/// Everything except the artifact id and timestamp is a pure function of the
/// job's kind, prompt, style, and duration.
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    video: AssetPool,
    music: AssetPool,
}

impl MockSynthesizer {
    pub fn new(video: AssetPool, music: AssetPool) -> Self {
        Self { video, music }
    }

    fn pool(&self, kind: ContentKind) -> &AssetPool {
        match kind {
            ContentKind::Video => &self.video,
            ContentKind::Music => &self.music,
        }
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new(
            AssetPool::builtin(ContentKind::Video),
            AssetPool::builtin(ContentKind::Music),
        )
    }
}

impl ArtifactSynthesizer for MockSynthesizer {
    fn synthesize(&self, job: &Job) -> Result<ContentArtifact, GenerationError> {
        let (thumbnail, media) = self
            .pool(job.kind)
            .pick(stable_hash(&job.prompt))
            .ok_or(GenerationError::NoAssets(job.kind))?;

        Ok(ContentArtifact {
            id: Uuid::new_v4(),
            title: artifact_title(job.kind, &job.prompt),
            description: artifact_description(job.kind, &job.prompt, &job.style),
            thumbnail_uri: thumbnail.to_string(),
            duration_secs: job.duration_secs,
            kind: job.kind,
            genre: job.style.clone(),
            is_synthetic: true,
            media_uri: media.to_string(),
            views: 0,
            likes: 0,
            tags: vec![job.style.to_lowercase(), SYNTHETIC_TAG.to_string()],
            created_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
