//! Subscription tiers and the submission limits they imply.
//!
//! The generation core only reads these limits at submission time. Credit
//! bookkeeping (deduction, monthly resets) belongs to the account layer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Shortest video a caller may request, in seconds.
pub const MIN_VIDEO_DURATION_SECS: u32 = 15;
/// Shortest music track a caller may request, in seconds.
pub const MIN_MUSIC_DURATION_SECS: u32 = 10;

/// Longest duration on the free tier.
pub const FREE_MAX_DURATION_SECS: u32 = 30;
/// Longest duration on the pro tier.
pub const PRO_MAX_DURATION_SECS: u32 = 300;
/// Longest duration on the premium tier.
pub const PREMIUM_MAX_DURATION_SECS: u32 = 1200;

// ---------------------------------------------------------------------------
// Subscription tier
// ---------------------------------------------------------------------------

/// Subscription plan a caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Premium,
}

/// Per-plan quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    /// Monthly video generations; `None` means unlimited.
    pub video_generations: Option<u32>,
    /// Monthly music generations; `None` means unlimited.
    pub music_generations: Option<u32>,
    pub max_duration_secs: u32,
    pub priority: bool,
}

impl SubscriptionTier {
    pub fn plan_limits(self) -> PlanLimits {
        match self {
            SubscriptionTier::Free => PlanLimits {
                video_generations: Some(2),
                music_generations: Some(5),
                max_duration_secs: FREE_MAX_DURATION_SECS,
                priority: false,
            },
            SubscriptionTier::Pro => PlanLimits {
                video_generations: Some(20),
                music_generations: Some(50),
                max_duration_secs: PRO_MAX_DURATION_SECS,
                priority: true,
            },
            SubscriptionTier::Premium => PlanLimits {
                video_generations: None,
                music_generations: None,
                max_duration_secs: PREMIUM_MAX_DURATION_SECS,
                priority: true,
            },
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(CoreError::Validation(format!(
                "Unknown subscription tier '{other}'. Must be one of: free, pro, premium"
            ))),
        }
    }
}

impl PlanLimits {
    /// Monthly allowance for one kind; `None` means unlimited.
    pub fn generations_for(&self, kind: ContentKind) -> Option<u32> {
        match kind {
            ContentKind::Video => self.video_generations,
            ContentKind::Music => self.music_generations,
        }
    }
}

/// Minimum duration for a content kind.
pub fn min_duration_secs(kind: ContentKind) -> u32 {
    match kind {
        ContentKind::Video => MIN_VIDEO_DURATION_SECS,
        ContentKind::Music => MIN_MUSIC_DURATION_SECS,
    }
}

// ---------------------------------------------------------------------------
// Tier limits (submission-time input)
// ---------------------------------------------------------------------------

/// Constraints supplied by the caller's account at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
    /// Credits left for the requested kind; `None` means unlimited.
    pub credits_remaining: Option<u32>,
}

impl TierLimits {
    /// Explicit duration bounds with unlimited credits.
    pub fn new(min_duration_secs: u32, max_duration_secs: u32) -> Self {
        Self {
            min_duration_secs,
            max_duration_secs,
            credits_remaining: None,
        }
    }

    /// Limits a plan grants for one content kind, with a full credit
    /// allowance.
    pub fn for_tier(tier: SubscriptionTier, kind: ContentKind) -> Self {
        let plan = tier.plan_limits();
        Self {
            min_duration_secs: min_duration_secs(kind),
            max_duration_secs: plan.max_duration_secs,
            credits_remaining: plan.generations_for(kind),
        }
    }

    /// Replace the remaining credit count.
    pub fn with_credits(mut self, credits_remaining: Option<u32>) -> Self {
        self.credits_remaining = credits_remaining;
        self
    }

    /// Check a requested duration against these bounds.
    pub fn check_duration(&self, duration_secs: u32) -> Result<(), CoreError> {
        if duration_secs == 0 {
            return Err(CoreError::Validation(
                "duration_secs must be positive".to_string(),
            ));
        }
        if duration_secs < self.min_duration_secs || duration_secs > self.max_duration_secs {
            return Err(CoreError::Validation(format!(
                "duration_secs {duration_secs} is outside the allowed range {}..={}",
                self.min_duration_secs, self.max_duration_secs
            )));
        }
        Ok(())
    }

    /// Check that at least one credit is available.
    pub fn check_credits(&self) -> Result<(), CoreError> {
        match self.credits_remaining {
            Some(0) => Err(CoreError::Validation(
                "No generation credits remaining for this plan".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("Premium".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Premium);
        assert_eq!(" pro ".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Pro);
        assert_matches!("gold".parse::<SubscriptionTier>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn free_tier_music_limits() {
        let limits = TierLimits::for_tier(SubscriptionTier::Free, ContentKind::Music);
        assert_eq!(limits.min_duration_secs, 10);
        assert_eq!(limits.max_duration_secs, 30);
        assert_eq!(limits.credits_remaining, Some(5));
    }

    #[test]
    fn premium_tier_is_unlimited() {
        let limits = TierLimits::for_tier(SubscriptionTier::Premium, ContentKind::Video);
        assert_eq!(limits.min_duration_secs, 15);
        assert_eq!(limits.max_duration_secs, 1200);
        assert!(limits.credits_remaining.is_none());
    }

    #[test]
    fn duration_within_bounds_is_accepted() {
        let limits = TierLimits::new(10, 30);
        assert!(limits.check_duration(10).is_ok());
        assert!(limits.check_duration(30).is_ok());
    }

    #[test]
    fn duration_above_max_is_rejected() {
        let limits = TierLimits::new(10, 30);
        assert_matches!(limits.check_duration(400), Err(CoreError::Validation(_)));
    }

    #[test]
    fn duration_below_min_is_rejected() {
        let limits = TierLimits::for_tier(SubscriptionTier::Pro, ContentKind::Video);
        assert_matches!(limits.check_duration(10), Err(CoreError::Validation(_)));
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(TierLimits::new(0, 30).check_duration(0).is_err());
    }

    #[test]
    fn exhausted_credits_are_rejected() {
        let limits = TierLimits::new(10, 30).with_credits(Some(0));
        assert_matches!(limits.check_credits(), Err(CoreError::Validation(_)));
        assert!(limits.with_credits(Some(1)).check_credits().is_ok());
    }
}
