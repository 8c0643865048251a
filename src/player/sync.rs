//! Audio-master A/V sync policy
//!
//! Decides, per video frame, whether to draw it now, sleep and then draw it,
//! or drop it. Audio is the reference clock because audio glitches are far
//! more perceptible than a late or skipped video frame.
//!
//! Both timelines are compared relative to their first observed value after
//! the last [`SyncPolicy::reset`], so the engines do not need to agree on an
//! absolute origin.

use std::fmt;
use std::time::Duration;

use crate::config::SyncThresholds;

/// What the render loop should do with the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Present immediately
    DrawNow,
    /// Video is early: wait `sleep_ms`, then present
    SleepThenDraw { sleep_ms: i64 },
    /// Video is too late: skip presentation
    DropFrame,
}

impl SyncDecision {
    /// Sleep to apply before drawing, if any
    pub fn sleep(&self) -> Option<Duration> {
        match self {
            SyncDecision::SleepThenDraw { sleep_ms } if *sleep_ms > 0 => {
                Some(Duration::from_millis(*sleep_ms as u64))
            }
            _ => None,
        }
    }

    pub fn draws(&self) -> bool {
        !matches!(self, SyncDecision::DropFrame)
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDecision::DrawNow => write!(f, "draw"),
            SyncDecision::SleepThenDraw { sleep_ms } => write!(f, "sleep {}ms then draw", sleep_ms),
            SyncDecision::DropFrame => write!(f, "drop"),
        }
    }
}

/// Anchor-based sync policy
///
/// Not thread-safe on purpose: it is owned by the render loop, which is its
/// only caller.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    thresholds: SyncThresholds,
    video_base: Option<i64>,
    audio_base: Option<i64>,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::new(SyncThresholds::default())
    }
}

impl SyncPolicy {
    pub fn new(thresholds: SyncThresholds) -> Self {
        Self {
            thresholds,
            video_base: None,
            audio_base: None,
        }
    }

    pub fn thresholds(&self) -> &SyncThresholds {
        &self.thresholds
    }

    /// First video PTS observed since the last reset
    pub fn video_base(&self) -> Option<i64> {
        self.video_base
    }

    /// First valid audio clock observed since the last reset
    pub fn audio_base(&self) -> Option<i64> {
        self.audio_base
    }

    /// Forget both anchors; the next decisions establish new ones.
    pub fn reset(&mut self) {
        self.video_base = None;
        self.audio_base = None;
    }

    /// Decide how to handle a frame with PTS `video_pts_ms` given the current audio clock.
    ///
    /// `None` or a non-positive clock means audio has not warmed up yet; the frame is
    /// drawn immediately rather than stalling video.
    pub fn decide(&mut self, video_pts_ms: i64, audio_clock_ms: Option<i64>) -> SyncDecision {
        let video_base = *self.video_base.get_or_insert(video_pts_ms);

        let audio_clock_ms = match audio_clock_ms {
            Some(clock) if clock > 0 => clock,
            _ => return SyncDecision::DrawNow,
        };
        let audio_base = *self.audio_base.get_or_insert(audio_clock_ms);

        let video_rel = video_pts_ms - video_base;
        let audio_rel = audio_clock_ms - audio_base;
        // > 0: video ahead of audio, < 0: video behind audio
        let diff = video_rel - audio_rel;

        if diff > self.thresholds.small_threshold_ms {
            SyncDecision::SleepThenDraw {
                sleep_ms: diff.min(self.thresholds.sleep_cap_ms),
            }
        } else if diff < -self.thresholds.max_late_ms {
            SyncDecision::DropFrame
        } else {
            SyncDecision::DrawNow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored_at(video: i64, audio: i64) -> SyncPolicy {
        let mut policy = SyncPolicy::default();
        assert_eq!(policy.decide(video, Some(audio)), SyncDecision::DrawNow);
        policy
    }

    #[test]
    fn test_no_audio_clock_draws_and_anchors_video_only() {
        let mut policy = SyncPolicy::default();
        policy.reset();

        assert_eq!(policy.decide(5000, None), SyncDecision::DrawNow);
        assert_eq!(policy.video_base(), Some(5000));
        assert_eq!(policy.audio_base(), None);

        // Non-positive clock is treated as not available
        assert_eq!(policy.decide(5040, Some(0)), SyncDecision::DrawNow);
        assert_eq!(policy.decide(5080, Some(-3)), SyncDecision::DrawNow);
        assert_eq!(policy.audio_base(), None);
    }

    #[test]
    fn test_video_ahead_sleeps_with_cap() {
        let mut policy = anchored_at(1000, 1000);
        assert_eq!(
            policy.decide(1150, Some(1000)),
            SyncDecision::SleepThenDraw { sleep_ms: 40 }
        );
    }

    #[test]
    fn test_video_slightly_ahead_sleeps_exact_diff() {
        let mut policy = anchored_at(1000, 1000);
        assert_eq!(
            policy.decide(1025, Some(1000)),
            SyncDecision::SleepThenDraw { sleep_ms: 25 }
        );
        // Exactly at the small threshold is not "ahead"
        assert_eq!(policy.decide(1001, Some(1000)), SyncDecision::DrawNow);
    }

    #[test]
    fn test_video_late_drops() {
        let mut policy = anchored_at(1000, 1000);
        assert_eq!(policy.decide(900, Some(1000)), SyncDecision::DropFrame);
    }

    #[test]
    fn test_late_boundary_is_strict() {
        let mut policy = anchored_at(1000, 1000);
        assert_eq!(policy.decide(920, Some(1000)), SyncDecision::DrawNow);
        assert_eq!(policy.decide(919, Some(1000)), SyncDecision::DropFrame);
    }

    #[test]
    fn test_sleep_never_exceeds_cap() {
        let mut policy = anchored_at(0, 1);
        for ahead in [2_i64, 39, 40, 41, 500, 60_000, i64::MAX / 4] {
            match policy.decide(ahead, Some(1)) {
                SyncDecision::SleepThenDraw { sleep_ms } => {
                    assert!(sleep_ms <= policy.thresholds().sleep_cap_ms)
                }
                other => panic!("expected sleep for ahead={}, got {:?}", ahead, other),
            }
        }
    }

    #[test]
    fn test_relative_anchors_ignore_absolute_offsets() {
        // Audio clock starts at 10s while video PTS start at 0: in sync relative to anchors.
        let mut policy = anchored_at(0, 10_000);
        assert_eq!(policy.decide(40, Some(10_040)), SyncDecision::DrawNow);
        assert_eq!(policy.decide(80, Some(10_200)), SyncDecision::DropFrame);
    }

    #[test]
    fn test_reset_replays_identically() {
        let inputs = [
            (3000, None),
            (3040, Some(500)),
            (3080, Some(520)),
            (3120, Some(700)),
            (3160, Some(540)),
            (3200, Some(600)),
        ];

        let mut policy = SyncPolicy::default();
        let first: Vec<_> = inputs.iter().map(|(v, a)| policy.decide(*v, *a)).collect();
        policy.reset();
        assert_eq!(policy.video_base(), None);
        assert_eq!(policy.audio_base(), None);
        let second: Vec<_> = inputs.iter().map(|(v, a)| policy.decide(*v, *a)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut policy = SyncPolicy::new(SyncThresholds {
            small_threshold_ms: 10,
            sleep_cap_ms: 50,
            max_late_ms: 20,
        });
        assert_eq!(policy.decide(0, Some(100)), SyncDecision::DrawNow);
        assert_eq!(policy.decide(10, Some(100)), SyncDecision::DrawNow);
        assert_eq!(
            policy.decide(200, Some(100)),
            SyncDecision::SleepThenDraw { sleep_ms: 50 }
        );
        assert_eq!(policy.decide(0, Some(121)), SyncDecision::DropFrame);
    }

    #[test]
    fn test_decision_helpers() {
        assert_eq!(
            SyncDecision::SleepThenDraw { sleep_ms: 12 }.sleep(),
            Some(Duration::from_millis(12))
        );
        assert_eq!(SyncDecision::SleepThenDraw { sleep_ms: 0 }.sleep(), None);
        assert_eq!(SyncDecision::DrawNow.sleep(), None);
        assert!(SyncDecision::DrawNow.draws());
        assert!(!SyncDecision::DropFrame.draws());
    }
}
