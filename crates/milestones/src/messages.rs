//! Message bundle types and placeholder rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the learner's first name.
pub const FIRST_NAME_TOKEN: &str = "{{first_name}}";
/// Placeholder substituted with the speaking peer's display name.
pub const PEER_NAME_TOKEN: &str = "{{peer_name}}";

const COACH_NAME_FALLBACK: &str = "there";
const PEER_NAME_FALLBACK: &str = "friend";

/// The milestone events and nudge conditions that can produce a message
/// bundle. `LessonComplete` is the only trigger where the lesson number
/// participates in the lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneTrigger {
    OptIn,
    LessonComplete,
    ExamPassed,
    NeverLoggedIn24h,
    StuckMidCourse48h,
    Deadline48h,
    Deadline24h,
}

impl MilestoneTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneTrigger::OptIn => "opt_in",
            MilestoneTrigger::LessonComplete => "lesson_complete",
            MilestoneTrigger::ExamPassed => "exam_passed",
            MilestoneTrigger::NeverLoggedIn24h => "never_logged_in_24h",
            MilestoneTrigger::StuckMidCourse48h => "stuck_mid_course_48h",
            MilestoneTrigger::Deadline48h => "deadline_48h",
            MilestoneTrigger::Deadline24h => "deadline_24h",
        }
    }
}

impl fmt::Display for MilestoneTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestoneTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opt_in" => Ok(MilestoneTrigger::OptIn),
            "lesson_complete" => Ok(MilestoneTrigger::LessonComplete),
            "exam_passed" => Ok(MilestoneTrigger::ExamPassed),
            "never_logged_in_24h" => Ok(MilestoneTrigger::NeverLoggedIn24h),
            "stuck_mid_course_48h" => Ok(MilestoneTrigger::StuckMidCourse48h),
            "deadline_48h" => Ok(MilestoneTrigger::Deadline48h),
            "deadline_24h" => Ok(MilestoneTrigger::Deadline24h),
            other => Err(format!("unknown milestone trigger: {}", other)),
        }
    }
}

/// A simulated peer reply. `delay` is a relative label (`"2min"`,
/// `"retroactive-1h"`, …) interpreted by the dispatcher; `variants` holds
/// interchangeable texts of which one is used per delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMessage {
    pub peer_name: String,
    pub delay: String,
    pub variants: Vec<String>,
}

/// The scripted message set for one milestone: one long-form coach message
/// and zero or more peer replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBundle {
    pub trigger: MilestoneTrigger,
    pub lesson: Option<u32>,
    pub coach_name: String,
    pub coach_text: String,
    pub peers: Vec<PeerMessage>,
}

/// A rendered peer reply, variant chosen and placeholders substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPeerMessage {
    pub peer_name: String,
    pub delay: String,
    pub text: String,
}

/// A fully rendered bundle, ready for the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedBundle {
    pub coach_name: String,
    pub coach_text: String,
    pub peers: Vec<RenderedPeerMessage>,
}

impl MessageBundle {
    /// Render with a random variant per peer message.
    pub fn render(&self, first_name: Option<&str>) -> RenderedBundle {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let pick = rng.gen::<usize>();
        self.render_with_variant(first_name, pick)
    }

    /// Render with a deterministic variant index (taken modulo each peer
    /// message's variant count). Used by tests and replay tooling.
    pub fn render_with_variant(&self, first_name: Option<&str>, variant: usize) -> RenderedBundle {
        let coach_text = substitute(&self.coach_text, first_name, COACH_NAME_FALLBACK, None);

        let peers = self
            .peers
            .iter()
            .map(|peer| {
                let text = if peer.variants.is_empty() {
                    String::new()
                } else {
                    peer.variants[variant % peer.variants.len()].clone()
                };
                RenderedPeerMessage {
                    peer_name: peer.peer_name.clone(),
                    delay: peer.delay.clone(),
                    text: substitute(
                        &text,
                        first_name,
                        PEER_NAME_FALLBACK,
                        Some(&peer.peer_name),
                    ),
                }
            })
            .collect();

        RenderedBundle {
            coach_name: self.coach_name.clone(),
            coach_text,
            peers,
        }
    }
}

/// Replace every occurrence of the name tokens. A missing first name falls
/// back to a generic salutation rather than erroring.
fn substitute(
    text: &str,
    first_name: Option<&str>,
    fallback: &str,
    peer_name: Option<&str>,
) -> String {
    let name = match first_name {
        Some(n) if !n.trim().is_empty() => n,
        _ => fallback,
    };
    let mut rendered = text.replace(FIRST_NAME_TOKEN, name);
    if let Some(peer) = peer_name {
        rendered = rendered.replace(PEER_NAME_TOKEN, peer);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> MessageBundle {
        MessageBundle {
            trigger: MilestoneTrigger::LessonComplete,
            lesson: Some(5),
            coach_name: "Coach Sarah".to_string(),
            coach_text: "Amazing work, {{first_name}} — you're halfway!".to_string(),
            peers: vec![PeerMessage {
                peer_name: "Maya".to_string(),
                delay: "2min".to_string(),
                variants: vec![
                    "Go {{first_name}}!! — {{peer_name}}".to_string(),
                    "Halfway club, {{first_name}}! — {{peer_name}}".to_string(),
                ],
            }],
        }
    }

    #[test]
    fn test_substitution_with_name() {
        let rendered = sample_bundle().render_with_variant(Some("Ana"), 0);
        assert_eq!(rendered.coach_text, "Amazing work, Ana — you're halfway!");
        assert_eq!(rendered.peers[0].text, "Go Ana!! — Maya");
        assert_eq!(rendered.peers[0].delay, "2min");
    }

    #[test]
    fn test_missing_name_falls_back() {
        let rendered = sample_bundle().render_with_variant(None, 0);
        assert_eq!(rendered.coach_text, "Amazing work, there — you're halfway!");
        assert_eq!(rendered.peers[0].text, "Go friend!! — Maya");

        // Whitespace-only names get the fallback too.
        let rendered = sample_bundle().render_with_variant(Some("  "), 0);
        assert!(rendered.coach_text.contains("there"));
    }

    #[test]
    fn test_variant_index_wraps() {
        let bundle = sample_bundle();
        let first = bundle.render_with_variant(Some("Ana"), 0);
        let wrapped = bundle.render_with_variant(Some("Ana"), 2);
        assert_eq!(first.peers[0].text, wrapped.peers[0].text);

        let second = bundle.render_with_variant(Some("Ana"), 1);
        assert_ne!(first.peers[0].text, second.peers[0].text);
    }

    #[test]
    fn test_random_render_picks_a_known_variant() {
        let bundle = sample_bundle();
        let rendered = bundle.render(Some("Ana"));
        let expected: Vec<String> = bundle
            .peers[0]
            .variants
            .iter()
            .map(|v| v.replace("{{first_name}}", "Ana").replace("{{peer_name}}", "Maya"))
            .collect();
        assert!(expected.contains(&rendered.peers[0].text));
    }

    #[test]
    fn test_trigger_round_trips_through_strings() {
        for trigger in [
            MilestoneTrigger::OptIn,
            MilestoneTrigger::LessonComplete,
            MilestoneTrigger::ExamPassed,
            MilestoneTrigger::Deadline24h,
        ] {
            assert_eq!(trigger.as_str().parse::<MilestoneTrigger>(), Ok(trigger));
        }
        assert!("lesson_compete".parse::<MilestoneTrigger>().is_err());
    }
}
