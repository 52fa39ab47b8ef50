//! Bundle catalog keyed by (trigger, optional lesson).

use std::collections::HashMap;

use tracing::debug;

use crate::messages::{MessageBundle, MilestoneTrigger, PeerMessage};

type BundleKey = (MilestoneTrigger, Option<u32>);

/// Lookup table of authored message bundles. Absence of a bundle is an
/// expected, common case (most lesson numbers have none) and is reported as
/// `None`, never as an error.
pub struct MessageLibrary {
    bundles: HashMap<BundleKey, MessageBundle>,
}

impl MessageLibrary {
    pub fn new() -> Self {
        Self {
            bundles: HashMap::new(),
        }
    }

    /// Register a bundle. The lesson number is part of the key only for
    /// `lesson_complete`; for every other trigger it is normalized away.
    pub fn insert(&mut self, bundle: MessageBundle) {
        let lesson = match bundle.trigger {
            MilestoneTrigger::LessonComplete => bundle.lesson,
            _ => None,
        };
        self.bundles.insert((bundle.trigger, lesson), bundle);
    }

    /// Look up the bundle for a trigger. The lesson argument participates
    /// only for `lesson_complete`; any other trigger ignores it.
    pub fn get(&self, trigger: MilestoneTrigger, lesson: Option<u32>) -> Option<&MessageBundle> {
        let lesson_key = match trigger {
            MilestoneTrigger::LessonComplete => lesson,
            _ => None,
        };
        let bundle = self.bundles.get(&(trigger, lesson_key));
        if bundle.is_none() {
            debug!(%trigger, ?lesson, "no milestone bundle defined");
        }
        bundle
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// The platform's authored bundles for the certification mini-course:
    /// opt-in welcome, lesson checkpoints, exam passed, and the stuck/nudge
    /// conditions.
    pub fn builtin() -> Self {
        let mut library = Self::new();

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::OptIn,
            lesson: None,
            coach_name: "Coach Sarah".to_string(),
            coach_text: "Welcome to the program, {{first_name}}! I'm Sarah, your coach for \
                         the next ten lessons. You've just taken the biggest step most people \
                         never take: starting. Lesson 1 is short — about twelve minutes — and \
                         it covers the one habit-change principle everything else builds on. \
                         I'll be right here in this thread whenever you have questions."
                .to_string(),
            peers: vec![
                PeerMessage {
                    peer_name: "Maya".to_string(),
                    delay: "2min".to_string(),
                    variants: vec![
                        "Welcome {{first_name}}! I started last month and lesson 1 genuinely \
                         changed how I talk to clients. — {{peer_name}}"
                            .to_string(),
                        "Hey {{first_name}}, good to have you here! This community is the best \
                         part of the course. — {{peer_name}}"
                            .to_string(),
                    ],
                },
                PeerMessage {
                    peer_name: "Tom".to_string(),
                    delay: "6min".to_string(),
                    variants: vec![
                        "Same boat {{first_name}}, just got through lesson 2 myself. See you in \
                         the thread! — {{peer_name}}"
                            .to_string(),
                    ],
                },
            ],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::LessonComplete,
            lesson: Some(1),
            coach_name: "Coach Sarah".to_string(),
            coach_text: "Lesson 1 done, {{first_name}} — that's the hardest one, because it's \
                         the one most people never open. Did the intake-conversation framework \
                         land for you? Lesson 2 puts it into practice with a real client \
                         scenario."
                .to_string(),
            peers: vec![PeerMessage {
                peer_name: "Jess".to_string(),
                delay: "3min".to_string(),
                variants: vec![
                    "Nice one {{first_name}}! The intake framework was my lightbulb moment \
                     too. — {{peer_name}}"
                        .to_string(),
                    "Congrats on lesson 1, {{first_name}}! It only gets better from here. \
                     — {{peer_name}}"
                        .to_string(),
                ],
            }],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::LessonComplete,
            lesson: Some(3),
            coach_name: "Coach Sarah".to_string(),
            coach_text: "Three lessons in, {{first_name}}. You now have the full assessment \
                         toolkit — most working coaches never formalize this. Lesson 4 is \
                         where we start building your own coaching protocol, so keep the \
                         worksheet from lesson 3 handy."
                .to_string(),
            peers: vec![PeerMessage {
                peer_name: "Priya".to_string(),
                delay: "4min".to_string(),
                variants: vec![
                    "{{first_name}} you're flying! Lesson 4 was my favourite. — {{peer_name}}"
                        .to_string(),
                ],
            }],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::LessonComplete,
            lesson: Some(5),
            coach_name: "Coach Sarah".to_string(),
            coach_text: "{{first_name}}, you're officially halfway to your certificate! Five \
                         lessons down, five to go. This is the point where the material shifts \
                         from theory to client work, and honestly it's where the course gets \
                         fun. Take a second to look back at your lesson 1 notes — you'll be \
                         surprised how far you've come."
                .to_string(),
            peers: vec![
                PeerMessage {
                    peer_name: "Maya".to_string(),
                    delay: "2min".to_string(),
                    variants: vec![
                        "Halfway club!! Welcome {{first_name}} 🎉 — {{peer_name}}".to_string(),
                        "{{first_name}} that was fast, well done! — {{peer_name}}".to_string(),
                    ],
                },
                PeerMessage {
                    peer_name: "Elena".to_string(),
                    delay: "retroactive-1h".to_string(),
                    variants: vec![
                        "I remember hitting lesson 5, {{first_name}} — the second half flew by \
                         for me. — {{peer_name}}"
                            .to_string(),
                    ],
                },
            ],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::LessonComplete,
            lesson: Some(8),
            coach_name: "Coach Sarah".to_string(),
            coach_text: "Lesson 8 complete, {{first_name}} — only two to go. The last two \
                         lessons are the capstone case study, and everything you've done so \
                         far feeds into it. Block out a quiet hour for lesson 9 if you can."
                .to_string(),
            peers: vec![PeerMessage {
                peer_name: "Tom".to_string(),
                delay: "5min".to_string(),
                variants: vec![
                    "So close {{first_name}}! The capstone is worth it. — {{peer_name}}"
                        .to_string(),
                ],
            }],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::LessonComplete,
            lesson: Some(10),
            coach_name: "Coach Sarah".to_string(),
            coach_text: "That's all ten lessons, {{first_name}}! One step left: the \
                         certification exam. It's open-book, forty minutes, and you've already \
                         covered every question in the lessons. Most students pass on their \
                         first try — go claim your certificate."
                .to_string(),
            peers: vec![PeerMessage {
                peer_name: "Priya".to_string(),
                delay: "3min".to_string(),
                variants: vec![
                    "Take the exam today {{first_name}}, while it's all fresh! That's what I \
                     did. — {{peer_name}}"
                        .to_string(),
                ],
            }],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::ExamPassed,
            lesson: None,
            coach_name: "Coach Sarah".to_string(),
            coach_text: "CONGRATULATIONS, {{first_name}}!! You passed — you are now a \
                         certified health coach. Your certificate is ready to download from \
                         your dashboard, and it's ready to go on your website and LinkedIn \
                         today. It has been a privilege coaching you through this. If you're \
                         thinking about the advanced practitioner track, watch your inbox this \
                         week."
                .to_string(),
            peers: vec![
                PeerMessage {
                    peer_name: "Maya".to_string(),
                    delay: "2min".to_string(),
                    variants: vec![
                        "CONGRATS {{first_name}}!!! Certified!! 🎓 — {{peer_name}}".to_string(),
                        "Huge, {{first_name}}! Welcome to the certified side. — {{peer_name}}"
                            .to_string(),
                    ],
                },
                PeerMessage {
                    peer_name: "Jess".to_string(),
                    delay: "10min".to_string(),
                    variants: vec![
                        "So happy for you {{first_name}}, you earned it! — {{peer_name}}"
                            .to_string(),
                    ],
                },
            ],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::NeverLoggedIn24h,
            lesson: None,
            coach_name: "Coach Sarah".to_string(),
            coach_text: "Hey {{first_name}}, Sarah here. Your seat in the certification \
                         program is reserved but your first lesson is still waiting. It takes \
                         about twelve minutes — want to knock it out today? Your login link is \
                         in your welcome email."
                .to_string(),
            peers: vec![],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::StuckMidCourse48h,
            lesson: None,
            coach_name: "Coach Sarah".to_string(),
            coach_text: "{{first_name}}, I noticed you haven't been back in a couple of days. \
                         Totally normal — the middle stretch is where life gets in the way. \
                         Your progress is saved exactly where you left it. Ten minutes today \
                         keeps the momentum; want me to hold you to it?"
                .to_string(),
            peers: vec![PeerMessage {
                peer_name: "Elena".to_string(),
                delay: "15min".to_string(),
                variants: vec![
                    "I stalled at the same point, {{first_name}} — coming back was easier than \
                     I thought. — {{peer_name}}"
                        .to_string(),
                ],
            }],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::Deadline48h,
            lesson: None,
            coach_name: "Coach Sarah".to_string(),
            coach_text: "{{first_name}}, quick heads-up: your program access closes in 48 \
                         hours. You've come too far to leave the certificate on the table. \
                         Here's exactly what's left for you — log in and I'll walk you through \
                         the fastest path to finish."
                .to_string(),
            peers: vec![],
        });

        library.insert(MessageBundle {
            trigger: MilestoneTrigger::Deadline24h,
            lesson: None,
            coach_name: "Coach Sarah".to_string(),
            coach_text: "Final call, {{first_name}} — 24 hours left on your access. The exam \
                         takes forty minutes and you're closer than you think. I'd love to see \
                         your name on a certificate tomorrow."
                .to_string(),
            peers: vec![],
        });

        library
    }
}

impl Default for MessageLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}
