//! Milestone messenger — scripted, multi-voice conversational message
//! bundles keyed to discrete course milestones.
//!
//! Unlike the recovery sequences, which react to elapsed time, milestones
//! react to events (opt-in, a specific lesson completed, exam passed) and
//! produce a coach message plus simulated peer replies for the community
//! feed. This crate is a pure lookup/rendering component: each peer message
//! carries a relative delay label, and honoring those delays is the
//! dispatcher's job.

pub mod library;
pub mod messages;

pub use library::MessageLibrary;
pub use messages::{
    MessageBundle, MilestoneTrigger, PeerMessage, RenderedBundle, RenderedPeerMessage,
};
