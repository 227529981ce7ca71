//! Test module organization for the sequential queue

pub mod ordering;
pub mod lifecycle;
