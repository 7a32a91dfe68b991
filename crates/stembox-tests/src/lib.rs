//! Integration test crate for StemBox.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the audio and engine crates to verify they work together.

#[cfg(test)]
mod custom_tracks;

#[cfg(test)]
mod fx_scheduling;

#[cfg(test)]
mod mixing;

#[cfg(test)]
mod playback;
