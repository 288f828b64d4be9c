//! Synthesis primitives shared by the instruments: oscillators, envelopes,
//! the summing bus and the sample clock.

pub mod clock;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
