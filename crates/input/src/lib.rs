//! Input: raw key, mouse and scroll events folded into one snapshot per frame.
//!
//! # Invariants
//! - No global state; the frame driver owns one `InputState`.
//! - Mouse and scroll deltas are consumed exactly once, by `take_frame`.
//! - Held actions persist across frames until released.

pub mod action;
mod state;

pub use action::Action;
pub use state::{FrameInput, InputState};

pub fn crate_info() -> &'static str {
    "sierpinski-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
