//! # Pushup-Engine
//!
//! Real-time push-up repetition counting from streamed 2D pose landmarks.
//!
//! A pose estimator upstream produces one [`pushup_core::FramePose`] per video
//! frame. This crate turns that stream into a debounced repetition count, a
//! movement phase and one line of coaching feedback per frame.
//!
//! ## Pipeline Stages
//!
//! 1. **Validation**: Reject frames missing the upper body or hips
//! 2. **Features**: Elbow angle, body alignment angle and arm asymmetry
//! 3. **Smoothing**: Moving average over the last few frames
//! 4. **State Machine**: Debounced phase tracking and repetition counting
//! 5. **Form Checks**: Non-blocking warnings overlaid on the feedback
//!
//! ## Phases
//!
//! - **NotInPosition**: Not yet (or no longer) in a usable push-up posture
//! - **Up**: Arms extended at the top
//! - **GoingDown** / **GoingUp**: Transitional, between thresholds
//! - **Down**: Arms flexed at the bottom
//!
//! A repetition counts on the return to `Up` only when `Down` was reached in
//! the same cycle and the previous repetition is far enough in the past.

pub mod config;
pub mod engine;
pub mod features;
pub mod filtering;
pub mod session;
pub mod state_machine;
pub mod validator;

pub use config::*;
pub use engine::*;
pub use features::*;
pub use filtering::*;
pub use session::*;
pub use state_machine::*;
pub use validator::*;
