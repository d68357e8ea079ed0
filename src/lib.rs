//! Sleep Skip
//!
//! Skips the night in a multiplayer world once enough players are asleep.
//!
//! ## Architecture
//!
//! ```text
//! SleepAgent  (driver.rs)            ← tokio tick loop + inbound events
//!   └── SleepEvaluator  (evaluator.rs)  ← single authority for transitions
//!         ├── SessionRegistry    (session.rs)    ← per-world sessions
//!         ├── BedEventController (controller.rs) ← bed enter/leave
//!         ├── ThresholdCalculator (threshold.rs) ← required sleepers
//!         ├── TimeTransition     (transition.rs) ← instant / smooth sunrise
//!         └── WakeSequencer      (wake.rs)       ← day, buffs, messages
//! ```
//!
//! The core talks to its server only through the traits in [`host`].
//! [`local::LocalServer`] implements them in memory.

// Core modules are always available (no server feature needed).
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod local;
pub mod protocol;
pub mod session;
pub mod settings;
pub mod threshold;
pub mod transition;
pub mod types;
pub mod wake;

// The async driver requires the `server` feature.
#[cfg(feature = "server")]
pub mod driver;

// Convenience re-exports
#[cfg(feature = "server")]
pub use driver::{SleepAgent, SleepAgentConfig};
pub use controller::{BedEventController, BedOutcome};
pub use error::{HostError, SettingsError};
pub use evaluator::{SleepEvaluator, TickReport};
pub use host::{BuffGrantor, Host, Messenger, PopulationSource, WorldControl};
pub use session::{SessionRegistry, SleepSession, WorldEntry};
pub use settings::{CounterMode, SkipMode, SleepSettings};
pub use threshold::ThresholdCalculator;
pub use transition::{TimeTransition, TransitionKind, TransitionState};
pub use types::{PlayerId, PopulationSnapshot, SleepStats, WorldKey, WorldKind};
pub use wake::{WakeReport, WakeSequencer};
