//! The matching engine core: candidate pool construction, two-pass ranking,
//! match recording, feedback processing, and tick orchestration.
//!
//! `kindred-core` owns the data model and the trait seams; this crate owns
//! the algorithms that implement them. `kindred-llm`'s heuristic provider
//! depends on this crate to reuse [`small_pass::heuristic_small_pass`] and
//! [`large_pass::heuristic_large_pass`] rather than duplicating the formulas.

pub mod availability;
pub mod candidate_pool;
pub mod feedback;
pub mod large_pass;
pub mod match_recorder;
pub mod orchestrator;
pub mod small_pass;

pub use availability::weekly_overlap_minutes;
pub use candidate_pool::build_candidate_pool;
pub use feedback::process_feedback_queue;
pub use large_pass::heuristic_large_pass;
pub use match_recorder::{record_matches, PersonaMatchBudget};
pub use orchestrator::run_engine_tick;
pub use small_pass::{heuristic_small_pass, SmallPassScore};
