// bubbles/mod.rs
// Bubble identification and history: connected-component tagging, tag
// correlation across iterations, transition grouping and the lifecycle
// ledger with its pressure feedback.

mod correlate;
mod ledger;
mod tagger;
mod transitions;

pub use correlate::*;
pub use ledger::*;
pub use tagger::*;
pub use transitions::*;

#[cfg(test)]
#[path = "tests/lifecycle.rs"]
mod lifecycle;
