//! Pattern Brain - rule-based replies for when no model backend is reachable.
//!
//! [`PatternMatcher`] normalises a message, walks its rules in order and
//! returns a canned reply from the first rule that matches. It has no I/O and
//! cannot fail, which makes it the terminal step of the chat fallback chain.
//!
//! # Example
//!
//! ```rust
//! use pattern_brain::{PatternMatcher, RulePattern};
//!
//! let matcher = PatternMatcher::new();
//! assert_eq!(matcher.matching_pattern("hello there").as_deref(), Some("greeting"));
//!
//! matcher.add_custom_pattern(RulePattern::new(
//!     "weather",
//!     |text: &str| text.contains("weather"),
//!     ["I can't check the weather right now."],
//! ));
//! assert_eq!(matcher.respond("how's the weather?"), "I can't check the weather right now.");
//! ```

mod matcher;
mod normalize;
mod patterns;

pub use matcher::PatternMatcher;
pub use normalize::normalize;
pub use patterns::{builtin_patterns, Predicate, RulePattern, FILLER_RESPONSES};
