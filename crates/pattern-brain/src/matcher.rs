//! Rule-based responder.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use brain_core::{Brain, BrainError, InboundMessage, OutboundMessage, TerminalSource};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::normalize::normalize;
use crate::patterns::{builtin_patterns, RulePattern, FILLER_RESPONSES};

/// Reply used when both the matched pattern and the filler set are empty.
const LAST_RESORT_REPLY: &str = "I'm here, but I don't have a good answer for that right now.";

/// Deterministic responder that never fails.
///
/// Patterns are tried in insertion order and the first match wins. A reply is
/// picked uniformly at random from that pattern's responses, or from the
/// filler set when nothing matches.
pub struct PatternMatcher {
    patterns: RwLock<IndexMap<String, RulePattern>>,
    fallback_responses: Vec<String>,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher {
    /// Create a matcher with the built-in rule set and filler replies.
    pub fn new() -> Self {
        Self::with_patterns(
            builtin_patterns(),
            FILLER_RESPONSES.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Create a matcher from an explicit rule list and filler set.
    pub fn with_patterns(patterns: Vec<RulePattern>, fallback_responses: Vec<String>) -> Self {
        let patterns = patterns
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        Self {
            patterns: RwLock::new(patterns),
            fallback_responses,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, RulePattern>> {
        self.patterns.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, RulePattern>> {
        self.patterns.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Produce a reply for a raw user message.
    pub fn respond(&self, message: &str) -> String {
        let normalized = normalize(message);
        let patterns = self.read();

        let matched = patterns.values().find(|p| p.matches(&normalized));
        if let Some(pattern) = matched {
            debug!("Pattern '{}' matched", pattern.name());
            if let Some(reply) = pattern.responses().choose(&mut rand::thread_rng()) {
                return reply.clone();
            }
            debug!("Pattern '{}' has no responses, using filler", pattern.name());
        }

        self.filler()
    }

    fn filler(&self) -> String {
        self.fallback_responses
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| LAST_RESORT_REPLY.to_string())
    }

    /// Name of the first pattern matching `message`, if any.
    pub fn matching_pattern(&self, message: &str) -> Option<String> {
        let normalized = normalize(message);
        self.read()
            .values()
            .find(|p| p.matches(&normalized))
            .map(|p| p.name().to_string())
    }

    /// Register a pattern at runtime.
    ///
    /// Replacing an existing name keeps its position; a new name goes last.
    pub fn add_custom_pattern(&self, pattern: RulePattern) {
        debug!("Registering pattern '{}'", pattern.name());
        self.write().insert(pattern.name().to_string(), pattern);
    }

    /// Whether the named pattern matches `message`. Unknown names never match.
    pub fn matches_pattern(&self, message: &str, name: &str) -> bool {
        let normalized = normalize(message);
        self.read()
            .get(name)
            .map(|p| p.matches(&normalized))
            .unwrap_or(false)
    }

    /// Pattern names in matching order.
    pub fn pattern_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Responses of the named pattern.
    pub fn responses_for(&self, name: &str) -> Option<Vec<String>> {
        self.read().get(name).map(|p| p.responses().to_vec())
    }

    /// The filler set.
    pub fn fallback_responses(&self) -> &[String] {
        &self.fallback_responses
    }
}

#[async_trait]
impl Brain for PatternMatcher {
    async fn process(&self, message: InboundMessage) -> Result<OutboundMessage, BrainError> {
        let reply = self.respond(&message.text);
        Ok(OutboundMessage::reply_to(&message, reply))
    }

    fn name(&self) -> &str {
        "PatternMatcher"
    }
}

impl TerminalSource<InboundMessage, OutboundMessage> for PatternMatcher {
    fn name(&self) -> &str {
        "pattern-matcher"
    }

    fn produce(&self, request: &InboundMessage) -> OutboundMessage {
        OutboundMessage::reply_to(request, self.respond(&request.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{GREETINGS, THANKS, WELLBEING};

    fn is_one_of(reply: &str, set: &[&str]) -> bool {
        set.contains(&reply)
    }

    #[test]
    fn test_hello_gets_greeting() {
        let matcher = PatternMatcher::new();
        for _ in 0..20 {
            assert!(is_one_of(&matcher.respond("hello"), GREETINGS));
        }
    }

    #[test]
    fn test_nonsense_gets_filler() {
        let matcher = PatternMatcher::new();
        let reply = matcher.respond("xyzzy-nonsense");
        assert!(is_one_of(&reply, FILLER_RESPONSES), "unexpected reply: {}", reply);
        assert_eq!(matcher.matching_pattern("xyzzy-nonsense"), None);
    }

    #[test]
    fn test_abbreviations_are_expanded() {
        let matcher = PatternMatcher::new();
        assert_eq!(matcher.matching_pattern("how r u").as_deref(), Some("wellbeing"));
        assert!(is_one_of(&matcher.respond("how r u"), WELLBEING));
        assert!(is_one_of(&matcher.respond("thx"), THANKS));
        assert_eq!(matcher.matching_pattern("ty!").as_deref(), Some("thanks"));
    }

    #[test]
    fn test_first_match_wins() {
        let matcher = PatternMatcher::new();
        // Both greeting and wellbeing match; greeting is declared first.
        assert_eq!(matcher.matching_pattern("hey, how are you?").as_deref(), Some("greeting"));
        // "can you help" is a capabilities phrase, which precedes help.
        assert_eq!(matcher.matching_pattern("can you help me").as_deref(), Some("capabilities"));
    }

    #[test]
    fn test_custom_pattern_goes_last() {
        let matcher = PatternMatcher::new();
        matcher.add_custom_pattern(RulePattern::new(
            "weather",
            |text: &str| text.contains("weather"),
            ["I can't check the weather right now."],
        ));

        assert_eq!(matcher.pattern_names().last().map(String::as_str), Some("weather"));
        assert_eq!(
            matcher.respond("what's the weather like"),
            "I can't check the weather right now."
        );
        assert!(matcher.matches_pattern("weather today", "weather"));
        assert!(!matcher.matches_pattern("weather today", "no-such-pattern"));
    }

    #[test]
    fn test_replacing_pattern_keeps_position() {
        let matcher = PatternMatcher::new();
        let before = matcher.pattern_names();

        matcher.add_custom_pattern(RulePattern::new(
            "greeting",
            |text: &str| text.contains("ahoy"),
            ["Ahoy!"],
        ));

        assert_eq!(matcher.pattern_names(), before);
        assert_eq!(matcher.respond("ahoy matey"), "Ahoy!");
        assert_eq!(matcher.responses_for("greeting"), Some(vec!["Ahoy!".to_string()]));
        // The old greeting predicate is gone.
        assert_eq!(matcher.matching_pattern("hello"), None);
    }

    #[test]
    fn test_pattern_without_responses_uses_filler() {
        let matcher = PatternMatcher::with_patterns(
            vec![RulePattern::new("silent", |_: &str| true, Vec::<String>::new())],
            vec!["filler".to_string()],
        );
        assert_eq!(matcher.respond("anything"), "filler");
    }

    #[test]
    fn test_empty_filler_set_still_answers() {
        let matcher = PatternMatcher::with_patterns(Vec::new(), Vec::new());
        assert_eq!(matcher.respond("anything"), LAST_RESORT_REPLY);
    }

    #[tokio::test]
    async fn test_brain_impl_addresses_sender() {
        let matcher = PatternMatcher::new();
        let reply = matcher
            .process(InboundMessage::direct("u1", "hi", 0))
            .await
            .unwrap();
        assert_eq!(reply.recipient, "u1");
        assert!(is_one_of(&reply.text, GREETINGS));
        assert_eq!(Brain::name(&matcher), "PatternMatcher");
    }

    #[test]
    fn test_terminal_source_impl() {
        let matcher = PatternMatcher::new();
        let reply = matcher.produce(&InboundMessage::direct("u2", "hello", 0));
        assert_eq!(reply.recipient, "u2");
        assert!(is_one_of(&reply.text, GREETINGS));
        assert_eq!(TerminalSource::name(&matcher), "pattern-matcher");
    }
}
