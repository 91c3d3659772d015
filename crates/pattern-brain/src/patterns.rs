//! Rule patterns and the built-in rule set.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::normalize::{has_any_phrase, has_any_word};

/// Predicate over a normalised message.
pub type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A named rule: a predicate plus the replies to pick from when it matches.
#[derive(Clone)]
pub struct RulePattern {
    name: String,
    matcher: Predicate,
    responses: Vec<String>,
}

impl RulePattern {
    /// Create a pattern from a predicate over normalised text.
    pub fn new<F, S>(
        name: impl Into<String>,
        matcher: F,
        responses: impl IntoIterator<Item = S>,
    ) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            matcher: Arc::new(matcher),
            responses: responses.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a pattern from a regular expression over normalised text.
    pub fn regex<S>(
        name: impl Into<String>,
        pattern: &str,
        responses: impl IntoIterator<Item = S>,
    ) -> Result<Self, regex::Error>
    where
        S: Into<String>,
    {
        let re = Regex::new(pattern)?;
        Ok(Self::new(name, move |text: &str| re.is_match(text), responses))
    }

    /// Create a pattern matching any of the given whole words or phrases.
    pub fn keywords<S>(
        name: impl Into<String>,
        words: &'static [&'static str],
        phrases: &'static [&'static str],
        responses: impl IntoIterator<Item = S>,
    ) -> Self
    where
        S: Into<String>,
    {
        Self::new(
            name,
            move |text: &str| has_any_word(text, words) || has_any_phrase(text, phrases),
            responses,
        )
    }

    /// Pattern name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidate replies.
    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    /// Whether the pattern matches already-normalised text.
    pub fn matches(&self, normalized: &str) -> bool {
        (self.matcher)(normalized)
    }
}

impl fmt::Debug for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulePattern")
            .field("name", &self.name)
            .field("responses", &self.responses.len())
            .finish()
    }
}

/// Replies used when no pattern matches.
pub const FILLER_RESPONSES: &[&str] = &[
    "I'm running in lightweight mode right now, so I might miss some nuance. Could you put that another way?",
    "Interesting! Tell me a bit more about that.",
    "I'm not sure I follow yet. Can you give me a little more detail?",
    "My full brain is taking a short break, but I'm still here. What else is on your mind?",
    "Hmm, that's a good one. I'll need a simpler question while I'm in backup mode.",
];

pub const GREETINGS: &[&str] = &[
    "Hey there! 👋 How can I help you today?",
    "Hello! What's on your mind?",
    "Hi! Great to see you. What can I do for you?",
    "Hey! How's it going?",
];

pub const FAREWELLS: &[&str] = &[
    "Goodbye! Come back anytime.",
    "See you later! 👋",
    "Take care! Talk soon.",
];

pub const THANKS: &[&str] = &[
    "You're welcome!",
    "Happy to help! 😊",
    "Anytime!",
    "No problem at all.",
];

pub const WELLBEING: &[&str] = &[
    "I'm doing well, thanks for asking! How about you?",
    "All good on my side. How are you doing?",
    "Running smoothly! What about you?",
];

pub const IDENTITY: &[&str] = &[
    "I'm the chat assistant for this app. Right now I'm answering in lightweight mode.",
    "I'm your friendly assistant bot, here to chat and help out.",
];

pub const CAPABILITIES: &[&str] = &[
    "I can chat, answer questions, look at images you attach, and even draw pictures. Try \"draw a cat in space\"!",
    "Ask me anything, attach a file for me to read, or say \"generate an image of ...\" and I'll make one.",
];

pub const HELP: &[&str] = &[
    "Happy to help! Tell me what you're working on and where you're stuck.",
    "Sure thing. What do you need help with?",
];

pub const JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs. 🐛",
    "I told my computer I needed a break, and it said: \"No problem, I'll go to sleep.\"",
    "Why did the developer go broke? Because he used up all his cache.",
];

pub const AFFIRMATIONS: &[&str] = &[
    "Great! 😊",
    "Awesome. Anything else?",
    "Sounds good!",
];

pub const APOLOGIES: &[&str] = &[
    "No worries at all!",
    "It's all good. 🙂",
    "Don't worry about it!",
];

/// The built-in rule set, in matching order.
pub fn builtin_patterns() -> Vec<RulePattern> {
    vec![
        RulePattern::keywords(
            "greeting",
            &["hi", "hello", "hey", "hiya", "howdy", "yo", "sup", "greetings", "hola"],
            &["good morning", "good afternoon", "good evening", "what's up", "whats up"],
            GREETINGS.iter().copied(),
        ),
        RulePattern::keywords(
            "farewell",
            &["bye", "goodbye", "cya", "goodnight", "farewell"],
            &["see you", "good night", "talk later", "gotta go", "catch you later"],
            FAREWELLS.iter().copied(),
        ),
        RulePattern::keywords(
            "thanks",
            &["thanks", "thank", "appreciate", "appreciated", "cheers"],
            &[],
            THANKS.iter().copied(),
        ),
        RulePattern::keywords(
            "wellbeing",
            &[],
            &[
                "how are you",
                "how's it going",
                "how is it going",
                "how are things",
                "how you doing",
                "how do you do",
            ],
            WELLBEING.iter().copied(),
        ),
        RulePattern::keywords(
            "identity",
            &[],
            &[
                "who are you",
                "what are you",
                "your name",
                "are you a bot",
                "are you human",
                "are you real",
            ],
            IDENTITY.iter().copied(),
        ),
        RulePattern::keywords(
            "capabilities",
            &[],
            &["what can you do", "can you help", "what do you do", "what are your features"],
            CAPABILITIES.iter().copied(),
        ),
        RulePattern::keywords(
            "help",
            &["help", "stuck", "confused", "assist"],
            &[],
            HELP.iter().copied(),
        ),
        RulePattern::keywords(
            "joke",
            &["joke", "jokes", "funny", "laugh"],
            &["make me laugh"],
            JOKES.iter().copied(),
        ),
        RulePattern::keywords(
            "affirmation",
            &["yes", "yeah", "yep", "ok", "okay", "sure", "cool", "nice", "great", "awesome"],
            &[],
            AFFIRMATIONS.iter().copied(),
        ),
        RulePattern::keywords(
            "apology",
            &["sorry", "apologies", "oops"],
            &["my bad"],
            APOLOGIES.iter().copied(),
        ),
    ]
}
