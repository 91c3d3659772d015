//! Image-generation intent detection and prompt engineering.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use brain_core::hash_prompt;
use tracing::debug;
use url::Url;

use crate::error::ImageError;

/// Leading phrases that mark a message as an image request, longest first.
const INTENT_PREFIXES: &[&str] = &[
    "generate an image",
    "generate a image",
    "generate image",
    "create an image",
    "create a image",
    "create image",
    "make an image",
    "make a image",
    "make image",
    "visualize",
    "visualise",
    "paint",
    "draw",
];

/// Words stripped from the front of the subject ("draw me a cat", "an image of a dog").
const SUBJECT_LEAD_INS: &[&str] = &["of", "me"];

const FULL_BODY_CUES: &[&str] = &[
    "full body",
    "full length",
    "whole body",
    "head to toe",
    "standing",
    "walking",
    "dancing",
];

const PORTRAIT_CUES: &[&str] = &[
    "portrait",
    "headshot",
    "close up",
    "closeup",
    "face",
    "selfie",
    "bust",
];

const BASE_NEGATIVE: &str =
    "blurry, low quality, distorted, deformed, extra limbs, bad anatomy, watermark, text, signature";

/// Appended to the negative prompt whenever a cultural context fires.
const ETHNICITY_DRIFT_GUARD: &str = "ethnicity change, whitewashing, lightened skin, altered skin tone, \
     generic western features, culturally inaccurate clothing, stereotyped caricature";

/// Framing of the rendered image. Decides the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    /// Head and shoulders.
    Portrait,
    /// A whole figure, head to toe.
    FullBody,
    /// Landscape or general scene. The default.
    Scene,
}

impl Composition {
    /// Classify a lower-cased message. Full-body cues win over portrait cues.
    pub fn classify(text: &str) -> Self {
        if has_cue(text, FULL_BODY_CUES) {
            Self::FullBody
        } else if has_cue(text, PORTRAIT_CUES) {
            Self::Portrait
        } else {
            Self::Scene
        }
    }

    /// Render size as `(width, height)`.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::FullBody => (768, 1344),
            Self::Portrait => (896, 1152),
            Self::Scene => (1920, 1080),
        }
    }

    fn descriptor(self) -> &'static str {
        match self {
            Self::FullBody => "full body shot, entire figure visible from head to toe, natural pose",
            Self::Portrait => "portrait, detailed face, soft studio lighting, shallow depth of field",
            Self::Scene => "wide establishing shot, cinematic composition, rich environment detail",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::FullBody => "full-body",
            Self::Scene => "scene",
        }
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cultural context detected from keywords. Several may fire at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CulturalContext {
    WestAfrican,
    EastAfrican,
    SouthAsian,
    EastAsian,
    MiddleEastern,
    LatinAmerican,
}

impl CulturalContext {
    pub const ALL: [CulturalContext; 6] = [
        Self::WestAfrican,
        Self::EastAfrican,
        Self::SouthAsian,
        Self::EastAsian,
        Self::MiddleEastern,
        Self::LatinAmerican,
    ];

    fn cues(self) -> &'static [&'static str] {
        match self {
            Self::WestAfrican => &[
                "nigerian", "nigeria", "yoruba", "igbo", "hausa", "ghanaian", "ghana", "senegalese",
                "ankara", "agbada", "gele", "kente", "lagos",
            ],
            Self::EastAfrican => &[
                "kenyan", "kenya", "ethiopian", "ethiopia", "somali", "maasai", "tanzanian",
                "ugandan", "nairobi",
            ],
            Self::SouthAsian => &[
                "indian", "india", "pakistani", "bangladeshi", "sri lankan", "nepali", "sari",
                "saree", "kurta", "lehenga",
            ],
            Self::EastAsian => &[
                "chinese", "japanese", "korean", "kimono", "hanbok", "qipao", "hanfu",
            ],
            Self::MiddleEastern => &[
                "arab", "arabic", "persian", "iranian", "turkish", "egyptian", "emirati", "abaya",
                "thobe",
            ],
            Self::LatinAmerican => &[
                "mexican", "brazilian", "colombian", "peruvian", "argentinian", "andean",
                "guatemalan",
            ],
        }
    }

    fn descriptors(self) -> &'static str {
        match self {
            Self::WestAfrican => "authentic West African features, rich deep skin tones, accurate traditional West African attire and patterns",
            Self::EastAfrican => "authentic East African features, accurate skin tones, traditional East African attire and jewellery",
            Self::SouthAsian => "authentic South Asian features, accurate skin tones, detailed traditional South Asian textiles",
            Self::EastAsian => "authentic East Asian features, accurate traditional East Asian garments and details",
            Self::MiddleEastern => "authentic Middle Eastern features, accurate skin tones, traditional Middle Eastern attire",
            Self::LatinAmerican => "authentic Latin American features, accurate skin tones, traditional Latin American textiles and colours",
        }
    }

    /// All contexts whose keywords appear in a lower-cased message.
    pub fn detect(text: &str) -> BTreeSet<Self> {
        Self::ALL
            .into_iter()
            .filter(|ctx| has_cue(text, ctx.cues()))
            .collect()
    }
}

/// How the render seed is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedStrategy {
    /// Derived from the wall clock. Identical prompts render differently over time.
    #[default]
    Clock,
    /// Derived from the raw prompt. Identical prompts always get the same seed.
    PromptHash,
}

impl SeedStrategy {
    /// Parse `clock` or `hash` (also `prompt-hash`), case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clock" | "time" => Some(Self::Clock),
            "hash" | "prompt-hash" | "prompt_hash" => Some(Self::PromptHash),
            _ => None,
        }
    }

    fn seed_for(self, raw_prompt: &str) -> u64 {
        match self {
            Self::Clock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64 % 1_000_000_000)
                .unwrap_or(0),
            Self::PromptHash => u64::from_str_radix(&hash_prompt(raw_prompt)[..8], 16).unwrap_or(0),
        }
    }
}

/// A fully engineered render request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// The user's message as received (trimmed). The cache key derives from it.
    pub raw_prompt: String,
    /// What to draw, with the intent phrase removed.
    pub subject: String,
    pub composition: Composition,
    pub cultural: BTreeSet<CulturalContext>,
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
}

impl GenerationRequest {
    /// Build the render provider URL for this request.
    pub fn render_url(&self, base: &str) -> Result<Url, ImageError> {
        let width = self.width.to_string();
        let height = self.height.to_string();
        let seed = self.seed.to_string();
        let url = Url::parse_with_params(
            base,
            &[
                ("prompt", self.positive_prompt.as_str()),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("negative", self.negative_prompt.as_str()),
                ("seed", seed.as_str()),
                ("nologo", "true"),
            ],
        )?;
        Ok(url)
    }

    /// Cache key for the rendered image.
    pub fn cache_key(&self) -> String {
        hash_prompt(&self.raw_prompt)
    }
}

/// Turns "draw ..." style messages into [`GenerationRequest`]s.
#[derive(Debug, Clone, Default)]
pub struct PromptEnhancer {
    seed_strategy: SeedStrategy,
}

impl PromptEnhancer {
    pub fn new(seed_strategy: SeedStrategy) -> Self {
        Self { seed_strategy }
    }

    pub fn seed_strategy(&self) -> SeedStrategy {
        self.seed_strategy
    }

    /// Return a request when `message` asks for an image, `None` otherwise.
    ///
    /// The message must start with an intent phrase (optionally preceded by
    /// "please") and be followed by a non-empty subject.
    pub fn detect_image_intent(&self, message: &str) -> Option<GenerationRequest> {
        let raw = message.trim();
        let subject = extract_subject(raw)?;
        let request = self.enhance(raw, subject);
        debug!(
            "Image intent detected: composition={}, cultural={:?}, {}x{}",
            request.composition, request.cultural, request.width, request.height
        );
        Some(request)
    }

    /// Engineer a request for `subject`, keyed on `raw_prompt`.
    pub fn enhance(&self, raw_prompt: &str, subject: &str) -> GenerationRequest {
        let cue_text = cue_text(raw_prompt);
        let composition = Composition::classify(&cue_text);
        let cultural = CulturalContext::detect(&cue_text);
        let (width, height) = composition.dimensions();

        let mut positive = vec![subject.to_string(), composition.descriptor().to_string()];
        positive.extend(cultural.iter().map(|c| c.descriptors().to_string()));
        positive.push("highly detailed, high quality, sharp focus".to_string());

        let mut negative = BASE_NEGATIVE.to_string();
        if !cultural.is_empty() {
            negative.push_str(", ");
            negative.push_str(ETHNICITY_DRIFT_GUARD);
        }

        GenerationRequest {
            raw_prompt: raw_prompt.to_string(),
            subject: subject.to_string(),
            composition,
            cultural,
            positive_prompt: positive.join(", "),
            negative_prompt: negative,
            width,
            height,
            seed: self.seed_strategy.seed_for(raw_prompt),
        }
    }
}

/// Strip the intent phrase and return the subject slice of `raw`.
fn extract_subject(raw: &str) -> Option<&str> {
    // ASCII lower-casing keeps byte offsets aligned with `raw`.
    let lower = raw.to_ascii_lowercase();
    let mut offset = strip_word(&lower, 0, "please").unwrap_or(0);
    offset = skip_whitespace(&lower, offset);

    offset = INTENT_PREFIXES
        .iter()
        .find_map(|prefix| strip_word(&lower, offset, prefix))?;

    loop {
        offset = skip_whitespace(&lower, offset);
        if lower[offset..].starts_with(':') {
            offset += 1;
            continue;
        }
        match SUBJECT_LEAD_INS
            .iter()
            .find_map(|word| strip_word(&lower, offset, word))
        {
            Some(next) => offset = next,
            None => break,
        }
    }

    let subject = raw[offset..].trim();
    (!subject.is_empty()).then_some(subject)
}

/// If `word` starts at `offset` and ends on a word boundary, the offset after it.
fn strip_word(text: &str, offset: usize, word: &str) -> Option<usize> {
    let rest = text[offset..].strip_prefix(word)?;
    match rest.chars().next() {
        None => Some(text.len()),
        Some(c) if c.is_alphanumeric() => None,
        Some(_) => Some(offset + word.len()),
    }
}

fn skip_whitespace(text: &str, offset: usize) -> usize {
    offset + (text[offset..].len() - text[offset..].trim_start().len())
}

/// Lower-case words joined by single spaces and padded, for cue lookup.
fn cue_text(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", words.join(" "))
}

fn has_cue(cue_text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| cue_text.contains(&format!(" {} ", cue)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enhancer() -> PromptEnhancer {
        PromptEnhancer::new(SeedStrategy::PromptHash)
    }

    #[test]
    fn test_sunset_is_widescreen_scene() {
        let request = enhancer().detect_image_intent("draw a sunset over mountains").unwrap();
        assert_eq!(request.composition, Composition::Scene);
        assert_eq!((request.width, request.height), (1920, 1080));
        assert_eq!(request.subject, "a sunset over mountains");
        assert!(request.cultural.is_empty());
        assert!(!request.negative_prompt.contains("whitewashing"));
    }

    #[test]
    fn test_full_body_beats_portrait() {
        let request = enhancer()
            .detect_image_intent("generate an image of a full body portrait of a woman standing")
            .unwrap();
        assert_eq!(request.composition, Composition::FullBody);
        assert_eq!((request.width, request.height), (768, 1344));
        assert_eq!(
            Composition::classify(&cue_text("full body portrait of a woman standing")),
            Composition::FullBody
        );
    }

    #[test]
    fn test_portrait_cue() {
        let request = enhancer().detect_image_intent("Paint a portrait of my grandmother").unwrap();
        assert_eq!(request.composition, Composition::Portrait);
        assert_eq!((request.width, request.height), (896, 1152));
        assert_eq!(request.subject, "a portrait of my grandmother");
    }

    #[test]
    fn test_intent_variants() {
        let e = enhancer();
        assert_eq!(e.detect_image_intent("Please draw me a cat").unwrap().subject, "a cat");
        assert_eq!(
            e.detect_image_intent("create an image: a red boat").unwrap().subject,
            "a red boat"
        );
        assert_eq!(e.detect_image_intent("make image of dogs").unwrap().subject, "dogs");
        assert_eq!(e.detect_image_intent("  visualise   the ocean ").unwrap().subject, "the ocean");
        assert_eq!(e.detect_image_intent("Generate Image of A Tree").unwrap().subject, "A Tree");
    }

    #[test]
    fn test_no_intent() {
        let e = enhancer();
        assert!(e.detect_image_intent("hello there").is_none());
        assert!(e.detect_image_intent("can you draw a cat").is_none());
        assert!(e.detect_image_intent("drawing is fun").is_none());
        assert!(e.detect_image_intent("draw").is_none());
        assert!(e.detect_image_intent("draw me").is_none());
        assert!(e.detect_image_intent("generate an image of").is_none());
        assert!(e.detect_image_intent("").is_none());
    }

    #[test]
    fn test_cultural_flags_add_guard() {
        let request = enhancer()
            .detect_image_intent("draw a Nigerian bride in a gele and a Japanese kimono")
            .unwrap();
        assert!(request.cultural.contains(&CulturalContext::WestAfrican));
        assert!(request.cultural.contains(&CulturalContext::EastAsian));
        assert!(request.positive_prompt.contains("West African"));
        assert!(request.negative_prompt.contains("whitewashing"));
        // Cultural flags are independent of composition.
        assert_eq!(request.composition, Composition::Scene);
    }

    #[test]
    fn test_hash_seed_is_stable() {
        let a = enhancer().detect_image_intent("draw a fox").unwrap();
        let b = enhancer().detect_image_intent("draw a fox").unwrap();
        let c = enhancer().detect_image_intent("draw a wolf").unwrap();
        assert_eq!(a.seed, b.seed);
        assert_ne!(a.seed, c.seed);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_render_url() {
        let request = enhancer().detect_image_intent("draw a sunset over mountains").unwrap();
        let url = request
            .render_url("https://render.example/prompt")
            .unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/prompt");
        assert_eq!(params["prompt"], request.positive_prompt);
        assert_eq!(params["width"], "1920");
        assert_eq!(params["height"], "1080");
        assert_eq!(params["negative"], request.negative_prompt);
        assert_eq!(params["seed"], request.seed.to_string());
        assert_eq!(params["nologo"], "true");
        assert!(request.render_url("not a url").is_err());
    }

    #[test]
    fn test_seed_strategy_parse() {
        assert_eq!(SeedStrategy::parse("hash"), Some(SeedStrategy::PromptHash));
        assert_eq!(SeedStrategy::parse(" Clock "), Some(SeedStrategy::Clock));
        assert_eq!(SeedStrategy::parse("random"), None);
        assert_eq!(SeedStrategy::default(), SeedStrategy::Clock);
    }
}
