//! Offline placeholder generator, the last step of the search chain.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use brain_core::{hash_prompt, TerminalSource};

use crate::types::{GifImages, GifItem, GifQuery, GifRendition};

/// Number of placeholders produced for every query.
pub const LOCAL_RESULT_COUNT: usize = 8;

const FIXED_HEIGHT: u32 = 200;
const ORIGINAL_SIZE: u32 = 480;

/// Produces SVG placeholders whose ids and colours derive from the query,
/// so the same query always renders the same set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGifGenerator;

impl LocalGifGenerator {
    pub fn generate(&self, query: &GifQuery) -> Vec<GifItem> {
        let label = query.label();
        let digest = hash_prompt(&format!("{}:{}", query.kind, label));

        (0..LOCAL_RESULT_COUNT)
            .map(|i| {
                // 64 hex chars give eight 6-digit colours, one per tile.
                let background = &digest[i * 6..i * 6 + 6];
                let accent = &digest[(i * 6 + 32) % 58..(i * 6 + 32) % 58 + 6];
                let title = format!("{} #{}", label, i + 1);

                GifItem {
                    id: format!("local-{}-{}", &digest[..12], i),
                    title: title.clone(),
                    images: GifImages {
                        fixed_height: GifRendition {
                            url: svg_data_uri(&title, background, accent, FIXED_HEIGHT),
                            width: FIXED_HEIGHT,
                            height: FIXED_HEIGHT,
                        },
                        original: GifRendition {
                            url: svg_data_uri(&title, background, accent, ORIGINAL_SIZE),
                            width: ORIGINAL_SIZE,
                            height: ORIGINAL_SIZE,
                        },
                    },
                }
            })
            .collect()
    }
}

impl TerminalSource<GifQuery, Vec<GifItem>> for LocalGifGenerator {
    fn name(&self) -> &str {
        "local-generator"
    }

    fn produce(&self, query: &GifQuery) -> Vec<GifItem> {
        self.generate(query)
    }
}

fn svg_data_uri(text: &str, background: &str, accent: &str, size: u32) -> String {
    let half = size / 2;
    let font = size / 10;
    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">\
         <rect width=\"100%\" height=\"100%\" fill=\"#{background}\"/>\
         <circle cx=\"{half}\" cy=\"{half}\" r=\"{r}\" fill=\"#{accent}\" opacity=\"0.6\">\
         <animate attributeName=\"r\" values=\"{r};{r2};{r}\" dur=\"1.5s\" repeatCount=\"indefinite\"/></circle>\
         <text x=\"50%\" y=\"50%\" dominant-baseline=\"middle\" text-anchor=\"middle\" \
         font-family=\"sans-serif\" font-size=\"{font}\" fill=\"#ffffff\">{label}</text></svg>",
        r = size / 4,
        r2 = size / 3,
        label = escape_xml(text),
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
