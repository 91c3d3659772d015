//! Tolerant parsing of provider payloads into [`GifItem`]s.
//!
//! Accepted shapes: `{"data": [...]}`, `{"results": [...]}`, a bare array,
//! and a proxy envelope `{"contents": "<json text>"}` wrapping any of those.
//! Widths and heights may be numbers or numeric strings. Items without any
//! usable URL are dropped.

use serde_json::Value;

use crate::types::{GifImages, GifItem, GifRendition};

/// Extract items from a provider payload. Unrecognised shapes yield nothing.
pub fn normalize_payload(payload: &Value) -> Vec<GifItem> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(map) => {
            if let Some(Value::String(contents)) = map.get("contents") {
                return serde_json::from_str::<Value>(contents)
                    .map(|inner| normalize_payload(&inner))
                    .unwrap_or_default();
            }
            match map.get("data").or_else(|| map.get("results")) {
                Some(Value::Array(items)) => items,
                _ => return Vec::new(),
            }
        }
        _ => return Vec::new(),
    };

    items.iter().filter_map(normalize_item).collect()
}

fn normalize_item(item: &Value) -> Option<GifItem> {
    let images = item.get("images");
    let fixed_height = images.and_then(|i| rendition(i.get("fixed_height")?));
    let original = images.and_then(|i| rendition(i.get("original")?));

    // Either size stands in for the other when only one is present.
    let (fixed_height, original) = match (fixed_height, original) {
        (Some(f), Some(o)) => (f, o),
        (Some(f), None) => (f.clone(), f),
        (None, Some(o)) => (o.clone(), o),
        (None, None) => {
            let url = item.get("url").and_then(Value::as_str)?;
            let r = GifRendition {
                url: url.to_string(),
                width: 0,
                height: 0,
            };
            (r.clone(), r)
        }
    };

    let id = match item.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => fixed_height.url.clone(),
    };
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(GifItem {
        id,
        title,
        images: GifImages {
            fixed_height,
            original,
        },
    })
}

fn rendition(value: &Value) -> Option<GifRendition> {
    let url = value.get("url").and_then(Value::as_str)?;
    if url.is_empty() {
        return None;
    }
    Some(GifRendition {
        url: url.to_string(),
        width: dimension(value.get("width")),
        height: dimension(value.get("height")),
    })
}

fn dimension(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn giphy_item(id: &str) -> Value {
        json!({
            "id": id,
            "title": "Happy Dance",
            "images": {
                "fixed_height": {"url": format!("https://media.example/{id}/200.gif"), "width": "267", "height": "200"},
                "original": {"url": format!("https://media.example/{id}/giphy.gif"), "width": 480, "height": 360}
            }
        })
    }

    #[test]
    fn test_data_envelope_with_string_dimensions() {
        let payload = json!({"data": [giphy_item("a1")], "meta": {"status": 200}});
        let items = normalize_payload(&payload);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a1");
        assert_eq!(items[0].images.fixed_height.width, 267);
        assert_eq!(items[0].images.original.height, 360);
    }

    #[test]
    fn test_results_and_bare_array() {
        assert_eq!(normalize_payload(&json!({"results": [giphy_item("r")]})).len(), 1);
        assert_eq!(normalize_payload(&json!([giphy_item("x"), giphy_item("y")])).len(), 2);
    }

    #[test]
    fn test_proxy_contents_envelope() {
        let inner = json!({"data": [giphy_item("p")]}).to_string();
        let items = normalize_payload(&json!({"contents": inner, "status": {"http_code": 200}}));
        assert_eq!(items[0].id, "p");
    }

    #[test]
    fn test_missing_rendition_is_mirrored() {
        let items = normalize_payload(&json!([{
            "id": 42,
            "images": {"original": {"url": "https://media.example/o.gif", "width": 100, "height": 80}}
        }]));
        assert_eq!(items[0].id, "42");
        assert_eq!(items[0].images.fixed_height, items[0].images.original);
        assert_eq!(items[0].title, "");
    }

    #[test]
    fn test_unusable_payloads() {
        assert!(normalize_payload(&json!({"data": []})).is_empty());
        assert!(normalize_payload(&json!({"message": "Invalid API key"})).is_empty());
        assert!(normalize_payload(&json!({"contents": "<html>blocked</html>"})).is_empty());
        assert!(normalize_payload(&json!([{"id": "no-url", "images": {}}])).is_empty());
        assert!(normalize_payload(&json!("nope")).is_empty());
    }
}
