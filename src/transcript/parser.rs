//! Parsing of YouTube timedtext caption documents.

use regex::Regex;
use std::sync::OnceLock;

use super::TranscriptSnippet;

fn text_element() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)"#).expect("valid regex")
    })
}

fn attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([a-zA-Z_]+)="([^"]*)""#).expect("valid regex"))
}

fn markup_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Parse a `<transcript><text start=".." dur="..">..</text></transcript>` document.
///
/// Snippets whose text is empty after unescaping are dropped.
pub fn parse_timedtext(xml: &str) -> Vec<TranscriptSnippet> {
    text_element()
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let raw = caps.get(2).map(|m| m.as_str()).unwrap_or("");

            let text = clean_text(raw);
            if text.is_empty() {
                return None;
            }

            let mut start = 0.0;
            let mut duration = 0.0;
            for attr in attribute().captures_iter(attrs) {
                match &attr[1] {
                    "start" => start = attr[2].parse().unwrap_or(0.0),
                    "dur" => duration = attr[2].parse().unwrap_or(0.0),
                    _ => {}
                }
            }

            Some(TranscriptSnippet {
                text,
                start,
                duration,
            })
        })
        .collect()
}

/// Unescape entities (the payload is escaped twice in practice) and drop inline tags
fn clean_text(raw: &str) -> String {
    let unescaped = unescape_html(&unescape_html(raw));
    let stripped = markup_tag().replace_all(&unescaped, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the named and numeric entities YouTube emits in caption payloads
pub fn unescape_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            decode_entity(entity).map(|c| (c, end + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.0" dur="1.54">Hey there</text>
<text start="1.54" dur="4.16">how are you</text>
</transcript>"#;

        let snippets = parse_timedtext(xml);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].text, "Hey there");
        assert_eq!(snippets[0].start, 0.0);
        assert_eq!(snippets[0].duration, 1.54);
        assert_eq!(snippets[1].text, "how are you");
        assert_eq!(snippets[1].start, 1.54);
    }

    #[test]
    fn test_parse_unescapes_and_strips_markup() {
        let xml = r#"<transcript><text start="2" dur="1">it&amp;#39;s &lt;i&gt;really&lt;/i&gt; &quot;good&quot;</text></transcript>"#;
        let snippets = parse_timedtext(xml);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "it's really \"good\"");
    }

    #[test]
    fn test_parse_drops_empty_and_self_closing_elements() {
        let xml = r#"<transcript><text start="0" dur="1"/><text start="1" dur="1">   </text><text start="2" dur="1">[Music]</text></transcript>"#;
        let snippets = parse_timedtext(xml);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "[Music]");
    }

    #[test]
    fn test_parse_multiline_text() {
        let xml = "<transcript><text start=\"0\" dur=\"3\">first line\nsecond line</text></transcript>";
        let snippets = parse_timedtext(xml);
        assert_eq!(snippets[0].text, "first line second line");
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("a &amp; b"), "a & b");
        assert_eq!(unescape_html("&#39;quoted&#x27;"), "'quoted'");
        assert_eq!(unescape_html("AT&T rocks"), "AT&T rocks");
        assert_eq!(unescape_html("&unknown; stays"), "&unknown; stays");
        assert_eq!(unescape_html("no entities"), "no entities");
    }
}
