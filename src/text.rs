use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Turn the inner markup of a link into a display string: tags become spaces,
/// entities are decoded, whitespace collapsed and mojibake repaired.
pub fn clean_link_text(markup: &str) -> String {
    let stripped = RE_TAGS.replace_all(markup, " ");
    let decoded = decode_html_entities(&stripped);
    fix_mojibake(&decoded)
}

// NFKC, non-breaking spaces to plain spaces, collapse runs of whitespace.
fn collapse_and_normalize(inp: &str) -> String {
    let out = inp.nfkc().collect::<String>().replace('\u{00A0}', " ");
    RE_WHITESPACE.replace_all(&out, " ").trim().to_string()
}

fn looks_garbled(s: &str) -> bool {
    s.contains('Ã') || s.contains('â') || s.contains('\u{FFFD}')
}

/// Repair text where UTF-8 bytes were decoded as Latin-1/Windows-1252, then
/// normalize it. Clean input only gets the normalization step.
pub fn fix_mojibake(s: &str) -> String {
    if !looks_garbled(s) {
        return collapse_and_normalize(s);
    }

    let mut cur = s.to_string();
    for _ in 0..3 {
        let mut bytes: Vec<u8> = Vec::with_capacity(cur.len());
        for ch in cur.chars() {
            let code = ch as u32;
            if code <= 0xFF {
                bytes.push(code as u8);
            } else {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }

        let redecoded = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                let (cow, _had_errors) =
                    encoding_rs::WINDOWS_1252.decode_without_bom_handling(e.as_bytes());
                cow.into_owned()
            }
        };
        if redecoded == cur {
            break;
        }
        cur = redecoded;
        if !looks_garbled(&cur) {
            break;
        }
    }

    collapse_and_normalize(&cur)
}

/// Decode entities once and drop control characters that are invalid in XML.
pub fn sanitize_text(input: &str) -> String {
    decode_html_entities(input)
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c as u32 >= 0x20)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_text_drops_tags_and_collapses_whitespace() {
        let markup = "\n  <span class=\"t\">How&nbsp;Autonomy</span>\n <em>Drives</em>  ";
        assert_eq!(clean_link_text(markup), "How Autonomy Drives");
    }

    #[test]
    fn image_only_anchor_has_no_text() {
        assert_eq!(clean_link_text(r#"<img src="/a.png" alt="">"#), "");
    }

    #[test]
    fn repairs_latin1_mojibake() {
        assert_eq!(fix_mojibake("Ontarioâ\u{80}\u{99}s"), "Ontario\u{2019}s");
    }

    #[test]
    fn sanitize_strips_control_chars() {
        assert_eq!(sanitize_text("a\u{0007}b &amp; c\n"), "ab & c\n");
    }
}
