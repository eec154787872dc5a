//! Emote substitution into HTML-safe message text

use multichat_broadcaster::Emote;

/// Render `text` as HTML, replacing each emote range with an image tag.
///
/// Ranges are character offsets with an inclusive `end_index`, so the
/// character at `end_index` is consumed too. Emotes are applied right to
/// left; offsets past the unprocessed prefix are clamped to it. All text
/// outside emote ranges is escaped.
pub fn render_message(text: &str, emotes: &[Emote]) -> String {
    if emotes.is_empty() {
        return html_escape::encode_text(text).into_owned();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut ordered: Vec<&Emote> = emotes.iter().collect();
    ordered.sort_by(|a, b| b.start_index.cmp(&a.start_index));

    let mut pieces = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut upper = chars.len();
    for emote in ordered {
        let start = emote.start_index.min(upper);
        let after = emote.end_index.saturating_add(1).clamp(start, upper);
        pieces.push(escape_chars(&chars[after..upper]));
        pieces.push(image_tag(emote));
        upper = start;
    }
    pieces.push(escape_chars(&chars[..upper]));

    pieces.reverse();
    pieces.concat()
}

fn escape_chars(chars: &[char]) -> String {
    let segment: String = chars.iter().collect();
    html_escape::encode_text(&segment).into_owned()
}

fn image_tag(emote: &Emote) -> String {
    format!(
        r#"<img src="{}" class="emote" alt="{}">"#,
        html_escape::encode_double_quoted_attribute(&emote.image_url),
        html_escape::encode_double_quoted_attribute(&emote.name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emote(name: &str, url: &str, start: usize, end: usize) -> Emote {
        Emote {
            name: name.to_string(),
            image_url: url.to_string(),
            start_index: start,
            end_index: end,
        }
    }

    #[test]
    fn test_inclusive_end_index() {
        let html = render_message("abcde", &[emote("bc", "u", 1, 2)]);
        assert_eq!(html, r#"a<img src="u" class="emote" alt="bc">de"#);
    }

    #[test]
    fn test_plain_text_is_escaped() {
        let html = render_message("<script>", &[]);
        assert!(!html.contains('<'));
        assert!(!html.contains('>'));
        assert_eq!(html, "&lt;script&gt;");
    }

    #[test]
    fn test_multiple_emotes_any_order() {
        let emotes = [
            emote("Kappa", "k", 0, 4),
            emote("PogChamp", "p", 10, 17),
        ];
        let forward = render_message("Kappa hi  PogChamp!", &emotes);
        let reversed: Vec<_> = emotes.iter().rev().cloned().collect();
        assert_eq!(forward, render_message("Kappa hi  PogChamp!", &reversed));
        assert_eq!(
            forward,
            concat!(
                r#"<img src="k" class="emote" alt="Kappa">"#,
                " hi  ",
                r#"<img src="p" class="emote" alt="PogChamp">"#,
                "!"
            )
        );
    }

    #[test]
    fn test_text_around_emotes_is_escaped() {
        let html = render_message("<b>Kappa", &[emote("Kappa", "k", 3, 7)]);
        assert_eq!(html, r#"&lt;b&gt;<img src="k" class="emote" alt="Kappa">"#);
    }

    #[test]
    fn test_attributes_are_escaped() {
        let html = render_message("x", &[emote("\"><b", "u\"", 0, 0)]);
        assert!(!html.contains(r#""><b"#));
        assert!(html.starts_with("<img src=\"u&quot;\""));
    }

    #[test]
    fn test_out_of_range_indices_are_clamped() {
        let html = render_message("hey", &[emote("E", "u", 2, 10)]);
        assert_eq!(html, r#"he<img src="u" class="emote" alt="E">"#);

        let html = render_message("hey", &[emote("E", "u", 9, 12)]);
        assert_eq!(html, r#"hey<img src="u" class="emote" alt="E">"#);
    }

    #[test]
    fn test_offsets_count_characters() {
        let html = render_message("é Kappa", &[emote("Kappa", "k", 2, 6)]);
        assert_eq!(html, r#"é <img src="k" class="emote" alt="Kappa">"#);
    }
}
