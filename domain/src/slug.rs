//! Slug derivation for the canonical `/smartlinks/{artist}/{track}` route.

use crate::Slug;

const MAX_SLUG_LEN: usize = 80;

/// Derive a URL slug from a display name: lowercase ASCII, common Latin
/// diacritics folded, every other run of characters collapsed into one `-`.
/// Returns `None` when nothing slug-worthy is left (e.g. non-Latin scripts).
pub fn slugify(text: &str) -> Option<Slug> {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        let folded: &str = match c {
            'a'..='z' | '0'..='9' => {
                push_part(&mut out, &mut pending_dash, c.encode_utf8(&mut [0u8; 4]));
                continue;
            }
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
            'ç' | 'ć' | 'č' => "c",
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
            'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
            'ñ' | 'ń' => "n",
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
            'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
            'ý' | 'ÿ' => "y",
            'ś' | 'š' => "s",
            'ź' | 'ż' | 'ž' => "z",
            'ł' => "l",
            'ß' => "ss",
            'æ' => "ae",
            'œ' => "oe",
            '&' => {
                pending_dash = !out.is_empty();
                push_part(&mut out, &mut pending_dash, "and");
                pending_dash = true;
                continue;
            }
            '\'' | '’' | '.' => continue,
            _ => {
                pending_dash = !out.is_empty();
                continue;
            }
        };
        push_part(&mut out, &mut pending_dash, folded);
    }
    if out.len() > MAX_SLUG_LEN {
        out.truncate(MAX_SLUG_LEN);
        if let Some(cut) = out.rfind('-') {
            out.truncate(cut);
        }
    }
    let trimmed = out.trim_matches('-');
    Slug::new(trimmed).ok()
}

fn push_part(out: &mut String, pending_dash: &mut bool, part: &str) {
    if *pending_dash && !out.is_empty() {
        out.push('-');
    }
    *pending_dash = false;
    out.push_str(part);
}

/// Slug for a name, or `fallback` when the name has no slug-worthy characters.
pub fn slugify_or(text: &str, fallback: &str) -> Slug {
    slugify(text)
        .or_else(|| Slug::new(fallback).ok())
        .unwrap_or_else(|| Slug(String::from("smartlink")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> String {
        slugify(text).map(|s| s.as_str().to_string()).unwrap_or_default()
    }

    #[test]
    fn lowercases_and_collapses_separators() {
        assert_eq!(s("Daft Punk"), "daft-punk");
        assert_eq!(s("  Get   Lucky (feat. Pharrell)  "), "get-lucky-feat-pharrell");
        assert_eq!(s("AC/DC"), "ac-dc");
    }

    #[test]
    fn folds_diacritics_and_apostrophes() {
        assert_eq!(s("Beyoncé"), "beyonce");
        assert_eq!(s("Sigur Rós"), "sigur-ros");
        assert_eq!(s("Don't Stop"), "dont-stop");
        assert_eq!(s("Mötley Crüe"), "motley-crue");
    }

    #[test]
    fn ampersand_becomes_and() {
        assert_eq!(s("Simon & Garfunkel"), "simon-and-garfunkel");
        assert_eq!(s("Salt&Pepa"), "salt-and-pepa");
    }

    #[test]
    fn empty_when_nothing_usable() {
        assert!(slugify("").is_none());
        assert!(slugify("!!!").is_none());
        assert!(slugify("坂本龍一").is_none());
        assert_eq!(slugify_or("坂本龍一", "artist").as_str(), "artist");
    }

    #[test]
    fn long_names_are_cut_on_a_word_boundary() {
        let long = "word ".repeat(40);
        let slug = slugify(&long).unwrap();
        assert!(slug.as_str().len() <= MAX_SLUG_LEN);
        assert!(!slug.as_str().ends_with('-'));
    }
}
