//! Interest tag handling.
//!
//! The canonical form of a tag is trimmed and upper-cased; that form is
//! what the store keys carry.

/// Normalize a list of raw tags: trim, upper-case, drop empties,
/// de-duplicate preserving first occurrence.
pub fn normalize(raw: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.iter()
        .map(|tag| tag.trim().to_uppercase())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Parse the comma-separated `interest` query parameter.
pub fn parse_csv(raw: &str) -> Vec<String> {
    normalize(
        &raw.split(',')
            .map(|s| s.to_string())
            .collect::<Vec<String>>(),
    )
}

/// Join a normalized tag list back into the wire CSV form.
pub fn to_csv(tags: &[String]) -> String {
    tags.join(",")
}

/// Intersection of two normalized tag lists, in `a`'s order.
pub fn common(a: &[String], b: &[String]) -> Vec<String> {
    a.iter().filter(|tag| b.contains(tag)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_trims_uppercases_and_dedups() {
        let normalized = normalize(&tags(&[" music ", "Film", "MUSIC", "", "  "]));
        assert_eq!(normalized, tags(&["MUSIC", "FILM"]));
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(&tags(&["Anime", "anime", " Gaming"]));
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn csv_round_trip() {
        let parsed = parse_csv("music, film ,music");
        assert_eq!(parsed, tags(&["MUSIC", "FILM"]));
        assert_eq!(to_csv(&parsed), "MUSIC,FILM");
    }

    #[test]
    fn empty_csv_means_wildcard_path() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv(" , ,").is_empty());
    }

    #[test]
    fn common_preserves_left_order() {
        let a = tags(&["MUSIC", "FILM", "ANIME"]);
        let b = tags(&["ANIME", "MUSIC"]);
        assert_eq!(common(&a, &b), tags(&["MUSIC", "ANIME"]));
        assert!(common(&a, &tags(&["SPORTS"])).is_empty());
    }
}
