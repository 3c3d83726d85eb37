//! Match modes and filter predicates.
//!
//! A predicate is built from the text typed into the combo box field and the
//! active [`MatchMode`]; it tests the caption the label provider produces for
//! an item. Highlighting of the matched characters uses `nucleo-matcher` atoms
//! configured to the same mode so the rendered highlight agrees with the
//! predicate.

use std::fmt;
use std::rc::Rc;

use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Matcher, Utf32Str};

/// Maps an item to its caption. Must be total over every item in the tree.
pub type LabelProvider<T> = Rc<dyn Fn(&T) -> String>;

/// A filter over items. `None` wherever an `Option<Predicate<T>>` appears
/// means "no filtering".
pub type Predicate<T> = Rc<dyn Fn(&T) -> bool>;

/// How the filter text is compared against item captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum MatchMode {
    /// Whole caption equals the text, ignoring case.
    Exact,
    /// Caption starts with the text, ignoring case.
    StartsWith,
    /// Caption contains the text, ignoring case.
    #[default]
    Contains,
    /// Whole caption equals the text.
    ExactCase,
    /// Caption starts with the text.
    StartsWithCase,
    /// Caption contains the text.
    ContainsCase,
}

impl MatchMode {
    pub const ALL: [MatchMode; 6] = [
        MatchMode::Exact,
        MatchMode::StartsWith,
        MatchMode::Contains,
        MatchMode::ExactCase,
        MatchMode::StartsWithCase,
        MatchMode::ContainsCase,
    ];

    /// Parse a mode name leniently. Both `starts-with` and `STARTS_WITH`
    /// spellings are accepted. Anything unrecognized falls back to
    /// case-insensitive [`MatchMode::Contains`].
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "exact" => MatchMode::Exact,
            "starts-with" => MatchMode::StartsWith,
            "contains" => MatchMode::Contains,
            "exact-case" => MatchMode::ExactCase,
            "starts-with-case" => MatchMode::StartsWithCase,
            "contains-case" => MatchMode::ContainsCase,
            _ => {
                tracing::warn!(mode = name, "unrecognized match mode, using contains");
                MatchMode::Contains
            }
        }
    }

    /// Kebab-case name, the inverse of [`MatchMode::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::StartsWith => "starts-with",
            MatchMode::Contains => "contains",
            MatchMode::ExactCase => "exact-case",
            MatchMode::StartsWithCase => "starts-with-case",
            MatchMode::ContainsCase => "contains-case",
        }
    }

    pub fn is_case_sensitive(self) -> bool {
        matches!(
            self,
            MatchMode::ExactCase | MatchMode::StartsWithCase | MatchMode::ContainsCase
        )
    }

    /// Cycle to the next mode (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Test a single caption against the filter text.
    pub fn matches(self, caption: &str, text: &str) -> bool {
        match self {
            MatchMode::ExactCase => caption == text,
            MatchMode::StartsWithCase => caption.starts_with(text),
            MatchMode::ContainsCase => caption.contains(text),
            MatchMode::Exact => caption.to_lowercase() == text.to_lowercase(),
            MatchMode::StartsWith => caption.to_lowercase().starts_with(&text.to_lowercase()),
            MatchMode::Contains => caption.to_lowercase().contains(&text.to_lowercase()),
        }
    }

    fn atom_kind(self) -> AtomKind {
        match self {
            MatchMode::Exact | MatchMode::ExactCase => AtomKind::Exact,
            MatchMode::StartsWith | MatchMode::StartsWithCase => AtomKind::Prefix,
            MatchMode::Contains | MatchMode::ContainsCase => AtomKind::Substring,
        }
    }

    fn case_matching(self) -> CaseMatching {
        if self.is_case_sensitive() {
            CaseMatching::Respect
        } else {
            CaseMatching::Ignore
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the predicate installed on the data view for `text` under `mode`.
///
/// The caption is recomputed through `label` for every tested item, so the
/// predicate stays correct if captions depend on mutable state the label
/// provider reads.
pub fn build_predicate<T: 'static>(
    text: &str,
    mode: MatchMode,
    label: LabelProvider<T>,
) -> Predicate<T> {
    let text = text.to_string();
    Rc::new(move |item: &T| mode.matches(&label(item), &text))
}

/// Character indices of `caption` matched by `text` under `mode`, sorted and
/// deduplicated. Empty when the text is empty or does not match.
pub fn match_indices(caption: &str, text: &str, mode: MatchMode, matcher: &mut Matcher) -> Vec<u32> {
    if text.is_empty() || !mode.matches(caption, text) {
        return Vec::new();
    }
    if matches!(mode, MatchMode::StartsWith | MatchMode::StartsWithCase) {
        let len = text.chars().count().min(caption.chars().count()) as u32;
        return (0..len).collect();
    }
    let atom = Atom::new(
        text,
        mode.case_matching(),
        Normalization::Never,
        mode.atom_kind(),
        false,
    );

    let mut haystack_buf = Vec::new();
    let haystack = Utf32Str::new(caption, &mut haystack_buf);

    let mut indices = Vec::new();
    if atom.indices(haystack, matcher, &mut indices).is_some() {
        indices.sort_unstable();
        indices.dedup();
        indices
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nucleo_matcher::Config;

    fn caption_predicate(text: &str, mode: MatchMode) -> Predicate<String> {
        build_predicate(text, mode, Rc::new(|s: &String| s.clone()))
    }

    #[test]
    fn test_default_mode_is_case_insensitive_contains() {
        assert_eq!(MatchMode::default(), MatchMode::Contains);
        assert!(!MatchMode::default().is_case_sensitive());
    }

    #[test]
    fn test_truth_table() {
        // (mode, caption, text, expected)
        let cases = [
            (MatchMode::ExactCase, "Chapter 1", "Chapter 1", true),
            (MatchMode::ExactCase, "Chapter 1", "chapter 1", false),
            (MatchMode::ExactCase, "Chapter 1", "Chapter", false),
            (MatchMode::Exact, "Chapter 1", "chapter 1", true),
            (MatchMode::Exact, "Chapter 1", "CHAPTER 1", true),
            (MatchMode::Exact, "Chapter 1", "chapter", false),
            (MatchMode::StartsWith, "Chapter 1", "chap", true),
            (MatchMode::StartsWith, "Chapter 1", "ter", false),
            (MatchMode::StartsWithCase, "Chapter 1", "Chap", true),
            (MatchMode::StartsWithCase, "Chapter 1", "chap", false),
            (MatchMode::Contains, "Chapter 1", "TER 1", true),
            (MatchMode::Contains, "Chapter 1", "book", false),
            (MatchMode::ContainsCase, "Chapter 1", "ter 1", true),
            (MatchMode::ContainsCase, "Chapter 1", "TER 1", false),
        ];
        for (mode, caption, text, expected) in cases {
            let predicate = caption_predicate(text, mode);
            assert_eq!(
                predicate(&caption.to_string()),
                expected,
                "{mode} {caption:?} vs {text:?}"
            );
        }
    }

    #[test]
    fn test_predicate_uses_label_provider() {
        #[derive(Debug)]
        struct Dept {
            name: String,
            code: u32,
        }
        let predicate = build_predicate(
            "sales",
            MatchMode::Contains,
            Rc::new(|d: &Dept| format!("{} ({})", d.name, d.code)),
        );
        assert!(predicate(&Dept {
            name: "Sales EMEA".into(),
            code: 7
        }));
        assert!(!predicate(&Dept {
            name: "Support".into(),
            code: 7
        }));
    }

    #[test]
    fn test_from_name_accepts_both_spellings() {
        assert_eq!(MatchMode::from_name("starts-with"), MatchMode::StartsWith);
        assert_eq!(MatchMode::from_name("STARTS_WITH"), MatchMode::StartsWith);
        assert_eq!(MatchMode::from_name("Contains_Case"), MatchMode::ContainsCase);
        assert_eq!(MatchMode::from_name(" exact "), MatchMode::Exact);
    }

    #[test]
    fn test_from_name_falls_back_to_contains() {
        assert_eq!(MatchMode::from_name("fuzzy"), MatchMode::Contains);
        assert_eq!(MatchMode::from_name(""), MatchMode::Contains);
        // The fallback filters exactly like case-insensitive contains.
        let fallback = caption_predicate("OOK", MatchMode::from_name("regex"));
        assert!(fallback(&"Book 1/1".to_string()));
    }

    #[test]
    fn test_names_round_trip() {
        for mode in MatchMode::ALL {
            assert_eq!(MatchMode::from_name(mode.name()), mode);
        }
    }

    #[test]
    fn test_next_cycles_through_all_modes() {
        let mut mode = MatchMode::Exact;
        for expected in MatchMode::ALL.iter().skip(1) {
            mode = mode.next();
            assert_eq!(mode, *expected);
        }
        assert_eq!(mode.next(), MatchMode::Exact);
    }

    #[test]
    fn test_match_indices_substring() {
        let mut matcher = Matcher::new(Config::DEFAULT);
        let indices = match_indices("Chapter 1", "apt", MatchMode::Contains, &mut matcher);
        assert_eq!(indices, vec![2, 3, 4]);
    }

    #[test]
    fn test_match_indices_respects_case() {
        let mut matcher = Matcher::new(Config::DEFAULT);
        assert!(match_indices("Chapter 1", "chap", MatchMode::StartsWithCase, &mut matcher).is_empty());
        assert_eq!(
            match_indices("Chapter 1", "Chap", MatchMode::StartsWithCase, &mut matcher),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_match_indices_prefix_ignoring_case() {
        let mut matcher = Matcher::new(Config::DEFAULT);
        assert_eq!(
            match_indices("Chapter 1", "CHAP", MatchMode::StartsWith, &mut matcher),
            vec![0, 1, 2, 3]
        );
        assert!(match_indices("Chapter 1", "apt", MatchMode::StartsWith, &mut matcher).is_empty());
    }

    #[test]
    fn test_match_indices_agree_with_predicate() {
        let mut matcher = Matcher::new(Config::DEFAULT);
        for mode in MatchMode::ALL {
            for text in ["Chap", "chap", "ter", "Chapter 1", "x"] {
                let highlighted = !match_indices("Chapter 1", text, mode, &mut matcher).is_empty();
                assert_eq!(highlighted, mode.matches("Chapter 1", text), "{mode} {text:?}");
            }
        }
    }

    #[test]
    fn test_match_indices_empty_text() {
        let mut matcher = Matcher::new(Config::DEFAULT);
        assert!(match_indices("Chapter 1", "", MatchMode::Contains, &mut matcher).is_empty());
    }
}
