/// Closed category label set. Classification always lands on a member;
/// anything unmatched falls back to `Attractions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    WaterParks,
    ThemeParks,
    Museums,
    Tours,
    Cruises,
    Shows,
    Family,
    Attractions,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::WaterParks => "water-parks",
            Category::ThemeParks => "theme-parks",
            Category::Museums => "museums",
            Category::Tours => "tours",
            Category::Cruises => "cruises",
            Category::Shows => "shows",
            Category::Family => "family",
            Category::Attractions => "attractions",
        }
    }

    pub const ALL: &'static [Category] = &[
        Category::WaterParks,
        Category::ThemeParks,
        Category::Museums,
        Category::Tours,
        Category::Cruises,
        Category::Shows,
        Category::Family,
        Category::Attractions,
    ];
}

/// Ordered keyword rules; earlier rules win, ties resolved by position only.
const RULES: &[(&str, Category)] = &[
    ("water-park", Category::WaterParks),
    ("waterpark", Category::WaterParks),
    ("aqua", Category::WaterParks),
    ("theme-park", Category::ThemeParks),
    ("theme park", Category::ThemeParks),
    ("amusement", Category::ThemeParks),
    ("museum", Category::Museums),
    ("heritage", Category::Museums),
    ("tour", Category::Tours),
    ("safari", Category::Tours),
    ("cruise", Category::Cruises),
    ("boat", Category::Cruises),
    ("yacht", Category::Cruises),
    ("show", Category::Shows),
    ("concert", Category::Shows),
    ("comedy", Category::Shows),
    ("kids", Category::Family),
    ("family", Category::Family),
];

/// First matching rule over the lowercased concatenation of the category
/// URL fragment, title, and description.
pub fn classify(fragment: &str, title: &str, description: &str) -> Category {
    let haystack = format!("{} {} {}", fragment, title, description).to_lowercase();
    RULES
        .iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Attractions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_in_closed_set() {
        let inputs = [
            ("water-parks", "Wahooo!", ""),
            ("", "Bahrain National Museum", "guided visit"),
            ("", "", ""),
            ("unknown-fragment", "Mystery Thing", "no keywords here"),
        ];
        for (frag, title, desc) in inputs {
            let c = classify(frag, title, desc);
            assert!(Category::ALL.contains(&c));
        }
    }

    #[test]
    fn rule_order_wins_over_later_matches() {
        // Contains both "aqua" (water-parks rule) and "show" (shows rule);
        // the earlier rule decides.
        assert_eq!(classify("", "Aqua Show Spectacular", ""), Category::WaterParks);
        // "tour" outranks "cruise" in rule order.
        assert_eq!(classify("", "Sunset Tour Cruise", ""), Category::Tours);
    }

    #[test]
    fn fragment_participates() {
        assert_eq!(classify("cruises", "Golden Hour", ""), Category::Cruises);
        assert_eq!(classify("theme-parks", "Adhari Park", ""), Category::ThemeParks);
    }

    #[test]
    fn unmatched_falls_back_to_attractions() {
        assert_eq!(classify("", "Some Venue", "nothing relevant"), Category::Attractions);
    }
}
