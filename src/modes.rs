/*!
 # Animation mode lookup for the Lotus Lamp

 The lamp firmware exposes 213 RGB animation modes (0..=212), organised by
 the Lotus Lamp X app into eight categories. The mode number is all the
 protocol needs ([`crate::protocol::encode_animation`]); this module is the
 lookup layer on top of it, mapping mode numbers to the names and categories
 the app shows.

 The vendor app's full name table is not redistributable, so the static
 table here carries the modes whose official names are documented; lookups
 for other modes return `None` and the raw number still works everywhere.
*/

use std::fmt;

/// Mode categories as organised in the Lotus Lamp X app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Basic,
    Trans,
    Tail,
    Water,
    Curtain,
    Run,
    RunBack,
    Flow,
}

impl Category {
    /// All categories, in app order.
    pub const ALL: [Category; 8] = [
        Category::Basic,
        Category::Trans,
        Category::Tail,
        Category::Water,
        Category::Curtain,
        Category::Run,
        Category::RunBack,
        Category::Flow,
    ];

    fn name(self) -> &'static str {
        match self {
            Category::Basic => "basic",
            Category::Trans => "trans",
            Category::Tail => "tail",
            Category::Water => "water",
            Category::Curtain => "curtain",
            Category::Run => "run",
            Category::RunBack => "runback",
            Category::Flow => "flow",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// App metadata for a single animation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeInfo {
    /// Official name from the Lotus Lamp X app
    pub name: &'static str,
    /// Category the app lists the mode under
    pub category: Category,
}

/// Modes with documented app names, sorted by mode number.
static NAMED_MODES: &[(u8, ModeInfo)] = &[
    (
        137,
        ModeInfo {
            name: "7-Color in Cyan Running",
            category: Category::Run,
        },
    ),
    (
        138,
        ModeInfo {
            name: "7-Color in Cyan Run Back",
            category: Category::RunBack,
        },
    ),
    (
        143,
        ModeInfo {
            name: "W-R-W Flow",
            category: Category::Flow,
        },
    ),
    (
        144,
        ModeInfo {
            name: "W-R-W Flow Back",
            category: Category::Flow,
        },
    ),
];

/// Look up the app metadata for a mode number, if documented.
pub fn mode_info(mode: u8) -> Option<&'static ModeInfo> {
    NAMED_MODES
        .binary_search_by_key(&mode, |(number, _)| *number)
        .ok()
        .map(|i| &NAMED_MODES[i].1)
}

/// Look up the official app name for a mode number, if documented.
pub fn mode_name(mode: u8) -> Option<&'static str> {
    mode_info(mode).map(|info| info.name)
}

/// Case-insensitive search over the documented mode names.
///
/// Returns `(mode number, info)` pairs in mode-number order.
pub fn search_modes(query: &str) -> Vec<(u8, &'static ModeInfo)> {
    let query = query.to_lowercase();
    NAMED_MODES
        .iter()
        .filter(|(_, info)| info.name.to_lowercase().contains(&query))
        .map(|(number, info)| (*number, info))
        .collect()
}

/// Iterate over all documented modes in mode-number order.
pub fn documented_modes() -> impl Iterator<Item = (u8, &'static ModeInfo)> {
    NAMED_MODES.iter().map(|(number, info)| (*number, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_ANIMATION_MODE;

    #[test]
    fn test_mode_name_lookup() {
        assert_eq!(mode_name(143), Some("W-R-W Flow"));
        assert_eq!(mode_info(143).unwrap().category, Category::Flow);
        assert_eq!(mode_name(144), Some("W-R-W Flow Back"));
        assert_eq!(mode_name(0), None);
    }

    #[test]
    fn test_table_is_sorted_and_in_range() {
        let numbers: Vec<u8> = documented_modes().map(|(n, _)| n).collect();
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(numbers, sorted, "table must stay sorted for binary search");
        assert!(numbers.iter().all(|&n| n <= MAX_ANIMATION_MODE));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let results = search_modes("flow");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 143);

        let cyan = search_modes("CYAN");
        assert_eq!(cyan.len(), 2);
        assert_eq!(cyan[0].1.category, Category::Run);
        assert_eq!(cyan[1].1.category, Category::RunBack);

        assert!(search_modes("no such mode").is_empty());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::RunBack.to_string(), "runback");
        assert_eq!(Category::ALL.len(), 8);
    }
}
