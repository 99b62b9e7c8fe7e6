use regex::{Regex, RegexBuilder};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub category: String,
    pub items: Vec<String>,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(category: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            category: category.into(),
            items,
        }
    }
}

/// Ordered category -> item names listing of remote objects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.category == name)
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.items.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Live, non-destructive regex filter over a [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    source: Catalog,
}

impl CatalogFilter {
    #[must_use]
    pub fn new(source: Catalog) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn original(&self) -> &Catalog {
        &self.source
    }

    /// Returns the categories and items whose `category/item` path matches
    /// `pattern` anywhere, case-insensitively. Categories left without items
    /// are omitted. An empty pattern returns everything untouched apart from
    /// the title-cased labels.
    #[must_use]
    pub fn find(&self, pattern: &str) -> Catalog {
        if pattern.is_empty() {
            return Catalog::new(
                self.source
                    .entries
                    .iter()
                    .map(|entry| CatalogEntry::new(title_case(&entry.category), entry.items.clone()))
                    .collect(),
            );
        }

        let regex = compile_pattern(pattern);
        let entries = self
            .source
            .entries
            .iter()
            .filter_map(|entry| {
                let items = entry
                    .items
                    .iter()
                    .filter(|item| {
                        regex
                            .as_ref()
                            .map_or(true, |regex| regex.is_match(&match_path(&entry.category, item)))
                    })
                    .cloned()
                    .collect::<Vec<_>>();
                (!items.is_empty()).then(|| CatalogEntry::new(title_case(&entry.category), items))
            })
            .collect();
        Catalog::new(entries)
    }
}

/// `None` stands for the empty regex, which matches every path.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(error) => {
            warn!(%pattern, %error, "invalid search pattern, matching everything");
            None
        }
    }
}

fn match_path(category: &str, item: &str) -> String {
    let mut path = String::with_capacity(category.len() + item.len() + 1);
    path.push_str(category);
    path.push('/');
    path.push_str(item);
    path
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the
/// rest, so `"scalarfunction"` becomes `"Scalarfunction"` and `"table_x"`
/// becomes `"Table_X"`.
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut previous_is_alpha = false;
    for character in text.chars() {
        if character.is_alphabetic() {
            if previous_is_alpha {
                output.extend(character.to_lowercase());
            } else {
                output.extend(character.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            output.push(character);
            previous_is_alpha = false;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{title_case, Catalog, CatalogEntry, CatalogFilter};

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    fn sample_catalog() -> Catalog {
        Catalog::new(vec![
            CatalogEntry::new("table", items(&["Users", "Orders", "UserRoles"])),
            CatalogEntry::new("view", items(&["Logs", "ActiveUsers"])),
            CatalogEntry::new("procedure", Vec::new()),
        ])
    }

    #[test]
    fn empty_pattern_returns_everything_title_cased() {
        let filter = CatalogFilter::new(Catalog::new(vec![CatalogEntry::new(
            "table",
            items(&["Users", "Orders"]),
        )]));

        let found = filter.find("");
        assert_eq!(
            found,
            Catalog::new(vec![CatalogEntry::new("Table", items(&["Users", "Orders"]))])
        );
    }

    #[test]
    fn filtering_drops_categories_without_matches() {
        let filter = CatalogFilter::new(Catalog::new(vec![
            CatalogEntry::new("table", items(&["Users"])),
            CatalogEntry::new("view", items(&["Logs"])),
        ]));

        let found = filter.find("Users");
        assert_eq!(
            found,
            Catalog::new(vec![CatalogEntry::new("Table", items(&["Users"]))])
        );
    }

    #[test]
    fn matching_is_case_insensitive_and_preserves_order() {
        let filter = CatalogFilter::new(sample_catalog());

        let found = filter.find("user");
        assert_eq!(found.entries.len(), 2);
        assert_eq!(found.entries[0].category, "Table");
        assert_eq!(found.entries[0].items, items(&["Users", "UserRoles"]));
        assert_eq!(found.entries[1].category, "View");
        assert_eq!(found.entries[1].items, items(&["ActiveUsers"]));
    }

    #[test]
    fn category_prefix_participates_in_matching() {
        let filter = CatalogFilter::new(sample_catalog());

        let found = filter.find("^view/");
        assert_eq!(
            found,
            Catalog::new(vec![CatalogEntry::new("View", items(&["Logs", "ActiveUsers"]))])
        );
    }

    #[test]
    fn invalid_pattern_matches_everything() {
        let filter = CatalogFilter::new(sample_catalog());

        let found = filter.find("[unterminated");
        assert_eq!(found.item_count(), filter.original().item_count());
        assert_eq!(found.entries.len(), 2);
        assert!(found.category("Procedure").is_none());
    }

    #[test]
    fn item_names_with_slashes_are_returned_whole() {
        let filter = CatalogFilter::new(Catalog::new(vec![CatalogEntry::new(
            "table",
            items(&["archive/2020"]),
        )]));

        let found = filter.find("2020");
        assert_eq!(found.entries[0].items, items(&["archive/2020"]));
    }

    #[test]
    fn find_leaves_source_untouched() {
        let filter = CatalogFilter::new(sample_catalog());
        let _ = filter.find("Logs");
        let _ = filter.find("");

        assert_eq!(filter.original(), &sample_catalog());
    }

    #[test]
    fn title_case_capitalises_each_word() {
        assert_eq!(title_case("table"), "Table");
        assert_eq!(title_case("scalarfunction"), "Scalarfunction");
        assert_eq!(title_case("table function"), "Table Function");
        assert_eq!(title_case("VIEW"), "View");
    }
}
