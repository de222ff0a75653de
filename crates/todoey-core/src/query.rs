//! # Query Specifications
//!
//! What a live query looks at (scope), which rows it keeps (filter) and how
//! it orders them (sort).
//!
//! ## Shape of a Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          QuerySpec                                      │
//! │                                                                         │
//! │  scope:  AllCategories            │  ItemsOf(category)                 │
//! │  filter: NameContains("home")     │  TitleContains("eggo"), Done(true) │
//! │  sort:   Name                     │  Title, DateCreated, Done          │
//! │                                                                         │
//! │  Ties in the sort key keep insertion order.                            │
//! │  No sort at all means insertion order.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Two Item Views
//! The item list and the search box order rows differently:
//! - [`QuerySpec::item_list`]: every item, by title ascending
//! - [`QuerySpec::item_search`]: title matches, by creation date ascending

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::text::contains_folded;
use crate::types::{Category, CategoryId, Item};
use crate::validation::validate_search_query;

// =============================================================================
// Scope
// =============================================================================

/// The set of records a query ranges over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every category, in creation order.
    AllCategories,
    /// The `items` collection of one category, in insertion order.
    ItemsOf(CategoryId),
}

impl Scope {
    /// Returns true if this scope ranges over items.
    #[inline]
    pub fn is_items(&self) -> bool {
        matches!(self, Scope::ItemsOf(_))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::AllCategories => write!(f, "all categories"),
            Scope::ItemsOf(id) => write!(f, "items of {}", id),
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

/// A row predicate.
///
/// Text filters are substring matches under [`crate::text::fold`]: case and
/// accents are ignored. Surrounding whitespace in the search text is not
/// significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Item title contains the text.
    TitleContains(String),
    /// Category name contains the text.
    NameContains(String),
    /// Item completion flag equals the value.
    Done(bool),
    /// Every inner filter holds.
    All(Vec<Filter>),
}

impl Filter {
    /// Evaluates the filter against an item.
    ///
    /// Category-only filters never match.
    pub fn matches_item(&self, item: &Item) -> bool {
        match self {
            Filter::TitleContains(text) => contains_folded(&item.title, text.trim()),
            Filter::Done(done) => item.done == *done,
            Filter::NameContains(_) => false,
            Filter::All(filters) => filters.iter().all(|f| f.matches_item(item)),
        }
    }

    /// Evaluates the filter against a category.
    ///
    /// Item-only filters never match.
    pub fn matches_category(&self, category: &Category) -> bool {
        match self {
            Filter::NameContains(text) => contains_folded(&category.name, text.trim()),
            Filter::TitleContains(_) | Filter::Done(_) => false,
            Filter::All(filters) => filters.iter().all(|f| f.matches_category(category)),
        }
    }

    fn check(&self, scope: &Scope) -> CoreResult<()> {
        let applicable = match self {
            Filter::TitleContains(text) => {
                validate_search_query(text)?;
                scope.is_items()
            }
            Filter::NameContains(text) => {
                validate_search_query(text)?;
                !scope.is_items()
            }
            Filter::Done(_) => scope.is_items(),
            Filter::All(filters) => {
                for filter in filters {
                    filter.check(scope)?;
                }
                true
            }
        };

        if !applicable {
            return Err(CoreError::FilterNotApplicable {
                filter: self.to_string(),
                scope: scope.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::TitleContains(text) => write!(f, "title contains '{}'", text),
            Filter::NameContains(text) => write!(f, "name contains '{}'", text),
            Filter::Done(done) => write!(f, "done = {}", done),
            Filter::All(filters) => {
                write!(f, "all(")?;
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
        }
    }
}

// =============================================================================
// Sort
// =============================================================================

/// A field a query can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Category name.
    Name,
    /// Item title.
    Title,
    /// Item creation timestamp.
    DateCreated,
    /// Item completion flag (undone first when ascending).
    Done,
}

impl SortField {
    fn applies_to(&self, scope: &Scope) -> bool {
        match self {
            SortField::Name => !scope.is_items(),
            SortField::Title | SortField::DateCreated | SortField::Done => scope.is_items(),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortField::Name => write!(f, "name"),
            SortField::Title => write!(f, "title"),
            SortField::DateCreated => write!(f, "date_created"),
            SortField::Done => write!(f, "done"),
        }
    }
}

/// Single-key sort. Ties keep insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub ascending: bool,
}

impl SortSpec {
    /// Ascending sort on `field`.
    pub const fn ascending(field: SortField) -> Self {
        SortSpec {
            field,
            ascending: true,
        }
    }

    /// Descending sort on `field`.
    pub const fn descending(field: SortField) -> Self {
        SortSpec {
            field,
            ascending: false,
        }
    }
}

// =============================================================================
// Query Spec
// =============================================================================

/// Everything a live query needs to evaluate itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub scope: Scope,
    pub filter: Option<Filter>,
    pub sort: Option<SortSpec>,
}

impl QuerySpec {
    /// Every category in creation order.
    pub fn all_categories() -> Self {
        QuerySpec {
            scope: Scope::AllCategories,
            filter: None,
            sort: None,
        }
    }

    /// Every item of `category` in insertion order.
    pub fn items_of(category: CategoryId) -> Self {
        QuerySpec {
            scope: Scope::ItemsOf(category),
            filter: None,
            sort: None,
        }
    }

    /// The default item list: all items, by title ascending.
    pub fn item_list(category: CategoryId) -> Self {
        Self::items_of(category).sorted_by(SortSpec::ascending(SortField::Title))
    }

    /// The search box view: title matches, by creation date ascending.
    ///
    /// Empty (or blank) search text falls back to [`QuerySpec::item_list`],
    /// the same as clearing the search bar.
    pub fn item_search(category: CategoryId, text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::item_list(category);
        }
        Self::items_of(category)
            .filtered_by(Filter::TitleContains(text.to_string()))
            .sorted_by(SortSpec::ascending(SortField::DateCreated))
    }

    /// Replaces the filter.
    pub fn filtered_by(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Replaces the sort.
    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Checks that the filter and sort fit the scope.
    ///
    /// ## Errors
    /// - [`CoreError::FilterNotApplicable`] - e.g. `Done` over categories
    /// - [`CoreError::SortNotApplicable`] - e.g. categories by `Title`
    /// - [`CoreError::Validation`] - over-long search text
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(filter) = &self.filter {
            filter.check(&self.scope)?;
        }

        if let Some(sort) = &self.sort {
            if !sort.field.applies_to(&self.scope) {
                return Err(CoreError::SortNotApplicable {
                    field: sort.field.to_string(),
                    scope: self.scope.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Applies filter and sort to items given in insertion order.
    ///
    /// Reference evaluation used to check the SQL the store generates.
    pub fn apply_to_items(&self, items: &[Item]) -> Vec<Item> {
        let mut rows: Vec<Item> = items
            .iter()
            .filter(|item| self.filter.as_ref().map_or(true, |f| f.matches_item(item)))
            .cloned()
            .collect();

        if let Some(sort) = self.sort {
            // sort_by is stable, so ties keep insertion order
            rows.sort_by(|a, b| {
                let ord = match sort.field {
                    SortField::Title => a.title.cmp(&b.title),
                    SortField::DateCreated => a.date_created.cmp(&b.date_created),
                    SortField::Done => a.done.cmp(&b.done),
                    SortField::Name => std::cmp::Ordering::Equal,
                };
                if sort.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        rows
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;
    use chrono::{Duration, TimeZone, Utc};

    fn item(title: &str, minute: i64, done: bool) -> Item {
        Item {
            id: ItemId::new(),
            title: title.to_string(),
            done,
            date_created: Utc.with_ymd_and_hms(2019, 2, 5, 12, 0, 0).unwrap()
                + Duration::minutes(minute),
        }
    }

    #[test]
    fn test_item_list_sorts_by_title() {
        let spec = QuerySpec::item_list(CategoryId::from("c"));
        assert_eq!(spec.sort, Some(SortSpec::ascending(SortField::Title)));
        assert!(spec.filter.is_none());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_item_search_sorts_by_date() {
        let spec = QuerySpec::item_search(CategoryId::from("c"), " eggo ");
        assert_eq!(spec.filter, Some(Filter::TitleContains("eggo".to_string())));
        assert_eq!(spec.sort, Some(SortSpec::ascending(SortField::DateCreated)));
    }

    #[test]
    fn test_blank_search_falls_back_to_list() {
        let c = CategoryId::from("c");
        assert_eq!(QuerySpec::item_search(c.clone(), "  "), QuerySpec::item_list(c));
    }

    #[test]
    fn test_filter_scope_mismatch_is_rejected() {
        let spec = QuerySpec::all_categories().filtered_by(Filter::Done(true));
        assert!(matches!(
            spec.validate(),
            Err(CoreError::FilterNotApplicable { .. })
        ));

        let spec = QuerySpec::items_of(CategoryId::from("c"))
            .filtered_by(Filter::NameContains("x".to_string()));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_nested_filter_is_checked() {
        let spec = QuerySpec::all_categories().filtered_by(Filter::All(vec![
            Filter::NameContains("home".to_string()),
            Filter::Done(false),
        ]));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_sort_scope_mismatch_is_rejected() {
        let spec = QuerySpec::all_categories().sorted_by(SortSpec::ascending(SortField::Title));
        assert!(matches!(
            spec.validate(),
            Err(CoreError::SortNotApplicable { .. })
        ));

        let spec = QuerySpec::items_of(CategoryId::from("c"))
            .sorted_by(SortSpec::descending(SortField::Name));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_long_search_text_is_rejected() {
        let spec = QuerySpec::items_of(CategoryId::from("c"))
            .filtered_by(Filter::TitleContains("x".repeat(101)));
        assert!(matches!(spec.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_apply_filter_keeps_insertion_order() {
        let items = vec![
            item("Buy Eggos", 0, false),
            item("find mike", 1, false),
            item("EGGO run", 2, false),
        ];
        let spec = QuerySpec::items_of(CategoryId::from("c"))
            .filtered_by(Filter::TitleContains("eggo".to_string()));

        let titles: Vec<_> = spec
            .apply_to_items(&items)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Buy Eggos", "EGGO run"]);
    }

    #[test]
    fn test_apply_sort_is_stable() {
        let first = item("Milk", 0, false);
        let second = item("Milk", 1, true);
        let items = vec![item("Zucchini", 2, false), first.clone(), second.clone()];

        let spec = QuerySpec::item_list(CategoryId::from("c"));
        let sorted = spec.apply_to_items(&items);
        assert_eq!(sorted[0].id, first.id);
        assert_eq!(sorted[1].id, second.id);
        assert_eq!(sorted[2].title, "Zucchini");
    }

    #[test]
    fn test_apply_descending_done() {
        let items = vec![item("a", 0, false), item("b", 1, true)];
        let spec = QuerySpec::items_of(CategoryId::from("c"))
            .sorted_by(SortSpec::descending(SortField::Done));
        let sorted = spec.apply_to_items(&items);
        assert_eq!(sorted[0].title, "b");
    }

    #[test]
    fn test_category_filter() {
        let category = Category {
            id: CategoryId::new(),
            name: "Maison".to_string(),
            colour_tag: String::new(),
        };
        assert!(Filter::NameContains("MAIS".to_string()).matches_category(&category));
        assert!(!Filter::Done(true).matches_category(&category));
    }
}
