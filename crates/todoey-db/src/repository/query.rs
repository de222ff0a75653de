//! # Query Compilation
//!
//! Turns a [`QuerySpec`] into SQL.
//!
//! ## Generated Shape
//! ```text
//! ItemsOf(c), TitleContains("eggo"), DateCreated asc
//!
//!   SELECT i.id, i.title, i.done, i.date_created
//!   FROM category_items ci JOIN items i ON i.id = ci.item_id
//!   WHERE ci.category_id = ? AND instr(i.title_folded, ?) > 0
//!   ORDER BY i.date_created ASC, ci.position ASC
//! ```
//!
//! The trailing `position` (items) or `seq` (categories) key keeps ties in
//! insertion order. Text filters compare against the folded columns with
//! the needle folded the same way, so matching ignores case and accents.
//! Titles and names sort by their stored text, not the folded copy.

use sqlx::{QueryBuilder, Sqlite};
use todoey_core::text::fold;
use todoey_core::{Filter, QuerySpec, Scope, SortField};

const ITEM_COLUMNS: &str = "SELECT i.id, i.title, i.done, i.date_created \
     FROM category_items ci JOIN items i ON i.id = ci.item_id \
     WHERE ci.category_id = ";

const CATEGORY_COLUMNS: &str = "SELECT c.id, c.name, c.colour_tag FROM categories c WHERE ";

/// Every visible row, in view order.
pub(crate) fn select_rows(spec: &QuerySpec) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new("");
    push_select(&mut builder, spec);
    builder
}

/// Number of visible rows.
pub(crate) fn select_count(spec: &QuerySpec) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM (");
    push_select(&mut builder, spec);
    builder.push(")");
    builder
}

/// The row at `index` in view order.
pub(crate) fn select_at(spec: &QuerySpec, index: usize) -> QueryBuilder<'static, Sqlite> {
    let mut builder = select_rows(spec);
    builder.push(" LIMIT 1 OFFSET ");
    builder.push_bind(index as i64);
    builder
}

fn push_select(builder: &mut QueryBuilder<'static, Sqlite>, spec: &QuerySpec) {
    match &spec.scope {
        Scope::ItemsOf(category) => {
            builder.push(ITEM_COLUMNS);
            builder.push_bind(category.as_str().to_owned());
        }
        Scope::AllCategories => {
            builder.push(CATEGORY_COLUMNS);
            builder.push("1");
        }
    }

    if let Some(filter) = &spec.filter {
        builder.push(" AND ");
        push_filter(builder, filter, &spec.scope);
    }

    builder.push(" ORDER BY ");
    if let Some(sort) = spec.sort {
        if let Some(column) = sort_column(sort.field, &spec.scope) {
            builder.push(column);
            builder.push(if sort.ascending { " ASC, " } else { " DESC, " });
        }
    }
    builder.push(match spec.scope {
        Scope::ItemsOf(_) => "ci.position ASC",
        Scope::AllCategories => "c.seq ASC",
    });
}

fn push_filter(builder: &mut QueryBuilder<'static, Sqlite>, filter: &Filter, scope: &Scope) {
    match (filter, scope) {
        (Filter::TitleContains(text), Scope::ItemsOf(_)) => {
            builder.push("instr(i.title_folded, ");
            builder.push_bind(fold(text.trim()));
            builder.push(") > 0");
        }
        (Filter::NameContains(text), Scope::AllCategories) => {
            builder.push("instr(c.name_folded, ");
            builder.push_bind(fold(text.trim()));
            builder.push(") > 0");
        }
        (Filter::Done(done), Scope::ItemsOf(_)) => {
            builder.push("i.done = ");
            builder.push_bind(*done);
        }
        (Filter::All(filters), _) if filters.is_empty() => {
            builder.push("1");
        }
        (Filter::All(filters), _) => {
            builder.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    builder.push(" AND ");
                }
                push_filter(builder, inner, scope);
            }
            builder.push(")");
        }
        // Rejected by QuerySpec::validate before reaching here
        _ => {
            builder.push("0");
        }
    }
}

fn sort_column(field: SortField, scope: &Scope) -> Option<&'static str> {
    match (field, scope) {
        (SortField::Title, Scope::ItemsOf(_)) => Some("i.title"),
        (SortField::DateCreated, Scope::ItemsOf(_)) => Some("i.date_created"),
        (SortField::Done, Scope::ItemsOf(_)) => Some("i.done"),
        (SortField::Name, Scope::AllCategories) => Some("c.name"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoey_core::{CategoryId, SortSpec};

    fn sql_of(builder: QueryBuilder<'static, Sqlite>) -> String {
        builder.sql().to_string()
    }

    #[test]
    fn test_item_search_sql() {
        let spec = QuerySpec::item_search(CategoryId::from("c"), "eggo");
        let sql = sql_of(select_rows(&spec));
        assert!(sql.contains("WHERE ci.category_id = ? AND instr(i.title_folded, ?) > 0"));
        assert!(sql.ends_with("ORDER BY i.date_created ASC, ci.position ASC"));
    }

    #[test]
    fn test_unsorted_categories_use_creation_order() {
        let sql = sql_of(select_rows(&QuerySpec::all_categories()));
        assert!(sql.ends_with("WHERE 1 ORDER BY c.seq ASC"));
    }

    #[test]
    fn test_descending_sort_keeps_tie_break_ascending() {
        let spec = QuerySpec::all_categories().sorted_by(SortSpec::descending(SortField::Name));
        let sql = sql_of(select_rows(&spec));
        assert!(sql.ends_with("ORDER BY c.name DESC, c.seq ASC"));
    }

    #[test]
    fn test_conjunction() {
        let spec = QuerySpec::items_of(CategoryId::from("c")).filtered_by(Filter::All(vec![
            Filter::TitleContains("milk".to_string()),
            Filter::Done(false),
        ]));
        let sql = sql_of(select_rows(&spec));
        assert!(sql.contains("AND (instr(i.title_folded, ?) > 0 AND i.done = ?)"));
    }

    #[test]
    fn test_count_and_at_wrap_the_row_query() {
        let spec = QuerySpec::item_list(CategoryId::from("c"));
        assert!(sql_of(select_count(&spec)).starts_with("SELECT COUNT(*) FROM (SELECT i.id"));
        assert!(sql_of(select_at(&spec, 3)).ends_with("LIMIT 1 OFFSET ?"));
    }
}
