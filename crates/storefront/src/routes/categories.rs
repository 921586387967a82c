//! Store category grid.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::{instrument, warn};

use ayts_core::CartAction;

use crate::api::Category;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireLocation, Visitor};
use crate::routes::views::LayoutView;
use crate::state::AppState;

/// Shown when the backend's category list can't be loaded.
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Grocery",
    "Pharmacy",
    "Vegetable Vendors",
    "Water Refillers",
    "Construction Supplies",
    "Local Businesses",
];

/// Category tile for display.
#[derive(Debug, Clone)]
pub struct CategoryView {
    pub name: String,
    pub icon: Option<String>,
    pub selected: bool,
}

/// Categories page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories.html")]
pub struct CategoriesTemplate {
    pub layout: LayoutView,
    pub location_name: String,
    pub categories: Vec<CategoryView>,
}

/// Active categories in display order, or `None` when there are none.
fn active_categories(mut categories: Vec<Category>) -> Option<Vec<Category>> {
    categories.retain(|category| category.is_active);
    categories.sort_by_key(|category| category.sort_order);
    (!categories.is_empty()).then_some(categories)
}

/// Display the category grid.
#[instrument(skip(state, guard))]
pub async fn index(State(state): State<AppState>, guard: RequireLocation) -> CategoriesTemplate {
    let RequireLocation { visitor, location } = guard;
    let selected = visitor.state().category.clone();

    let api = visitor.api(&state).await;
    let loaded = match api.categories().await {
        Ok(categories) => active_categories(categories),
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, "Failed to load categories, using defaults");
            None
        }
    };

    let categories = loaded.map_or_else(
        || {
            DEFAULT_CATEGORIES
                .iter()
                .map(|name| ((*name).to_string(), None))
                .collect::<Vec<_>>()
        },
        |categories| {
            categories
                .into_iter()
                .map(|category| (category.name, category.icon))
                .collect()
        },
    );

    CategoriesTemplate {
        layout: LayoutView::new(visitor.state()),
        location_name: location.name,
        categories: categories
            .into_iter()
            .map(|(name, icon)| CategoryView {
                selected: selected.as_deref() == Some(name.as_str()),
                name,
                icon,
            })
            .collect(),
    }
}

/// Category selection form data.
#[derive(Debug, Deserialize)]
pub struct SelectCategoryForm {
    #[serde(default)]
    pub category: String,
}

/// Normalize a submitted category: blank or "All" means no filter.
#[must_use]
pub fn parse_category(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Select a category and go to the store list.
#[instrument(skip(visitor))]
pub async fn select(mut visitor: Visitor, Form(form): Form<SelectCategoryForm>) -> Result<Redirect> {
    visitor
        .dispatch(CartAction::SetCategory(parse_category(&form.category)))
        .await?;
    Ok(Redirect::to("/stores"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(name: &str, order: i32, active: bool) -> Category {
        serde_json::from_value(serde_json::json!({
            "id": name, "name": name, "sortOrder": order, "isActive": active
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category(""), None);
        assert_eq!(parse_category("All"), None);
        assert_eq!(parse_category(" Pharmacy "), Some("Pharmacy".to_string()));
    }

    #[test]
    fn test_active_categories_sorted() {
        let categories = active_categories(vec![
            category("Pharmacy", 2, true),
            category("Hidden", 0, false),
            category("Grocery", 1, true),
        ])
        .unwrap();

        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Grocery", "Pharmacy"]);
        assert!(active_categories(vec![category("Hidden", 0, false)]).is_none());
    }
}
