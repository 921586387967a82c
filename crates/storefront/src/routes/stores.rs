//! Store list, store detail and the store's product search.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{instrument, warn};

use ayts_core::{CartAction, StoreId};

use crate::api::{ProductQuery, Store, StoreQuery};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireLocation, Visitor};
use crate::routes::categories::{DEFAULT_CATEGORIES, parse_category};
use crate::routes::views::{LayoutView, NotFoundTemplate, ProductCardView, format_price};
use crate::services::Debounce;
use crate::state::AppState;

const PRODUCT_PAGE_SIZE: u32 = 50;

/// Store list ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Backend order.
    #[default]
    Recommended,
    Name,
    Category,
    Rating,
}

impl SortBy {
    pub const ALL: [Self; 4] = [Self::Recommended, Self::Name, Self::Category, Self::Rating];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Recommended => "recommended",
            Self::Name => "name",
            Self::Category => "category",
            Self::Rating => "rating",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Recommended => "Recommended",
            Self::Name => "Name",
            Self::Category => "Category",
            Self::Rating => "Rating",
        }
    }
}

/// Store list query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct StoreListQuery {
    /// Replace the selected category ("All" clears it).
    pub category: Option<String>,
    #[serde(default)]
    pub sort: SortBy,
}

/// Store card for display.
#[derive(Debug, Clone)]
pub struct StoreCardView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub address: String,
    pub rating: String,
    pub logo_url: Option<String>,
    pub is_verified: bool,
    pub delivery_fee: Option<String>,
}

impl From<&Store> for StoreCardView {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id.to_string(),
            name: store.name.clone(),
            category: store.category_name().unwrap_or_default().to_string(),
            address: store.address.clone(),
            rating: format!("{:.1}", store.rating),
            logo_url: store.logo_url.clone(),
            is_verified: store.is_verified,
            delivery_fee: store.delivery_fee.map(format_price),
        }
    }
}

/// Category chip above the store list.
#[derive(Debug, Clone)]
pub struct CategoryFilterView {
    pub name: String,
    pub href: String,
    pub active: bool,
}

fn category_filters(selected: Option<&str>, sort: SortBy) -> Vec<CategoryFilterView> {
    std::iter::once("All")
        .chain(DEFAULT_CATEGORIES)
        .map(|name| {
            let mut href = url::form_urlencoded::Serializer::new(String::from("/stores?"));
            href.append_pair("category", name).append_pair("sort", sort.key());
            CategoryFilterView {
                name: name.to_string(),
                href: href.finish(),
                active: selected.map_or(name == "All", |selected| selected.eq_ignore_ascii_case(name)),
            }
        })
        .collect()
}

/// Store list template.
#[derive(Template, WebTemplate)]
#[template(path = "stores/index.html")]
pub struct StoresTemplate {
    pub layout: LayoutView,
    pub location_name: String,
    pub heading: String,
    pub category_filters: Vec<CategoryFilterView>,
    pub sort: SortBy,
    pub sort_options: [SortBy; 4],
    pub stores: Vec<StoreCardView>,
    pub load_failed: bool,
}

/// Keep stores in `category` (by name) and order them.
#[must_use]
pub fn arrange(mut stores: Vec<Store>, category: Option<&str>, sort: SortBy) -> Vec<Store> {
    if let Some(category) = category {
        stores.retain(|store| {
            store
                .category_name()
                .is_some_and(|name| name.eq_ignore_ascii_case(category))
        });
    }

    match sort {
        SortBy::Recommended => {}
        SortBy::Name => stores.sort_by_key(|store| store.name.to_lowercase()),
        SortBy::Category => stores.sort_by(|a, b| {
            a.category_name()
                .unwrap_or_default()
                .cmp(b.category_name().unwrap_or_default())
        }),
        SortBy::Rating => stores.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
    }
    stores
}

/// Display stores for the selected location.
#[instrument(skip(state, guard))]
pub async fn index(
    State(state): State<AppState>,
    guard: RequireLocation,
    Query(params): Query<StoreListQuery>,
) -> Result<StoresTemplate> {
    let RequireLocation {
        mut visitor,
        location,
    } = guard;

    if let Some(raw) = params.category.as_deref() {
        let category = parse_category(raw);
        if category != visitor.state().category {
            visitor.dispatch(CartAction::SetCategory(category)).await?;
        }
    }
    let category = visitor.state().category.clone();

    let api = visitor.api(&state).await;
    let query = StoreQuery {
        location_id: Some(location.id.clone()),
        ..StoreQuery::default()
    };
    let (stores, load_failed) = match api.stores(&query).await {
        Ok(stores) => (arrange(stores, category.as_deref(), params.sort), false),
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, location_id = %location.id, "Failed to load stores");
            (Vec::new(), true)
        }
    };

    Ok(StoresTemplate {
        layout: LayoutView::new(visitor.state()),
        location_name: location.name,
        category_filters: category_filters(category.as_deref(), params.sort),
        heading: category.unwrap_or_else(|| "All Stores".to_string()),
        sort: params.sort,
        sort_options: SortBy::ALL,
        stores: stores.iter().map(StoreCardView::from).collect(),
        load_failed,
    })
}

/// Store detail template.
#[derive(Template, WebTemplate)]
#[template(path = "stores/show.html")]
pub struct StoreTemplate {
    pub layout: LayoutView,
    pub store: StoreCardView,
    pub description: String,
    pub phone: Option<String>,
    pub minimum_order: Option<String>,
    pub products: Vec<ProductCardView>,
    pub query: String,
    pub load_failed: bool,
}

/// Display a store and its products.
#[instrument(skip(state, guard))]
pub async fn show(
    State(state): State<AppState>,
    guard: RequireLocation,
    Path(id): Path<String>,
) -> Response {
    let RequireLocation { visitor, .. } = guard;
    let store_id = StoreId::new(id);
    let api = visitor.api(&state).await;

    let products_query = ProductQuery {
        store: Some(store_id.clone()),
        limit: Some(PRODUCT_PAGE_SIZE),
        ..ProductQuery::default()
    };
    let (store, products) = tokio::join!(api.store(&store_id), api.products(&products_query));

    let store = match store {
        Ok(store) => store,
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, store_id = %store_id, "Failed to load store");
            return (
                StatusCode::NOT_FOUND,
                NotFoundTemplate::new(
                    LayoutView::new(visitor.state()),
                    "Store not found",
                    "/stores",
                    "Back to stores",
                ),
            )
                .into_response();
        }
    };

    let (products, load_failed) = match products {
        Ok(page) => (page.products, false),
        Err(e) => {
            warn!(error = %e, store_id = %store_id, "Failed to load store products");
            (Vec::new(), true)
        }
    };

    let cart = &visitor.state().cart;
    StoreTemplate {
        layout: LayoutView::new(visitor.state()),
        store: StoreCardView::from(&store),
        description: store.description.clone().unwrap_or_default(),
        phone: store.phone.clone(),
        minimum_order: store.minimum_order_amount.map(format_price),
        products: products
            .iter()
            .filter(|product| product.is_active)
            .map(|product| ProductCardView::new(product, cart))
            .collect(),
        query: String::new(),
        load_failed,
    }
    .into_response()
}

/// Product search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductSearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Product list fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_list.html")]
pub struct ProductListTemplate {
    pub products: Vec<ProductCardView>,
    pub query: String,
    pub load_failed: bool,
}

/// Leave the product list as the newer search renders it.
fn superseded() -> Response {
    (StatusCode::NO_CONTENT, [("HX-Reswap", "none")]).into_response()
}

/// Search a store's products (HTMX, debounced per visitor and store).
///
/// Superseded requests, including ones overtaken while the backend answered,
/// respond `204` with `HX-Reswap: none` so the page keeps whatever the newer
/// request renders.
#[instrument(skip(state, visitor))]
pub async fn search_products(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<String>,
    Query(params): Query<ProductSearchQuery>,
) -> Response {
    let store_id = StoreId::new(id);
    let query = params.q.trim().to_string();

    let Debounce::Proceed(ticket) = state.search().settle(visitor.id(), &store_id, &query).await
    else {
        return superseded();
    };

    let api = visitor.api(&state).await;
    let products_query = ProductQuery {
        store: Some(store_id.clone()),
        search: (!query.is_empty()).then(|| query.clone()),
        limit: Some(PRODUCT_PAGE_SIZE),
        ..ProductQuery::default()
    };
    let (products, load_failed) = match api.products(&products_query).await {
        Ok(page) => (page.products, false),
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, store_id = %store_id, "Product search failed");
            (Vec::new(), true)
        }
    };

    if !ticket.is_latest() {
        return superseded();
    }

    let cart = &visitor.state().cart;
    ProductListTemplate {
        products: products
            .iter()
            .filter(|product| product.is_active)
            .map(|product| ProductCardView::new(product, cart))
            .collect(),
        query,
        load_failed,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(name: &str, category: &str, rating: f64) -> Store {
        serde_json::from_value(serde_json::json!({
            "id": name,
            "name": name,
            "rating": rating,
            "category": {"id": category, "name": category}
        }))
        .unwrap()
    }

    fn names(stores: &[Store]) -> Vec<&str> {
        stores.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_arrange_filters_by_category_name() {
        let stores = vec![
            store("Botika", "Pharmacy", 4.0),
            store("Fresh Mart", "Grocery", 4.5),
        ];

        let arranged = arrange(stores, Some("grocery"), SortBy::Recommended);

        assert_eq!(names(&arranged), ["Fresh Mart"]);
    }

    #[test]
    fn test_arrange_sorts() {
        let stores = vec![
            store("b", "Pharmacy", 3.0),
            store("a", "Grocery", 4.8),
            store("c", "Bakery", 4.1),
        ];

        assert_eq!(names(&arrange(stores.clone(), None, SortBy::Name)), ["a", "b", "c"]);
        assert_eq!(
            names(&arrange(stores.clone(), None, SortBy::Category)),
            ["c", "a", "b"]
        );
        assert_eq!(names(&arrange(stores, None, SortBy::Rating)), ["a", "c", "b"]);
    }

    #[test]
    fn test_category_filters_mark_selection() {
        let filters = category_filters(Some("Water Refillers"), SortBy::Rating);

        let active: Vec<_> = filters.iter().filter(|f| f.active).map(|f| f.name.as_str()).collect();
        assert_eq!(active, ["Water Refillers"]);
        let refill = filters.iter().find(|f| f.active).unwrap();
        assert_eq!(refill.href, "/stores?category=Water+Refillers&sort=rating");

        let filters = category_filters(None, SortBy::Recommended);
        assert!(filters[0].active);
        assert_eq!(filters[0].name, "All");
    }

    #[test]
    fn test_sort_wire_names() {
        let query: StoreListQuery = serde_json::from_value(serde_json::json!({"sort": "rating"})).unwrap();
        assert_eq!(query.sort, SortBy::Rating);
        assert_eq!(SortBy::default().key(), "recommended");
    }
}
