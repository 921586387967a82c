//! Landing page and delivery-location selection.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{instrument, warn};

use ayts_core::{CartAction, Location, LocationId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::Visitor;
use crate::routes::views::LayoutView;
use crate::state::AppState;

/// Shown when the backend's location list can't be loaded.
fn fallback_locations() -> Vec<Location> {
    [
        ("1", "Manila"),
        ("2", "Quezon City"),
        ("3", "Makati"),
        ("4", "Pasig"),
    ]
    .into_iter()
    .map(|(id, name)| Location::new(id, name, "Metro Manila"))
    .collect()
}

/// Landing page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    /// Filter on location name or area.
    pub q: Option<String>,
    /// Show the picker even when a location is already selected.
    pub change: Option<String>,
}

/// Location option for display.
#[derive(Debug, Clone)]
pub struct LocationView {
    pub id: String,
    pub name: String,
    pub area: String,
    pub selected: bool,
}

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: LayoutView,
    pub locations: Vec<LocationView>,
    pub query: String,
    pub offline: bool,
}

/// Display the location picker.
#[instrument(skip(state, visitor))]
pub async fn home(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(params): Query<HomeQuery>,
) -> Response {
    let current = visitor.state().location.clone();
    if current.is_some() && params.change.is_none() {
        return Redirect::to("/categories").into_response();
    }

    let api = visitor.api(&state).await;
    let (locations, offline) = match api.locations().await {
        Ok(found) if !found.is_empty() => (
            found
                .iter()
                .filter(|location| location.is_active)
                .map(|location| location.to_location())
                .collect(),
            false,
        ),
        Ok(_) => (fallback_locations(), true),
        Err(e) => {
            visitor.observe(&e).await;
            warn!(error = %e, "Failed to load locations, using fallback list");
            (fallback_locations(), true)
        }
    };

    let query = params.q.unwrap_or_default();
    let selected_id = current.as_ref().map(|location| &location.id);
    let locations = locations
        .into_iter()
        .filter(|location| location.matches(&query))
        .map(|location| LocationView {
            selected: Some(&location.id) == selected_id,
            id: location.id.to_string(),
            name: location.name,
            area: location.area,
        })
        .collect();

    HomeTemplate {
        layout: LayoutView::new(visitor.state()),
        locations,
        query,
        offline,
    }
    .into_response()
}

/// Location selection form data.
#[derive(Debug, Deserialize)]
pub struct SelectLocationForm {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub area: String,
}

/// Select a delivery location.
#[instrument(skip(visitor))]
pub async fn select(mut visitor: Visitor, Form(form): Form<SelectLocationForm>) -> Result<Redirect> {
    let id = form.id.trim();
    let name = form.name.trim();
    if id.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest("location id and name are required".to_string()));
    }

    let location = Location::new(LocationId::new(id), name, form.area.trim());
    add_breadcrumb("location", "Selected location", Some(&[("location_id", id)]));
    visitor
        .dispatch(CartAction::SetLocation(Some(location)))
        .await?;

    Ok(Redirect::to("/categories"))
}

/// Forget the selected location.
#[instrument(skip(visitor))]
pub async fn clear(mut visitor: Visitor) -> Result<Redirect> {
    visitor.dispatch(CartAction::SetLocation(None)).await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_locations() {
        let locations = fallback_locations();
        let names: Vec<_> = locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Manila", "Quezon City", "Makati", "Pasig"]);
        assert!(locations.iter().all(|l| l.area == "Metro Manila"));
    }
}
