//! Visitor extractors.
//!
//! Every browser gets a visitor id in its session on first contact. The id
//! keys the visitor's cart actor and persisted entries.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use ayts_core::{CartAction, Location, ShoppingState};

use crate::api::{ApiClient, ApiError};
use crate::error::AppError;
use crate::models::session_keys;
use crate::services::{CartHandle, HubError};
use crate::state::AppState;

/// The current visitor with their hydrated shopping state.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(mut visitor: Visitor) -> Result<impl IntoResponse> {
///     visitor.dispatch(CartAction::Clear).await?;
///     Ok(format!("{} items", visitor.state().cart.item_count()))
/// }
/// ```
pub struct Visitor {
    id: Uuid,
    cart: CartHandle,
    state: ShoppingState,
    session: Session,
}

impl Visitor {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn state(&self) -> &ShoppingState {
        &self.state
    }

    /// Send an action to the visitor's actor and keep the resulting state.
    ///
    /// # Errors
    ///
    /// Returns `HubError` if the actor is gone.
    pub async fn dispatch(&mut self, action: CartAction) -> Result<&ShoppingState, HubError> {
        self.state = self.cart.dispatch(action).await?;
        Ok(&self.state)
    }

    /// The visitor's marketplace bearer token, if they have one.
    pub async fn auth_token(&self) -> Option<SecretString> {
        self.session
            .get::<String>(session_keys::AUTH_TOKEN)
            .await
            .ok()
            .flatten()
            .map(SecretString::from)
    }

    /// A backend client carrying the visitor's token.
    pub async fn api(&self, state: &AppState) -> ApiClient {
        state.api().authorized(self.auth_token().await)
    }

    /// Drop the stored token when the backend rejected it.
    pub async fn observe(&self, err: &ApiError) {
        if !err.is_unauthorized() {
            return;
        }
        warn!(visitor = %self.id, "Backend rejected token, clearing it");
        if let Err(e) = self
            .session
            .remove::<String>(session_keys::AUTH_TOKEN)
            .await
        {
            warn!(error = %e, "Failed to clear rejected token");
        }
    }
}

impl FromRequestParts<AppState> for Visitor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        let id = match session.get::<Uuid>(session_keys::VISITOR_ID).await? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session.insert(session_keys::VISITOR_ID, id).await?;
                id
            }
        };

        sentry::configure_scope(|scope| {
            scope.set_tag("visitor_id", id);
        });

        let cart = state.carts().handle(id).await;
        let current = cart.state().await?;

        Ok(Self {
            id,
            cart,
            state: current,
            session,
        })
    }
}

/// Extractor for pages that need a selected delivery location.
///
/// Visitors without one are sent back to the landing page.
pub struct RequireLocation {
    pub visitor: Visitor,
    pub location: Location,
}

/// Rejection for [`RequireLocation`].
pub enum LocationRejection {
    /// No location selected; go pick one.
    Redirect { htmx: bool },
    /// The visitor could not be loaded.
    Error(AppError),
}

impl IntoResponse for LocationRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect { htmx: true } => (StatusCode::OK, [("HX-Redirect", "/")]).into_response(),
            Self::Redirect { htmx: false } => Redirect::to("/").into_response(),
            Self::Error(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireLocation {
    type Rejection = LocationRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let visitor = Visitor::from_request_parts(parts, state)
            .await
            .map_err(LocationRejection::Error)?;

        match visitor.state().location.clone() {
            Some(location) => Ok(Self { visitor, location }),
            None => Err(LocationRejection::Redirect {
                htmx: parts.headers.contains_key("hx-request"),
            }),
        }
    }
}
