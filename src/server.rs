//! HTTP surface:
//! - GET /show_training - rendered appointments for embedding in a page
//! - POST /admin/ajax/clear_cache - invalidate and schedule a refetch
//! - GET /admin/settings - current settings, secret masked
//! - POST /admin/settings - update settings
//!
//! Admin routes require the `X-Admin-Token` header.

use axum::{
  extract::State,
  http::{HeaderMap, StatusCode},
  response::{Html, IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::{AppointmentCache, SqliteStorage};
use crate::settings::{Settings, SettingsInput};
use crate::shortcode;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub type Cache = AppointmentCache<SqliteStorage>;

#[derive(Clone)]
pub struct AppState {
  pub cache: Arc<Cache>,
  /// `None` disables the admin routes.
  pub admin_token: Option<Arc<str>>,
}

/// Body of every admin response: `{"success": bool, "data": ...}`.
#[derive(Debug, Serialize)]
struct AjaxResponse<T> {
  success: bool,
  data: T,
}

#[derive(Debug, Serialize)]
struct AjaxError {
  error: String,
}

fn ajax_success<T: Serialize>(data: T) -> Response {
  Json(AjaxResponse {
    success: true,
    data,
  })
  .into_response()
}

fn ajax_error(status: StatusCode, message: impl Into<String>) -> Response {
  (
    status,
    Json(AjaxResponse {
      success: false,
      data: AjaxError {
        error: message.into(),
      },
    }),
  )
    .into_response()
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/show_training", get(show_training))
    .route("/admin/ajax/clear_cache", post(clear_cache))
    .route("/admin/settings", get(get_settings).post(update_settings))
    .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, listen: &str) -> Result<()> {
  let listener = tokio::net::TcpListener::bind(listen)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", listen, e))?;
  info!(listen, "Serving appointments");

  let cache = Arc::clone(&state.cache);
  axum::serve(listener, router(state))
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  cache.cancel_pending_refresh();
  Ok(())
}

async fn show_training(State(state): State<AppState>) -> Html<String> {
  match state.cache.get_appointments().await {
    Ok(appointments) => Html(shortcode::render(
      &appointments,
      state.cache.settings().display_mode(),
    )),
    Err(e) => {
      // Visitors never see fetch problems, only an empty section.
      error!(error = %e, "Failed to load appointments");
      Html(String::new())
    }
  }
}

/// Nonce-style guard for admin routes.
fn check_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
  let Some(expected) = state.admin_token.as_deref() else {
    return Err(ajax_error(
      StatusCode::FORBIDDEN,
      "Admin actions are disabled on this server.",
    ));
  };
  let provided = headers
    .get(ADMIN_TOKEN_HEADER)
    .and_then(|v| v.to_str().ok());
  if provided != Some(expected) {
    warn!("Rejected admin request with missing or wrong token");
    return Err(ajax_error(StatusCode::FORBIDDEN, "Invalid security token."));
  }
  Ok(())
}

async fn clear_cache(State(state): State<AppState>, headers: HeaderMap) -> Response {
  if let Err(rejection) = check_admin(&state, &headers) {
    return rejection;
  }

  info!(
    replacing_pending = state.cache.is_refresh_pending(),
    "Appointment refetch requested"
  );
  if state.cache.request_refetch() {
    ajax_success(true)
  } else {
    ajax_error(
      StatusCode::OK,
      "Could not schedule event to clear cache. Try again later.",
    )
  }
}

async fn get_settings(State(state): State<AppState>, headers: HeaderMap) -> Response {
  if let Err(rejection) = check_admin(&state, &headers) {
    return rejection;
  }
  ajax_success(state.cache.settings().snapshot().masked())
}

async fn update_settings(
  State(state): State<AppState>,
  headers: HeaderMap,
  Json(input): Json<SettingsInput>,
) -> Response {
  if let Err(rejection) = check_admin(&state, &headers) {
    return rejection;
  }

  match state.cache.settings().set(&input) {
    Ok(change) => ajax_success::<Settings>(change.new.masked()),
    Err(e) => {
      error!(error = %e, "Failed to save settings");
      ajax_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not save settings.")
    }
  }
}
