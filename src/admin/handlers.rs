use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::probe::ProbeSettings;
use crate::store::{SettingsError, SettingsPatch};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub settings_persisted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdated {
    pub success: bool,
    pub ping_settings: ProbeSettings,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        settings_persisted: state.store.path().is_some(),
    })
}

pub async fn get_settings(State(state): State<AppState>) -> Json<ProbeSettings> {
    Json(state.store.snapshot().as_ref().clone())
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<SettingsUpdated>, SettingsError> {
    let settings = state.store.update(&patch).await?;
    Ok(Json(SettingsUpdated {
        success: true,
        ping_settings: settings.as_ref().clone(),
    }))
}
