use crate::model::AppState;
use crate::store::Store;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the request loop owns between requests.
#[derive(Default)]
pub struct SidecarState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Store>,
    pub app: AppState,
}
