// Application state management
use std::path::PathBuf;

use crate::settings::AppSettings;
use crate::transport::TransportHandle;

pub struct AppState {
    pub transport: TransportHandle,
    pub settings: AppSettings,
    pub app_dir: PathBuf,
}

impl AppState {
    pub fn new(transport: TransportHandle, settings: AppSettings, app_dir: PathBuf) -> Self {
        Self {
            transport,
            settings,
            app_dir,
        }
    }
}
