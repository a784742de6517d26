/*
 * Path helpers for locating the application's per-user settings directory.
 * Centralized here so the settings store and any future per-user state share
 * the same location logic.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

/*
 * Returns the platform-specific local (non-roaming) configuration directory
 * for `app_name`, creating it if it does not exist yet. No organization
 * qualifier is used, so the directory sits directly under the user's local
 * application data root. Returns `None` when the location cannot be
 * determined or created.
 */
pub fn get_app_settings_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Resolving settings dir for '{app_name}'");
    let proj_dirs = ProjectDirs::from("", "", app_name)?;
    let settings_path = proj_dirs.config_local_dir();
    if !settings_path.exists() {
        if let Err(e) = fs::create_dir_all(settings_path) {
            log::error!("PathUtils: Failed to create settings directory {settings_path:?}: {e}");
            return None;
        }
        log::debug!("PathUtils: Created settings directory: {settings_path:?}");
    }
    Some(settings_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleanup(app_name: &str) {
        if let Some(proj_dirs) = ProjectDirs::from("", "", app_name) {
            let dir = proj_dirs.config_local_dir();
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(dir) {
                    eprintln!("Test cleanup failed for {dir:?}: {e}");
                }
            }
        }
    }

    #[test]
    fn test_get_app_settings_dir_creates_if_missing() {
        let unique_app_name = format!("TestApp_PathUtils_Create_{}", rand::random::<u128>());

        let path = get_app_settings_dir(&unique_app_name).expect("Should resolve a settings dir");
        assert!(path.is_dir(), "Directory should exist at {path:?}");
        assert!(
            path.to_string_lossy()
                .to_lowercase()
                .contains(&unique_app_name.to_lowercase())
        );

        cleanup(&unique_app_name);
    }

    #[test]
    fn test_get_app_settings_dir_returns_same_path_when_existing() {
        let unique_app_name = format!("TestApp_PathUtils_Existing_{}", rand::random::<u128>());

        let first = get_app_settings_dir(&unique_app_name).expect("First resolution failed");
        let second = get_app_settings_dir(&unique_app_name).expect("Second resolution failed");
        assert_eq!(first, second);

        cleanup(&unique_app_name);
    }
}
