mod constants;
pub mod store;
pub mod sweep;

// Re-export public items
pub use constants::{BACKUP_SUFFIX, TEMP_PREFIX};
pub use store::{backup, backup_path, has_backup, restore};
pub use sweep::{find_backups, find_leftover_temps, remove_leftover_temps};
