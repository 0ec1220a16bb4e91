pub mod backup_create;
pub mod backup_list;
pub mod backup_restore;
pub mod install;
pub mod lock;
pub mod probe;
pub mod session;
pub mod uninstall;
