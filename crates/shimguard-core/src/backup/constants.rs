/// Suffix appended to a file's full name to form its backup.
///
/// This is an on-disk contract: orphaned backups are discovered by this
/// suffix alone, so it must never change between releases.
pub const BACKUP_SUFFIX: &str = ".shimguard.backup";
/// Prefix for the temporary files used to publish backups and restores
pub const TEMP_PREFIX: &str = ".shimguard-";
