pub mod commands;
pub mod handlers;

pub use commands::{CliArgs, Commands, InitArgs, ScanArgs, SyncArgs};
pub use handlers::{handle_init, handle_scan, handle_sync, handle_version, OutputMode};
