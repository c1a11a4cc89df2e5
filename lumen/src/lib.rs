pub mod commands;
pub mod handlers;

pub use handlers::{build_scan_config, format_outcome, parse_url_line, resolve_db_path};
