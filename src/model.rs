//! Client-side data model: sessions, workspaces, and workspace log lines.

mod logs;
mod session;
mod workspace;

pub use self::logs::*;
pub use self::session::*;
pub use self::workspace::*;

pub fn now_ts() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "<time>".to_string())
}
