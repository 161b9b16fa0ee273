//! Logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Workspace crates that get `default_level` when `RUST_LOG` is unset.
const CRATES: &[&str] = &[
    "teamquiz",
    "teamquiz_transport",
    "teamquiz_protocol",
    "teamquiz_session",
    "teamquiz_room",
    "teamquiz_tick",
    "tower_http",
];

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` overrides everything; otherwise the workspace crates and the
/// binary log at `default_level`.
///
/// # Examples
///
/// ```no_run
/// teamquiz::logger::setup_logger("teamquiz_server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_directives(binary_name: &str, level: &str) -> String {
    CRATES
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={level}", target.replace('-', "_")))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_workspace_and_binary() {
        let directives = default_directives("teamquiz-server", "debug");
        assert!(directives.starts_with("teamquiz=debug,"));
        assert!(directives.contains("teamquiz_room=debug"));
        assert!(directives.ends_with("teamquiz_server=debug"));
    }
}
