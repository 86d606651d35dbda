//! Runtime tool path resolution
//!
//! Every external binary the pipeline drives (git, docker, the platform CLI) is
//! resolved through an environment-variable override:
//!
//! 1. Check `{TOOL}_BIN` (e.g. `DOCKER_BIN`) for an explicit path
//! 2. Fall back to the bare tool name, relying on PATH
//!
//! CI images pin exact binaries by exporting the envvars; developer machines
//! just use whatever is on PATH. Tests override the envvar to point at stubs.

use std::env;

/// Get the path to an external tool
///
/// Checks for an environment variable `{TOOL}_BIN` (uppercase tool name + "_BIN").
/// Falls back to the tool name itself if the envvar is not set, which relies on PATH.
pub fn get_tool_path(tool: &str) -> String {
    let env_var = format!("{}_BIN", tool.to_uppercase().replace('-', "_"));
    env::var(&env_var).unwrap_or_else(|_| tool.to_string())
}

/// Tool names used by the pipeline
pub mod tools {
    pub const GIT: &str = "git";
    pub const DOCKER: &str = "docker";
    pub const AWS: &str = "aws";
}

/// Verify that the given tools are runnable, honoring `{TOOL}_BIN` overrides.
///
/// Returns the list of tools that could not be located; empty means all good.
pub fn missing_tools(required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter_map(|tool| {
            let path = get_tool_path(tool);
            match which::which(&path) {
                Ok(_) => None,
                Err(_) => Some(format!("{} (resolved as `{}`)", tool, path)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_get_tool_path_from_env() {
        env::set_var("FLATCAR_BIN", "/custom/path/to/flatcar");
        assert_eq!(get_tool_path("flatcar"), "/custom/path/to/flatcar");
        env::remove_var("FLATCAR_BIN");
    }

    #[test]
    fn test_get_tool_path_fallback() {
        env::remove_var("ABSENT_TOOL_BIN");
        assert_eq!(get_tool_path("absent-tool"), "absent-tool");
    }

    #[test]
    fn test_hyphenated_tool_env_var() {
        env::set_var("SOME_TOOL_BIN", "/opt/some-tool");
        assert_eq!(get_tool_path("some-tool"), "/opt/some-tool");
        env::remove_var("SOME_TOOL_BIN");
    }

    #[test]
    fn test_missing_tools_reports_unresolvable() {
        env::remove_var("NO_SUCH_TOOL_EVER_BIN");
        let missing = missing_tools(&["no-such-tool-ever"]);
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("no-such-tool-ever"));
    }
}
