//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Small two-level catalog: `exec` (`router>`) and `privilege_exec` (`router#`).
pub const CATALOG_YAML: &str = r#"
events:
  exec:
    pre_on_open:
      show version:
        type: standard
        channel_output: "Version 1.0\nrouter>"
        result_privilege_level: exec
      terminal length 0:
        type: standard
        channel_output: "router>"
        result_privilege_level: exec
      enable:
        type: interactive
        result_privilege_level: privilege_exec
        event_steps:
          - channel_input: enable
            channel_output: "Password: "
            hidden_input: false
          - channel_input: __AUTH_SECONDARY__
            channel_output: "router#"
            hidden_input: true
      exit:
        type: standard
        channel_output: __CLOSES_CONNECTION__
        result_privilege_level: exec
        returns_prompt: false
        closes_connection: true
    post_on_open:
      show version:
        type: standard
        channel_output: "Version 1.0 (no paging)\nrouter>"
        result_privilege_level: exec
      enable:
        type: interactive
        result_privilege_level: privilege_exec
        event_steps:
          - channel_input: enable
            channel_output: "Password: "
          - channel_input: __AUTH_SECONDARY__
            channel_output: "router#"
            hidden_input: true
  privilege_exec:
    pre_on_open:
      disable:
        type: standard
        channel_output: "router>"
        result_privilege_level: exec
    post_on_open:
      disable:
        type: standard
        channel_output: "router>"
        result_privilege_level: exec
unknown_events:
  exec:
    pre_on_open:
      channel_output: "% Unknown command (pre)\nrouter>"
      result_privilege_level: exec
    post_on_open:
      channel_output: "% Unknown command (post)\nrouter>"
      result_privilege_level: exec
  privilege_exec:
    pre_on_open:
      channel_output: "% Invalid input (pre)\nrouter#"
      result_privilege_level: privilege_exec
    post_on_open:
      channel_output: "% Invalid input (post)\nrouter#"
      result_privilege_level: privilege_exec
initial_privilege_level: exec
privilege_level_prompts:
  exec: "router>"
  privilege_exec: "router#"
on_open_inputs:
  - terminal length 0
"#;

/// Write the catalog fixture into `dir` and return its path.
pub fn write_catalog(dir: &Path) -> PathBuf {
    let path = dir.join("catalog.yaml");
    std::fs::write(&path, CATALOG_YAML).unwrap();
    path
}
