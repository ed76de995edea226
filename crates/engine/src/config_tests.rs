// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// Env vars are process-global; serialize every test that touches them.

fn clear_brigade_env() {
    for key in [
        "LINE_COMMAND",
        "SOUS_COMMAND",
        "EXECUTIVE_COMMAND",
        "LINE_TIMEOUT_MIN",
        "MAX_ITERATIONS",
        "MAX_PARALLEL",
        "ESCALATION_AFTER",
        "ESCALATION_TO_EXEC",
        "ESCALATION_TO_EXEC_AFTER",
        "WALKAWAY_MODE",
        "WALKAWAY_MAX_SKIPS",
        "COMMAND_WAIT_SECONDS",
        "STATUS_FILE",
        "MODULES",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial_test::serial]
fn defaults_apply_without_env() {
    clear_brigade_env();
    let config = Config::from_env();
    assert!(config.workers.is_empty());
    assert_eq!(config.max_iterations, 5);
    assert_eq!(config.max_parallel, 1);
    assert_eq!(config.escalation_after, 2);
    assert!(!config.escalation_to_exec);
    assert_eq!(config.command_wait, Some(Duration::from_secs(300)));
    assert_eq!(config.walkaway_override, None);
}

#[test]
#[serial_test::serial]
fn worker_commands_and_timeouts_come_from_env() {
    clear_brigade_env();
    std::env::set_var("LINE_COMMAND", "claude --model haiku");
    std::env::set_var("LINE_TIMEOUT_MIN", "5");
    std::env::set_var("SOUS_COMMAND", "claude --model sonnet");
    let config = Config::from_env();
    let line = config.workers.get(&Tier::Line).unwrap();
    assert_eq!(line.command, "claude --model haiku");
    assert_eq!(line.timeout, Duration::from_secs(300));
    let sous = config.workers.get(&Tier::Sous).unwrap();
    assert_eq!(sous.timeout, Tier::Sous.default_timeout());
    assert!(!config.workers.contains_key(&Tier::Executive));
    clear_brigade_env();
}

#[test]
#[serial_test::serial]
fn command_wait_zero_means_forever() {
    clear_brigade_env();
    std::env::set_var("COMMAND_WAIT_SECONDS", "0");
    let config = Config::from_env();
    assert_eq!(config.command_wait, None);
    clear_brigade_env();
}

#[test]
#[serial_test::serial]
fn empty_observer_path_disables_the_channel() {
    clear_brigade_env();
    std::env::set_var("STATUS_FILE", "  ");
    let config = Config::from_env();
    assert_eq!(config.status_file, None);
    clear_brigade_env();
}

#[test]
#[serial_test::serial]
fn modules_list_is_comma_separated() {
    clear_brigade_env();
    std::env::set_var("MODULES", "desktop, telegram ,,cost-csv");
    let config = Config::from_env();
    assert_eq!(config.modules, vec!["desktop", "telegram", "cost-csv"]);
    clear_brigade_env();
}

#[test]
#[serial_test::serial]
fn walkaway_override_beats_prd_flag() {
    clear_brigade_env();
    let config = Config::from_env();
    assert!(config.walkaway(true));
    assert!(!config.walkaway(false));

    std::env::set_var("WALKAWAY_MODE", "true");
    let config = Config::from_env();
    assert!(config.walkaway(false));

    std::env::set_var("WALKAWAY_MODE", "false");
    let config = Config::from_env();
    assert!(!config.walkaway(true));
    clear_brigade_env();
}

#[test]
#[serial_test::serial]
fn max_parallel_is_at_least_one() {
    clear_brigade_env();
    std::env::set_var("MAX_PARALLEL", "0");
    let config = Config::from_env();
    assert_eq!(config.max_parallel, 1);
    clear_brigade_env();
}
