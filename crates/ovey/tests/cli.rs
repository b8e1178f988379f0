#![cfg(all(target_os = "linux", feature = "cli"))]

use std::process::Command;

fn ovey() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ovey"))
}

#[test]
fn help_lists_commands() {
    let output = ovey().arg("--help").output().expect("ovey should run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["new", "delete", "info", "echo", "families", "version"] {
        assert!(stdout.contains(command), "help should mention {command}");
    }
}

#[test]
fn version_prints_package_version() {
    let output = ovey().arg("version").output().expect("ovey should run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("ovey {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_names_the_family() {
    let output = ovey()
        .args(["version", "--extended"])
        .output()
        .expect("ovey should run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("protocol_family: rdma-ovey"));
}

#[test]
fn missing_required_flag_fails() {
    let output = ovey()
        .args(["delete"])
        .output()
        .expect("ovey should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--name"));
}

#[test]
fn bad_timeout_exits_with_usage_code() {
    let output = ovey()
        .args(["--timeout", "0s", "families"])
        .output()
        .expect("ovey should run");
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: "));
}

#[test]
fn bad_guid_exits_with_usage_code() {
    // Argument validation happens before any netlink traffic.
    let output = ovey()
        .args(["new", "-n", "childX", "-p", "parent0", "--guid", "zz"])
        .output()
        .expect("ovey should run");
    assert_eq!(output.status.code(), Some(64));
}
