use crate::redac;
use predicates::prelude::*;

#[test]
fn version() {
    redac()
        .args(["version"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(concat!(
            "redac ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn version_flag() {
    redac()
        .args(["--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
