//! `ferry run` specs
//!
//! Local failures stop a call before anything is submitted, each with its
//! own exit code.

use crate::prelude::*;

#[test]
fn missing_config_is_a_usage_error() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    temp.ferry()
        .args(&["run", "area", "-c", "absent.toml", "-u", "units.toml"])
        .fails_with(exit::USAGE)
        .stderr_has("error:");
}

#[test]
fn relative_working_directory_is_a_usage_error() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);
    temp.file("cluster.toml", local_config("jobs"));

    temp.ferry()
        .args(&["run", "area", "-c", "cluster.toml", "-u", "units.toml"])
        .fails_with(exit::USAGE)
        .stderr_has("working_directory");
}

#[test]
fn invalid_json_argument_is_a_usage_error() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);
    temp.file("cluster.toml", local_config("/tmp/ferry-spec"));

    temp.ferry()
        .args(&["run", "area", "-c", "cluster.toml", "-u", "units.toml", "--arg", "{oops"])
        .fails_with(exit::USAGE)
        .stderr_has("JSON");
}

#[test]
fn malformed_kwarg_is_a_usage_error() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);
    temp.file("cluster.toml", local_config("/tmp/ferry-spec"));

    temp.ferry()
        .args(&["run", "area", "-c", "cluster.toml", "-u", "units.toml", "--kwarg", "r"])
        .fails_with(exit::USAGE)
        .stderr_has("NAME=JSON");
}

#[test]
fn unknown_target_fails_before_submission() {
    let temp = Project::empty();
    let workdir = temp.path().join("remote");
    temp.file("units.toml", AREA_UNITS);
    temp.file("cluster.toml", local_config(&workdir.display().to_string()));

    temp.ferry()
        .args(&["run", "volume", "-c", "cluster.toml", "-u", "units.toml", "--arg", "2"])
        .fails_with(exit::ANALYSIS)
        .stderr_has("volume");
    assert!(!workdir.exists(), "nothing should be staged");
}
