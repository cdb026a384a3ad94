//! `ferry script` specs
//!
//! Rendering a script builds the backend but never connects to it.

use crate::prelude::*;

#[test]
fn batch_script_carries_scheduler_directives() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);
    temp.file("cluster.toml", batch_config());

    temp.ferry()
        .args(&["script", "area", "-c", "cluster.toml", "-u", "units.toml"])
        .passes()
        .stdout_has("#!/bin/sh")
        .stdout_has("#SBATCH --cpus-per-task=4")
        .stdout_has("#SBATCH --partition=short")
        .stdout_has("/scratch/alice/ferry/")
        .stdout_has("PYTHON=python3")
        .stdout_lacks("pip install");
}

#[test]
fn packages_add_environment_setup() {
    let temp = Project::empty();
    temp.file(
        "units.toml",
        format!("{}\n{}", "[environment]\npackages = [\"numpy>=1.24\"]\n", "[[unit]]\nname = \"f\"\nsource = \"def f():\\n    return 1\\n\"\n"),
    );
    temp.file("cluster.toml", batch_config());

    temp.ferry()
        .args(&["script", "f", "-c", "cluster.toml", "-u", "units.toml"])
        .passes()
        .stdout_has("pip install");
}

#[test]
fn shell_script_has_no_directives() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);
    temp.file("cluster.toml", local_config("/tmp/ferry-spec"));

    temp.ferry()
        .args(&["script", "area", "-c", "cluster.toml", "-u", "units.toml"])
        .passes()
        .stdout_has("#!/bin/sh")
        .stdout_lacks("#SBATCH");
}

#[test]
fn config_from_environment_variable() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);
    let config = temp.file("cluster.toml", batch_config());

    temp.ferry()
        .args(&["script", "area", "-u", "units.toml"])
        .env("FERRY_CONFIG", &config)
        .env("FERRY_WORKING_DIRECTORY", "/scratch/bob/jobs")
        .passes()
        .stdout_has("/scratch/bob/jobs/");
}
