//! `ferry manifest` specs
//!
//! Analysis runs entirely locally: no config, no network.

use crate::prelude::*;

#[test]
fn lists_dependencies_before_the_target() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    let out = temp.ferry().args(&["manifest", "area", "-u", "units.toml"]).passes();
    let stdout = out.stdout();
    let pi = stdout.find("  PI").unwrap();
    let square = stdout.find("  square").unwrap();
    let area = stdout.find("  area").unwrap();
    assert!(pi < area && square < area, "target must come last:\n{}", stdout);
    out.stdout_has("entry: area").stdout_has("interpreter: python3");
}

#[test]
fn only_reachable_definitions_are_captured() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    temp.ferry()
        .args(&["manifest", "square", "-u", "units.toml"])
        .passes()
        .stdout_eq("entry: square\ndefinitions:\n  square\ninterpreter: python3\n");
}

#[test]
fn json_output_parses() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    let out = temp
        .ferry()
        .args(&["manifest", "area", "-u", "units.toml", "--format", "json"])
        .passes();
    let json: serde_json::Value = serde_json::from_str(out.stdout()).unwrap();
    assert_eq!(json["entry_reference"], "area");
}

#[test]
fn unknown_target_is_an_analysis_error() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    temp.ferry()
        .args(&["manifest", "volume", "-u", "units.toml"])
        .fails_with(exit::ANALYSIS)
        .stderr_has("volume");
}

#[test]
fn unresolvable_reference_names_the_missing_unit() {
    let temp = Project::empty();
    temp.file(
        "units.toml",
        r#"
[[unit]]
name = "area"
source = "def area(r):\n    return TAU_OVER_TWO * r * r\n"
references = ["TAU_OVER_TWO"]
"#,
    );

    temp.ferry()
        .args(&["manifest", "area", "-u", "units.toml"])
        .fails_with(exit::ANALYSIS)
        .stderr_has("TAU_OVER_TWO");
}

#[test]
fn missing_units_file_is_a_usage_error() {
    let temp = Project::empty();
    temp.ferry().args(&["manifest", "area", "-u", "nope.toml"]).fails_with(exit::USAGE);
}
