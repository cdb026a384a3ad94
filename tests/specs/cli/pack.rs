//! `ferry pack` specs

use crate::prelude::*;

fn is_fingerprint(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[test]
fn writes_the_bundle_and_prints_its_fingerprint() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    let out = temp
        .ferry()
        .args(&["pack", "area", "-u", "units.toml", "-o", "area.pkg"])
        .passes();
    assert!(is_fingerprint(out.stdout().trim()), "{}", out);
    assert!(temp.path().join("area.pkg").is_file());
}

#[test]
fn packing_is_deterministic() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    let first = temp.ferry().args(&["pack", "area", "-u", "units.toml", "-o", "a.pkg"]).passes();
    let second = temp.ferry().args(&["pack", "area", "-u", "units.toml", "-o", "b.pkg"]).passes();
    assert_eq!(first.stdout(), second.stdout());

    let a = std::fs::read(temp.path().join("a.pkg")).unwrap();
    let b = std::fs::read(temp.path().join("b.pkg")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn different_functions_get_different_fingerprints() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    let area = temp.ferry().args(&["pack", "area", "-u", "units.toml", "-o", "a.pkg"]).passes();
    let square = temp.ferry().args(&["pack", "square", "-u", "units.toml", "-o", "s.pkg"]).passes();
    assert_ne!(area.stdout(), square.stdout());
}

#[test]
fn json_output_reports_size() {
    let temp = Project::empty();
    temp.file("units.toml", AREA_UNITS);

    let out = temp
        .ferry()
        .args(&["pack", "area", "-u", "units.toml", "-o", "a.pkg", "--format", "json"])
        .passes();
    let json: serde_json::Value = serde_json::from_str(out.stdout()).unwrap();
    let size = std::fs::metadata(temp.path().join("a.pkg")).unwrap().len();
    assert_eq!(json["size"], size);
    assert!(is_fingerprint(json["bundle_id"].as_str().unwrap()));
}

#[test]
fn opaque_state_cannot_be_packed() {
    let temp = Project::empty();
    temp.file("model.bin", [0u8, 159, 146, 150]);
    temp.file(
        "units.toml",
        r#"
[[unit]]
name = "predict"
source = "def predict(x):\n    return MODEL(x)\n"
references = ["MODEL"]

[[unit]]
name = "MODEL"
kind = "constant"
blob_file = "model.bin"
"#,
    );

    temp.ferry()
        .args(&["pack", "predict", "-u", "units.toml", "-o", "p.pkg"])
        .fails_with(exit::ANALYSIS)
        .stderr_has("MODEL");
    assert!(!temp.path().join("p.pkg").exists());
}
