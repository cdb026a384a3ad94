// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn registry(defs: Vec<Definition>) -> Registry {
    let mut registry = Registry::new();
    for def in defs {
        registry.register(def).unwrap();
    }
    registry
}

fn order(manifest: &CaptureManifest) -> Vec<&str> {
    manifest.local_definitions.keys().map(String::as_str).collect()
}

#[test]
fn dependencies_come_before_dependents() {
    let reg = registry(vec![
        Definition::function("area", "def area(r):\n    return PI * square(r)\n"),
        Definition::function("square", "def square(x):\n    return x * x\n"),
        Definition::constant("PI", "PI = 3.14159\n"),
    ]);
    let manifest = ManifestBuilder::new(&reg).build("area").unwrap();
    assert_eq!(manifest.entry_reference, "area");
    assert_eq!(order(&manifest), ["PI", "square", "area"]);
    assert!(manifest.imports.is_empty());
}

#[test]
fn transitive_dependencies_are_followed() {
    let reg = registry(vec![
        Definition::function("a", "def a():\n    return b()\n"),
        Definition::function("b", "def b():\n    return c()\n"),
        Definition::function("c", "def c():\n    return 1\n"),
        Definition::function("unused", "def unused():\n    pass\n"),
    ]);
    let manifest = ManifestBuilder::new(&reg).build("a").unwrap();
    assert_eq!(order(&manifest), ["c", "b", "a"]);
}

#[test]
fn mutual_recursion_terminates() {
    let reg = registry(vec![
        Definition::function("is_even", "def is_even(n):\n    return n == 0 or is_odd(n - 1)\n"),
        Definition::function("is_odd", "def is_odd(n):\n    return n != 0 and is_even(n - 1)\n"),
    ]);
    let manifest = ManifestBuilder::new(&reg).build("is_even").unwrap();
    assert_eq!(order(&manifest), ["is_odd", "is_even"]);
}

#[test]
fn std_modules_and_import_units_become_imports() {
    let reg = registry(vec![
        Definition::function(
            "norm",
            "def norm(xs):\n    return math.sqrt(sum(x * x for x in xs)) + np.zeros(1)[0]\n",
        ),
        Definition::import("np", Some("import numpy as np".to_string())),
    ]);
    let manifest = ManifestBuilder::new(&reg).build("norm").unwrap();
    assert_eq!(order(&manifest), ["norm"]);
    let imports: Vec<_> = manifest.imports.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(imports, [("math", "import math"), ("np", "import numpy as np")]);
}

#[test]
fn declared_reference_must_resolve() {
    let reg = registry(vec![Definition::function("f", "def f():\n    return g()\n")
        .references(["helper"])]);
    let err = ManifestBuilder::new(&reg).build("f").unwrap_err();
    assert_eq!(
        err,
        AnalysisError::UnresolvableReference {
            name: "helper".to_string(),
            referenced_by: "f".to_string()
        }
    );
}

#[test]
fn declared_reference_to_std_module_is_import() {
    let reg = registry(vec![Definition::function("f", "def f():\n    return 1\n")
        .references(["json"])]);
    let manifest = ManifestBuilder::new(&reg).build("f").unwrap();
    assert!(manifest.imports.contains_key("json"));
}

#[test]
fn scanned_unknown_names_are_ignored() {
    let reg = registry(vec![Definition::function(
        "f",
        "def f(items):\n    total = 0\n    for item in items:\n        total += item\n    return total\n",
    )]);
    assert!(ManifestBuilder::new(&reg).build("f").is_ok());
}

#[test]
fn unknown_target() {
    let reg = Registry::new();
    let err = ManifestBuilder::new(&reg).build("missing").unwrap_err();
    assert_eq!(err, AnalysisError::UnknownTarget("missing".to_string()));
}

#[test]
fn constant_target_is_not_callable() {
    let reg = registry(vec![Definition::constant("K", "K = 1\n")]);
    let err = ManifestBuilder::new(&reg).build("K").unwrap_err();
    assert_eq!(err, AnalysisError::NotCallable("K".to_string()));
}

#[test]
fn ephemeral_dependency_has_no_source() {
    let reg = registry(vec![
        Definition::function("f", "def f():\n    return g()\n"),
        Definition::new("g", DefinitionKind::Function, None),
    ]);
    let err = ManifestBuilder::new(&reg).build("f").unwrap_err();
    assert_eq!(err, AnalysisError::NoSource("g".to_string()));
}

#[test]
fn opaque_dependency_is_recorded() {
    let reg = registry(vec![
        Definition::function("f", "def f():\n    return weights\n"),
        Definition::new("weights", DefinitionKind::Constant, Some(Payload::Opaque(vec![1, 2]))),
    ]);
    let manifest = ManifestBuilder::new(&reg).build("f").unwrap();
    assert_eq!(manifest.local_definitions["weights"], Payload::Opaque(vec![1, 2]));
}

#[test]
fn build_is_deterministic() {
    let reg = registry(vec![
        Definition::function("main", "def main():\n    return z() + a() + m()\n"),
        Definition::function("z", "def z():\n    return 1\n"),
        Definition::function("a", "def a():\n    return 2\n"),
        Definition::function("m", "def m():\n    return a()\n"),
    ]);
    let first = ManifestBuilder::new(&reg).build("main").unwrap();
    let second = ManifestBuilder::new(&reg).build("main").unwrap();
    assert_eq!(first, second);
    assert_eq!(order(&first), ["a", "m", "z", "main"]);
}
