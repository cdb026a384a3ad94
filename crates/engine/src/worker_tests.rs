// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ferry_core::test_support::test_spec;

fn environment(version: &str, packages: &[&str]) -> EnvironmentSpec {
    EnvironmentSpec {
        interpreter: "python3".to_string(),
        version: version.to_string(),
        packages: packages.iter().map(|p| p.parse().unwrap()).collect(),
    }
}

#[test]
fn plain_environment_uses_the_interpreter_directly() {
    let id = JobId::from_string("job-1");
    let request = submit_request(&id, &test_spec("area"), &environment("", &[]));
    assert_eq!(request.interpreter, "python3");
    assert_eq!(request.env_dir, None);
    assert_eq!(request.job_dir, "/work/job-1");
}

#[test]
fn packages_get_a_shared_environment() {
    let id = JobId::from_string("job-1");
    let request =
        submit_request(&id, &test_spec("area"), &environment("3.11", &["numpy>=1.24"]));
    assert_eq!(request.interpreter, "python3.11");
    assert_eq!(
        request.env_dir.as_deref(),
        Some("/work/abababababababababababababababababababababababababababababababab/env")
    );
}
