// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synthetic entry point executed on the remote side.
//!
//! `entry.py <job_dir>` loads `<job_dir>/args.json`, imports `captured`,
//! calls the target, and writes exactly one of `result.out` or `error.out`
//! through a rename so readers never see a partial file.

const TEMPLATE: &str = r#"# Generated by ferry. Do not edit.
import json
import os
import sys
import traceback

ENTRY = __ENTRY__


def _write(job_dir, name, payload):
    tmp = os.path.join(job_dir, "." + name + ".tmp")
    with open(tmp, "w") as fh:
        fh.write(payload)
    os.replace(tmp, os.path.join(job_dir, name))


def main():
    job_dir = os.path.abspath(sys.argv[1] if len(sys.argv) > 1 else os.getcwd())
    sys.path.insert(0, os.path.dirname(os.path.abspath(__file__)))
    try:
        with open(os.path.join(job_dir, "args.json")) as fh:
            call = json.load(fh)
        import captured

        target = getattr(captured, ENTRY)
        value = target(*call.get("args", []), **call.get("kwargs", {}))
        payload = json.dumps({"value": value})
    except BaseException as exc:
        error = {
            "kind": type(exc).__name__,
            "message": str(exc),
            "diagnostic": traceback.format_exc(),
        }
        _write(job_dir, "error.out", json.dumps(error))
        return 1
    _write(job_dir, "result.out", payload)
    return 0


if __name__ == "__main__":
    sys.exit(main())
"#;

/// Render `entry.py` for `entry_reference`.
pub fn render_entry(entry_reference: &str) -> String {
    // JSON string literals are valid Python string literals
    let literal = serde_json::Value::String(entry_reference.to_string()).to_string();
    TEMPLATE.replace("__ENTRY__", &literal)
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
