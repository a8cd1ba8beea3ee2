//! Custom assertion helpers for document tests.

use serde_yaml::Value;
use std::path::Path;

/// Assert that a file's content equals expected text exactly.
pub fn assert_file_equals(path: &Path, expected: &str) {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));

    assert_eq!(
        content,
        expected,
        "File {} content does not match expected.\nExpected:\n{}\nActual:\n{}",
        path.display(),
        expected,
        content
    );
}

/// Assert that two YAML texts parse to the same tree.
///
/// Formatting differences are ignored; key order is not.
pub fn assert_yaml_eq(actual: &str, expected: &str) {
    let actual_value: Value = serde_yaml::from_str(actual)
        .unwrap_or_else(|e| panic!("Actual text is not YAML: {}\n{}", e, actual));
    let expected_value: Value = serde_yaml::from_str(expected)
        .unwrap_or_else(|e| panic!("Expected text is not YAML: {}\n{}", e, expected));

    let render = |v: &Value| serde_yaml::to_string(v).unwrap_or_default();
    assert_eq!(
        render(&actual_value),
        render(&expected_value),
        "YAML documents differ.\nExpected:\n{}\nActual:\n{}",
        expected,
        actual
    );
}

/// Assert that no temp files were left next to a written document.
pub fn assert_no_temp_files(dir: &Path) {
    let leftovers: Vec<String> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("Failed to read directory {}: {}", dir.display(), e))
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();

    assert!(
        leftovers.is_empty(),
        "Temp files left in {}: {:?}",
        dir.display(),
        leftovers
    );
}
