// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn attachments_split_on_the_first_equals() {
    assert_eq!(split_attachment("mapper=/tmp/m.bin").unwrap(), ("mapper", "/tmp/m.bin"));
    assert_eq!(split_attachment("a=b=c").unwrap(), ("a", "b=c"));
}

#[parameterized(
    missing_equals = { "mapper" },
    empty_name = { "=/tmp/unit.bin" },
    empty_path = { "mapper=" },
)]
fn bad_attachments_are_rejected(raw: &str) {
    assert!(split_attachment(raw).is_err());
}

#[test]
fn attachment_bytes_come_from_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unit.bin");
    std::fs::write(&path, b"payload").unwrap();

    let units = load_attachments(&[format!("mapper={}", path.display())]).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].name, "mapper");
    assert_eq!(units[0].bytes.as_ref(), b"payload");
}

#[test]
fn missing_attachment_file_is_an_error() {
    let error = load_attachments(&["mapper=/nonexistent/unit.bin".to_string()]).unwrap_err();
    assert!(error.to_string().contains("mapper"));
}
