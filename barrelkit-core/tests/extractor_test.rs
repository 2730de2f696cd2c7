use std::fs;

use barrelkit_core::extractor::{extract, ExportSet};
use barrelkit_core::Error;
use tempfile::TempDir;

#[test]
fn test_extract_realistic_module() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("userApi.js");
    fs::write(
        &path,
        r#"import request from '../request';

const BASE = `/api/${VERSION}/users`;

/** Fetches one user. */
export async function getUser(id) {
  return request.get(`${BASE}/${id}`);
}

export const listUsers = (query = {}) => request.get(BASE, { params: query }),
  pageSize = 20;

function remove(id) {
  return request.delete(`${BASE}/${id}`);
}

export { remove as deleteUser };

export default {
  getUser,
  listUsers,
};
"#,
    )
    .unwrap();

    let exports = extract(&path).unwrap();
    assert!(exports.has_default());
    assert_eq!(
        exports.named().collect::<Vec<_>>(),
        vec!["getUser", "listUsers", "pageSize", "deleteUser"]
    );
}

#[test]
fn test_extract_rereads_file_every_call() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("a.js");

    fs::write(&path, "export const a = 1;\n").unwrap();
    assert_eq!(extract(&path).unwrap(), ExportSet::new().with_named(["a"]));

    fs::write(&path, "export const b = 1;\n").unwrap();
    assert_eq!(extract(&path).unwrap(), ExportSet::new().with_named(["b"]));
}

#[test]
fn test_extract_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.js");

    match extract(&path) {
        Err(Error::IoAt { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected an IO error, got {:?}", other),
    }
}

#[test]
fn test_extract_reports_position_of_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.js");
    fs::write(&path, "export const a = 1;\nexport * from './b';\n").unwrap();

    match extract(&path) {
        Err(Error::Parse(e)) => {
            assert_eq!(e.path, path);
            assert_eq!(e.line, 2);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}
