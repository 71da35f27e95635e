use shim_loader::shim_types::{LinkageKind, TypeConventions};
use shim_loader::{load_sources, ImportResolver, SourceOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture");
}

const COMMON: &str = r#"
coverage:
  library: "flint"
  coverage-version: 1
declarations:
  - name: FLINT_ABS
    linkage: macro
    returns: "slong"
    params:
      - { name: x, type: "slong" }
"#;

const ROOT: &str = r#"
coverage:
  library: "flint"
  coverage-version: 7
  library-version: "3.1.2"
  imports:
    - type: path
      path: "common.coverage.yaml"
  headers:
    - "flint/flint.h"
declarations:
  - name: FLINT_BIT_COUNT
    linkage: macro
    returns: "flint_bitcnt_t"
    params:
      - { name: x, type: "ulong" }
"#;

const FMPZ_H: &str = r#"
#ifndef FMPZ_H
#define FMPZ_H

#ifdef __cplusplus
extern "C" {
#endif

#define FLINT_BIT_COUNT(x) ((x) ? (FLINT_BITS - flint_clz(x)) : 0)

FLINT_INLINE void fmpz_init(fmpz_t f) { (*f) = WORD(0); }

void fmpz_add(fmpz_t f, const fmpz_t g, const fmpz_t h);

static inline int __fmpz_internal(void) { return 0; }

#ifdef __cplusplus
}
#endif

#endif
"#;

#[test]
fn imports_load_before_importers() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "common.coverage.yaml", COMMON);
    write(dir.path(), "flint.coverage.yaml", ROOT);

    let mut resolver = ImportResolver::new(Vec::new());
    resolver
        .load_file_with_imports(&dir.path().join("flint.coverage.yaml"))
        .expect("load should succeed");

    let files = resolver.get_all_files();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].1.coverage_version(), 1);
    assert_eq!(files[1].1.coverage_version(), 7);
}

#[test]
fn imports_resolve_through_include_dirs() {
    let shared = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write(shared.path(), "common.coverage.yaml", COMMON);
    write(project.path(), "flint.coverage.yaml", ROOT);

    let mut resolver = ImportResolver::new(vec![shared.path().to_path_buf()]);
    resolver
        .load_file_with_imports(&project.path().join("flint.coverage.yaml"))
        .expect("include dir import should resolve");
    assert_eq!(resolver.loaded_file_count(), 2);

    let mut bare = ImportResolver::new(Vec::new());
    let err = bare
        .load_file_with_imports(&project.path().join("flint.coverage.yaml"))
        .unwrap_err();
    assert!(format!("{err:#}").contains("common.coverage.yaml"));
}

#[test]
fn circular_imports_terminate() {
    let dir = TempDir::new().unwrap();
    let a = r#"
coverage:
  library: "flint"
  coverage-version: 1
  imports:
    - { type: path, path: "b.yaml" }
"#;
    let b = r#"
coverage:
  library: "flint"
  coverage-version: 2
  imports:
    - { type: path, path: "a.yaml" }
"#;
    write(dir.path(), "a.yaml", a);
    write(dir.path(), "b.yaml", b);

    let mut resolver = ImportResolver::new(Vec::new());
    resolver.load_file_with_imports(&dir.path().join("a.yaml")).unwrap();
    assert_eq!(resolver.loaded_file_count(), 2);
}

#[test]
fn headers_and_coverage_merge() {
    let headers = TempDir::new().unwrap();
    write(headers.path(), "fmpz.h", FMPZ_H);
    write(headers.path(), "gmpcompat.h", "FLINT_INLINE void broken(");
    write(headers.path(), "notes.txt", "not a header");

    let coverage = TempDir::new().unwrap();
    write(coverage.path(), "common.coverage.yaml", COMMON);
    write(coverage.path(), "flint.coverage.yaml", ROOT);

    let options = SourceOptions {
        header_dir: Some(headers.path().to_path_buf()),
        skip_headers: vec!["gmpcompat.h".to_string()],
        coverage_files: vec![coverage.path().join("flint.coverage.yaml")],
        ..SourceOptions::default()
    };
    let set = load_sources(&options, &TypeConventions::default()).expect("load should succeed");

    assert_eq!(set.library, "flint");
    assert_eq!(set.library_version.as_deref(), Some("3.1.2"));
    assert_eq!(set.coverage_version, Some(7));
    assert_eq!(set.headers.len(), 2);
    assert!(set.headers[0].ends_with("fmpz.h"));
    assert_eq!(set.headers[1], "flint/flint.h");

    let names: Vec<_> = set.declarations.iter().map(|d| d.original_name.as_str()).collect();
    assert_eq!(names, vec!["FLINT_BIT_COUNT", "fmpz_init", "fmpz_add", "FLINT_ABS"]);

    let bit_count = set.find("FLINT_BIT_COUNT").unwrap();
    assert_eq!(bit_count.linkage_kind, LinkageKind::Macro);
    assert!(!bit_count.has_untyped_parts());
    assert!(bit_count.header.as_deref().unwrap().ends_with("fmpz.h"));

    assert!(set.find("__fmpz_internal").is_none());
}

#[test]
fn duplicate_coverage_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "common.coverage.yaml", COMMON);
    let again = r#"
coverage:
  library: "flint"
  coverage-version: 2
declarations:
  - name: FLINT_ABS
    linkage: macro
    returns: "slong"
    params:
      - { name: x, type: "slong" }
"#;
    write(dir.path(), "again.coverage.yaml", again);

    let options = SourceOptions {
        coverage_files: vec![
            dir.path().join("common.coverage.yaml"),
            dir.path().join("again.coverage.yaml"),
        ],
        ..SourceOptions::default()
    };
    let err = load_sources(&options, &TypeConventions::default()).unwrap_err();
    assert!(err.to_string().contains("FLINT_ABS"));
}

#[test]
fn missing_header_dir_is_an_error() {
    let dir = TempDir::new().unwrap();
    let options = SourceOptions {
        header_dir: Some(dir.path().join("absent")),
        ..SourceOptions::default()
    };
    assert!(load_sources(&options, &TypeConventions::default()).is_err());
}

#[test]
fn parse_errors_name_the_header() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "bad.h", "FLINT_INLINE void f(fmpz_t x { }\n");
    let options = SourceOptions {
        header_dir: Some(dir.path().to_path_buf()),
        ..SourceOptions::default()
    };
    let err = load_sources(&options, &TypeConventions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("bad.h"));
}
