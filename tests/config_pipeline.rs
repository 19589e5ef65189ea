// ABOUTME: End-to-end Config Loader scenarios spanning multiple files (spec §8)
// ABOUTME: Exercises merge-option overrides and required-vs-optional specifier semantics

use std::io::Write;

use ibmi_mcp_server::config::{ConfigLoader, MergeOptions, SourceSpecifier};

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn merges_two_files_and_rejects_duplicate_tool_names_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_file(
        dir.path(),
        "base.yaml",
        r"
sources:
  main: { host: h, user: u, password: p }
tools:
  list_things:
    source: main
    description: d
    statement: 'SELECT 1 FROM sysibm.sysdummy1'
",
    );
    let overlay = write_file(
        dir.path(),
        "overlay.yaml",
        r"
tools:
  list_things:
    source: main
    description: overridden
    statement: 'SELECT 2 FROM sysibm.sysdummy1'
",
    );

    let specs = vec![
        SourceSpecifier::File { path: base, required: true },
        SourceSpecifier::File { path: overlay, required: true },
    ];

    let strict = ConfigLoader::new(specs.clone(), MergeOptions::default());
    assert!(
        strict.load().is_err(),
        "duplicate tool name across files must be rejected without allow_duplicate_tools"
    );

    let mut lenient_options = MergeOptions::default();
    lenient_options.allow_duplicate_tools = true;
    let lenient = ConfigLoader::new(specs, lenient_options);
    let merged = lenient.load().unwrap();
    assert_eq!(merged.tools.len(), 1);
    assert_eq!(merged.tools["list_things"].description, "overridden");
}

#[test]
#[serial_test::serial]
fn env_var_interpolation_resolves_at_load_time() {
    std::env::set_var("DB2I_PIPELINE_TEST_USER", "svc_account");

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tools.yaml",
        r"
sources:
  main: { host: h, user: '${DB2I_PIPELINE_TEST_USER}', password: p }
tools:
  t1:
    source: main
    description: d
    statement: 'SELECT 1 FROM sysibm.sysdummy1'
",
    );
    let specs = vec![SourceSpecifier::File { path, required: true }];
    let loader = ConfigLoader::new(specs, MergeOptions::default());
    let merged = loader.load().unwrap();
    assert_eq!(merged.sources["main"].user, "svc_account");

    std::env::remove_var("DB2I_PIPELINE_TEST_USER");
}

#[test]
fn missing_required_specifier_fails_but_optional_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let present = write_file(
        dir.path(),
        "present.yaml",
        r"
sources:
  main: { host: h, user: u, password: p }
tools:
  t1: { source: main, description: d, statement: 'SELECT 1 FROM sysibm.sysdummy1' }
",
    );

    let specs = vec![
        SourceSpecifier::File { path: present, required: true },
        SourceSpecifier::File {
            path: dir.path().join("does-not-exist.yaml"),
            required: false,
        },
    ];
    let loader = ConfigLoader::new(specs, MergeOptions::default());
    let merged = loader.load().unwrap();
    assert_eq!(merged.tools.len(), 1);
}

#[test]
fn cross_reference_validation_catches_dangling_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tools.yaml",
        r"
tools:
  orphan:
    source: does-not-exist
    description: d
    statement: 'SELECT 1 FROM sysibm.sysdummy1'
",
    );
    let specs = vec![SourceSpecifier::File { path, required: true }];
    let mut options = MergeOptions::default();
    options.validate_merged = true;
    let loader = ConfigLoader::new(specs, options);
    let err = loader.load().unwrap_err();
    assert!(err.message.contains("cross-reference"));
}
