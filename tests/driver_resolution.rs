mod common;
use crate::common::p;
use rdb_harness_test_utils::{init_tracing, with_timeout};

use std::panic::{catch_unwind, AssertUnwindSafe};

use rdb_harness::config::EnvOverrides;
use rdb_harness::driver::{
    load_driver, DriverLayout, DriverLocation, DriverResolver, DriverSource, SearchPath,
};
use rdb_harness::errors::HarnessError;
use rdb_harness::fs::mock::MockFileSystem;
use rdb_harness_test_utils::fake_build::FakeBuilder;

const MARKERS: [&str; 3] = ["__init__.py", "ast.py", "docs.py"];

fn python_sources(fs: &MockFileSystem, dir: &str) {
    for marker in MARKERS {
        fs.add_file(format!("{dir}/{marker}"), "");
    }
}

/// A project checkout whose python driver has not been built yet.
fn unbuilt_project(fs: &MockFileSystem) {
    for dir in ["src", "admin"] {
        fs.add_dir(format!("/proj/{dir}"));
    }
    python_sources(fs, "/proj/drivers/python/rethinkdb");
    fs.add_file("/proj/drivers/python/Makefile", "all:\n");
}

fn build_products() -> Vec<String> {
    MARKERS
        .iter()
        .chain(["ql2_pb2.py"].iter())
        .map(|f| format!("/proj/build/drivers/python/rethinkdb/{f}"))
        .collect()
}

#[tokio::test]
async fn project_checkout_is_built_then_loaded() {
    init_tracing();
    let fs = MockFileSystem::new();
    unbuilt_project(&fs);
    let builder = FakeBuilder::succeeding().producing(&fs, build_products());
    let env = EnvOverrides::default();

    let mut resolver = DriverResolver::new(&fs, builder.clone(), &env, "/proj");
    let handle = with_timeout(resolver.resolve(None)).await.unwrap();

    assert_eq!(builder.builds(), vec![p("/proj/drivers/python")]);
    assert!(handle.location.built);
    assert_eq!(handle.location.root, p("/proj/build/drivers/python/rethinkdb"));
    assert_eq!(handle.origin, p("/proj/build/drivers/python/rethinkdb"));
    assert_eq!(
        handle.schema,
        p("/proj/build/drivers/python/rethinkdb/ql2_pb2.py")
    );
}

#[tokio::test]
async fn built_driver_is_loaded_without_building() {
    init_tracing();
    let fs = MockFileSystem::new();
    python_sources(&fs, "/site-packages/rethinkdb");
    fs.add_file("/site-packages/rethinkdb/ql2_pb2.py", "");
    let builder = FakeBuilder::succeeding();
    let env = EnvOverrides {
        driver_dir: Some(p("/site-packages")),
        ..EnvOverrides::default()
    };

    let mut resolver = DriverResolver::new(&fs, builder.clone(), &env, "/proj");
    let handle = resolver.resolve(None).await.unwrap();

    assert!(builder.builds().is_empty());
    assert!(!handle.location.built);
    assert_eq!(handle.origin, p("/site-packages/rethinkdb"));
}

#[tokio::test]
async fn source_folder_builds_its_driver_tree() {
    init_tracing();
    let fs = MockFileSystem::new();
    unbuilt_project(&fs);
    let builder = FakeBuilder::succeeding().producing(&fs, build_products());
    let env = EnvOverrides {
        driver_src_dir: Some(p("/proj/drivers/python")),
        ..EnvOverrides::default()
    };

    let mut resolver = DriverResolver::new(&fs, builder.clone(), &env, "/nowhere");
    assert_eq!(
        resolver.inspect(None).unwrap(),
        DriverSource::Source {
            driver_dir: p("/proj/build/drivers/python/rethinkdb"),
            build_dir: p("/proj/drivers/python"),
        }
    );

    let handle = resolver.resolve(None).await.unwrap();
    assert_eq!(builder.builds(), vec![p("/proj/drivers/python")]);
    assert_eq!(handle.origin, p("/proj/build/drivers/python/rethinkdb"));
}

#[tokio::test]
async fn explicit_target_beats_the_environment() {
    let fs = MockFileSystem::new();
    python_sources(&fs, "/a/rethinkdb");
    fs.add_file("/a/rethinkdb/ql2_pb2.py", "");
    python_sources(&fs, "/b/rethinkdb");
    fs.add_file("/b/rethinkdb/ql2_pb2.py", "");
    let env = EnvOverrides {
        driver_dir: Some(p("/a")),
        ..EnvOverrides::default()
    };

    let mut resolver = DriverResolver::new(&fs, FakeBuilder::succeeding(), &env, "/proj");
    let handle = resolver.resolve(Some(p("/b/rethinkdb").as_path())).await.unwrap();
    assert_eq!(handle.origin, p("/b/rethinkdb"));
}

#[tokio::test]
async fn failed_build_is_not_built_with_the_captured_output() {
    init_tracing();
    let fs = MockFileSystem::new();
    unbuilt_project(&fs);
    let env = EnvOverrides::default();
    let builder = FakeBuilder::failing("protoc: command not found\n");

    let mut resolver = DriverResolver::new(&fs, builder, &env, "/proj");
    match resolver.resolve(None).await {
        Err(HarnessError::NotBuilt {
            detail,
            build_output,
        }) => {
            assert!(detail.contains("python"), "{detail}");
            assert!(detail.contains("/proj/drivers/python"), "{detail}");
            assert_eq!(build_output.as_deref(), Some("protoc: command not found\n"));
        }
        other => panic!("expected NotBuilt, got {other:?}"),
    }
}

#[tokio::test]
async fn build_that_produces_nothing_is_a_usage_error() {
    let fs = MockFileSystem::new();
    unbuilt_project(&fs);
    let env = EnvOverrides::default();

    let mut resolver = DriverResolver::new(&fs, FakeBuilder::succeeding(), &env, "/proj");
    let err = resolver.resolve(None).await.unwrap_err();
    assert!(matches!(err, HarnessError::Usage(_)), "{err:?}");
}

#[tokio::test]
async fn unrecognisable_and_missing_targets_are_usage_errors() {
    let fs = MockFileSystem::new();
    fs.add_file("/random/notes.txt", "hello");
    let env = EnvOverrides::default();
    let mut resolver = DriverResolver::new(&fs, FakeBuilder::succeeding(), &env, "/proj");

    let err = resolver.resolve(Some(p("/random").as_path())).await.unwrap_err();
    assert!(matches!(err, HarnessError::Usage(_)), "{err:?}");

    let err = resolver.resolve(Some(p("/random/notes.txt").as_path())).await.unwrap_err();
    assert!(matches!(err, HarnessError::Usage(_)), "{err:?}");

    let err = resolver.resolve(Some(p("/does/not/exist").as_path())).await.unwrap_err();
    assert!(matches!(err, HarnessError::Usage(_)), "{err:?}");
}

#[tokio::test]
async fn search_path_is_restored_after_loading() {
    let fs = MockFileSystem::new();
    python_sources(&fs, "/site-packages/rethinkdb");
    fs.add_file("/site-packages/rethinkdb/ql2_pb2.py", "");
    let env = EnvOverrides::default();
    let system = SearchPath::new([p("/usr/lib/python3/dist-packages")]);

    let mut resolver = DriverResolver::new(&fs, FakeBuilder::succeeding(), &env, "/proj")
        .with_search_path(system.clone());
    resolver.resolve(Some(p("/site-packages").as_path())).await.unwrap();

    assert_eq!(resolver.search_path(), &system);
}

#[test]
fn loading_a_copy_from_elsewhere_panics_and_still_restores_the_search_path() {
    let fs = MockFileSystem::new();
    // The driver dir lacks its entry marker; the system copy has one.
    fs.add_dir("/proj/build/drivers/python/rethinkdb");
    python_sources(&fs, "/usr/lib/python3/dist-packages/rethinkdb");
    let mut search_path = SearchPath::new([p("/usr/lib/python3/dist-packages")]);
    let before = search_path.clone();

    let location = DriverLocation {
        root: p("/proj/build/drivers/python/rethinkdb"),
        built: false,
    };
    let result = catch_unwind(AssertUnwindSafe(|| {
        load_driver(&fs, &mut search_path, &DriverLayout::python(), location)
    }));

    assert!(result.is_err(), "loading a foreign driver copy must panic");
    assert_eq!(search_path, before);
}

#[test]
#[should_panic(expected = "wrong copy")]
fn package_found_outside_the_driver_dir_is_fatal() {
    let fs = MockFileSystem::new();
    python_sources(&fs, "/real/rethinkdb");
    fs.add_dir("/other/rethinkdb");
    let mut search_path = SearchPath::new([p("/real")]);

    let location = DriverLocation {
        root: p("/other/rethinkdb"),
        built: false,
    };
    let _ = load_driver(&fs, &mut search_path, &DriverLayout::python(), location);
}
