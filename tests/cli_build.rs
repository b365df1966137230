//! Integration tests for `skiff build`
//!
//! Runs the real binary against a temp project whose toolchains are shell
//! stubs, covering the end-to-end staging scenario: two shimmed artifacts,
//! one static bundle, no stale files, fail-fast on compiler errors.

#![cfg(unix)]

mod common;

use common::*;

#[test]
fn build_stages_two_shimmed_artifacts_and_the_frontend() {
    let env = TestEnv::new();
    let result = env.run(&["build"]);
    assert!(result.success, "build failed:\n{}", result.combined_output());

    for (dir, source) in [("primary", "lib/primary.dart"), ("edge", "lib/edge.dart")] {
        let entry = env.staged(&format!("{dir}/index.js"));
        let content = std::fs::read_to_string(&entry)
            .unwrap_or_else(|_| panic!("missing staged entry {}", entry.display()));
        // preamble first, compiled line last
        assert!(content.contains("var hostIsNode"), "{dir} missing preamble");
        assert!(
            content.ends_with(&format!("console.log(\"compiled {source}\");\n")),
            "{dir} entry does not end with the compiled line:\n{content}"
        );
        let preamble_pos = content.find("var hostIsNode").unwrap();
        let compiled_pos = content.find("console.log").unwrap();
        assert!(preamble_pos < compiled_pos, "{dir} preamble not prepended");
        // support files travel along
        assert!(env.staged(&format!("{dir}/index.js.map")).exists());
    }

    let index = env.staged("frontend/index.html");
    assert!(index.exists(), "missing staged frontend index.html");
}

#[test]
fn rebuild_purges_stale_staged_files() {
    let env = TestEnv::new();
    assert!(env.run(&["build"]).success);

    std::fs::write(env.staged("primary/stale.js"), "old").unwrap();
    std::fs::write(env.path("renderer/dist/stale.js"), "old").unwrap();

    assert!(env.run(&["build"]).success);

    assert!(!env.staged("primary/stale.js").exists());
    assert!(!env.path("renderer/dist/stale.js").exists());
}

#[test]
fn failing_compiler_fails_the_build_naming_the_entrypoint() {
    let env = TestEnv::with_compiler(DART_FAIL);
    let result = env.run(&["build"]);
    assert!(!result.success);
    assert!(
        result.stderr.contains("failed to build 'primary'"),
        "unexpected stderr:\n{}",
        result.stderr
    );
}

#[test]
fn build_only_frontend_skips_the_renderer() {
    let env = TestEnv::with_compiler(DART_FAIL);
    let result = env.run(&["build", "--only", "frontend"]);
    assert!(
        result.success,
        "frontend-only build should not need the compiler:\n{}",
        result.combined_output()
    );
    assert!(env.staged("frontend/index.html").exists());
    assert!(!env.staged("primary").exists());
}

#[test]
fn build_only_edge_stages_a_single_artifact() {
    let env = TestEnv::new();
    let result = env.run(&["build", "--only", "edge"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(env.staged("edge/index.js").exists());
    assert!(!env.staged("primary").exists());
    assert!(!env.staged("frontend").exists());
}

#[test]
fn clean_removes_the_staging_directory() {
    let env = TestEnv::new();
    assert!(env.run(&["build"]).success);
    assert!(env.staged("primary/index.js").exists());

    let result = env.run(&["clean"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(!env.path(".skiff/stage").exists());
}

#[test]
fn unknown_config_keys_warn_but_do_not_fail() {
    let env = TestEnv::new();
    let config = std::fs::read_to_string(env.path("skiff.toml")).unwrap();
    std::fs::write(
        env.path("skiff.toml"),
        format!("{config}\n[renderer]\ndirr = \"typo\"\n"),
    )
    .unwrap();

    let result = env.run(&["build"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(
        result.stderr.contains("Unknown config key"),
        "missing warning:\n{}",
        result.stderr
    );
}
