//! Host-compatibility shim for compiled renderer artifacts
//!
//! The compiler emits JavaScript that assumes a browser-style global object
//! (`self`). On a Node-style server host the CommonJS module globals
//! (`require`, `exports`, `process`, `__dirname`, `__filename`, `Buffer`)
//! are module-scoped, so the compiled code cannot resolve them through its
//! global. The preamble detects the host at runtime and, only on Node,
//! re-exposes those globals on a fresh object that shadows `self`.
//!
//! Injection happens once per build, by prepending the preamble to the
//! compiled entry file. Every binding in the preamble uses `var` so that
//! two independently-evaluated modules carrying the preamble never trip a
//! block-scope redeclaration error.

use std::path::Path;

use crate::error::{SkiffError, SkiffResult};

/// Runtime preamble prepended to every compiled entry file.
pub const PREAMBLE: &str = r#"
var hostIsNode = typeof process !== "undefined" && (process.versions || {}).hasOwnProperty('node');

// keep these as 'var': the preamble may be evaluated more than once and
// must not trip block-scope redeclaration
var self = hostIsNode ? Object.create(globalThis) : globalThis;

// CommonJS globals.
if (typeof require !== "undefined") {
  self.require = require;
}
if (typeof exports !== "undefined") {
  self.exports = exports;
}

// Node specific globals, exposed only where they exist or are polyfilled.

if (typeof process !== "undefined") {
  self.process = process;
}

if (typeof __dirname !== "undefined") {
  self.__dirname = __dirname;
}

if (typeof __filename !== "undefined") {
  self.__filename = __filename;
}

if (typeof Buffer !== "undefined") {
  self.Buffer = Buffer;
}
"#;

/// Prepend the preamble to `entry_file`, rewriting it in place.
///
/// Only this one file's bytes change; write errors are fatal to the build.
pub fn inject(entry_file: &Path) -> SkiffResult<()> {
    let compiled = std::fs::read_to_string(entry_file).map_err(|e| SkiffError::StageFailure {
        path: entry_file.to_path_buf(),
        source: e,
    })?;
    std::fs::write(entry_file, format!("{PREAMBLE}\n{compiled}")).map_err(|e| {
        SkiffError::StageFailure {
            path: entry_file.to_path_buf(),
            source: e,
        }
    })
}
