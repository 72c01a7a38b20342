//! Module loader integration tests
//!
//! Builds module trees on disk with tempfile and loads them through the
//! default file system and script evaluator.

use spacey_modules::{
    LoaderConfig, MemoryFileSystem, ModuleError, ModuleFormat, ModuleLoader, ModuleState, Object,
    ScriptError, Value,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project directory
struct Project {
    _dir: TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        // Canonical so cache keys compare equal on systems with symlinked temp dirs
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    fn file(self, relative: &str, contents: &str) -> Self {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn loader(&self) -> ModuleLoader {
        ModuleLoader::with_config(LoaderConfig::default().with_base_dir(&self.root))
    }
}

fn string(exports: &Object, key: &str) -> Option<String> {
    exports.get(key).and_then(|v| v.as_str().map(str::to_string))
}

#[test]
fn test_hello_world() {
    let project = Project::new().file("hello.js", "exports.hello = 'hello world!';\n");
    let mut loader = project.loader();

    let hello = loader.load("hello.js").unwrap();
    assert_eq!(string(&hello, "hello").as_deref(), Some("hello world!"));
}

#[test]
fn test_repeated_loads_share_exports() {
    let project = Project::new()
        .file("counter.js", "exports.count = 1\n")
        .file("main.js", "exports.counter = require('./counter')\n");
    let mut loader = project.loader();

    let first = loader.load("counter.js").unwrap();
    let second = loader.load("counter.js").unwrap();
    let third = loader.load(project.path("counter.js")).unwrap();
    assert!(first.ptr_eq(&second));
    assert!(second.ptr_eq(&third));

    // Mutations are visible to every holder, so nothing executed twice
    first.set("count", 2.0);
    let main = loader.load("main.js").unwrap();
    let via_require = main.get("counter").unwrap();
    assert_eq!(via_require, Value::Object(first.clone()));
    assert_eq!(
        via_require.as_object().unwrap().get("count"),
        Some(Value::Number(2.0))
    );
}

#[test]
fn test_circular_requires() {
    let project = Project::new()
        .file(
            "a.js",
            "exports.done = false\n\
             const b = require('./b.js')\n\
             exports.bDoneWhileLoading = b.done\n\
             exports.done = true\n",
        )
        .file(
            "b.js",
            "exports.done = false\n\
             const a = require('./a.js')\n\
             exports.aDoneWhileLoading = a.done\n\
             exports.done = true\n",
        );
    let mut loader = project.loader();

    let a = loader.load("a.js").unwrap();
    let b = loader.load("b.js").unwrap();

    assert_eq!(a.get("done"), b.get("done"));
    assert_eq!(a.get("done"), Some(Value::Boolean(true)));
    // b saw a's partial exports; a saw b complete
    assert_eq!(b.get("aDoneWhileLoading"), Some(Value::Boolean(false)));
    assert_eq!(a.get("bDoneWhileLoading"), Some(Value::Boolean(true)));

    assert_eq!(loader.state(&project.path("a.js")), Some(ModuleState::Loaded));
    assert_eq!(loader.state(&project.path("b.js")), Some(ModuleState::Loaded));
}

#[test]
fn test_alternate_formats_share_shape() {
    let project = Project::new()
        .file("esm.mjs", "export const c = 'c';\n")
        .file("cjs.cjs", "module.exports = { c: 'c' };\n")
        .file("detected.js", "export const c = 'c'\n")
        .file("data.json", r#"{ "c": "c" }"#);
    let mut loader = project.loader();

    for file in ["esm.mjs", "cjs.cjs", "detected.js", "data.json"] {
        let exports = loader.load(file).unwrap();
        assert_eq!(string(&exports, "c").as_deref(), Some("c"), "{file}");
    }

    let formats: Vec<_> = loader.cache().iter().map(|r| r.format).collect();
    assert_eq!(
        formats,
        vec![
            ModuleFormat::EsModule,
            ModuleFormat::CommonJs,
            ModuleFormat::EsModule,
            ModuleFormat::Json,
        ]
    );
}

#[test]
fn test_module_exports_replacement_keeps_identity() {
    let project = Project::new()
        .file(
            "early.js",
            "const late = require('./late.js')\nexports.seen = late\n",
        )
        .file("late.js", "module.exports = { value: 'replaced' }\n");
    let mut loader = project.loader();

    let early = loader.load("early.js").unwrap();
    let late = loader.load("late.js").unwrap();
    assert_eq!(early.get("seen"), Some(Value::Object(late.clone())));
    assert_eq!(string(&late, "value").as_deref(), Some("replaced"));
}

#[test]
fn test_package_type_decides_format() {
    let project = Project::new()
        .file("esm/package.json", r#"{ "type": "module" }"#)
        .file("esm/lib.js", "export default 'from esm'\nexport const named = 1\n")
        .file("main.js", "exports.value = 1\n");
    let mut loader = project.loader();

    let lib = loader.load("esm/lib.js").unwrap();
    assert_eq!(string(&lib, "default").as_deref(), Some("from esm"));
    assert_eq!(
        loader.cache().get(&project.path("esm/lib.js")).unwrap().format,
        ModuleFormat::EsModule
    );

    loader.load("main.js").unwrap();
    assert_eq!(
        loader.cache().get(&project.path("main.js")).unwrap().format,
        ModuleFormat::CommonJs
    );
}

#[test]
fn test_esm_imports_commonjs() {
    let project = Project::new()
        .file("legacy.cjs", "exports.greet = 'hi'\nexports.name = 'legacy'\n")
        .file(
            "main.mjs",
            "import legacy, { greet } from './legacy.cjs'\n\
             export const message = greet + ' ' + legacy.name\n\
             export { legacy }\n",
        );
    let mut loader = project.loader();

    let main = loader.load("main.mjs").unwrap();
    let legacy = loader.load("legacy.cjs").unwrap();
    assert_eq!(string(&main, "message").as_deref(), Some("hi legacy"));
    assert_eq!(main.get("legacy"), Some(Value::Object(legacy)));
}

#[test]
fn test_esm_cycle_sees_namespace() {
    let project = Project::new()
        .file(
            "a.mjs",
            "import { fromB } from './b.mjs'\nexport const value = 'a:' + fromB\n",
        )
        .file(
            "b.mjs",
            "import * as a from './a.mjs'\nexport const fromB = 'b'\nexport const aNamespace = a\n",
        );
    let mut loader = project.loader();

    let a = loader.load("a.mjs").unwrap();
    let b = loader.load("b.mjs").unwrap();
    assert_eq!(string(&a, "value").as_deref(), Some("a:b"));
    // The namespace b captured mid-cycle is a's finished exports object
    assert_eq!(b.get("aNamespace"), Some(Value::Object(a)));
}

#[test]
fn test_missing_named_export() {
    let project = Project::new()
        .file("lib.mjs", "export const present = 1\n")
        .file("main.mjs", "import { absent } from './lib.mjs'\n");
    let mut loader = project.loader();

    match loader.load("main.mjs").unwrap_err() {
        ModuleError::Execution {
            path,
            source: ScriptError::MissingExport { name, .. },
        } => {
            assert_eq!(path, project.path("main.mjs"));
            assert_eq!(name, "absent");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_node_modules_packages() {
    let project = Project::new()
        .file(
            "node_modules/greeter/package.json",
            r#"{ "name": "greeter", "main": "lib/greeter.js" }"#,
        )
        .file("node_modules/greeter/lib/greeter.js", "exports.greeting = 'hello'\n")
        .file("node_modules/greeter/extra.js", "exports.extra = true\n")
        .file("node_modules/@scope/tool/index.js", "exports.tool = 'scoped'\n")
        .file(
            "src/app.js",
            "const greeter = require('greeter')\n\
             exports.greeting = greeter.greeting\n\
             exports.extra = require('greeter/extra').extra\n\
             exports.tool = require('@scope/tool').tool\n\
             exports.resolved = require.resolve('greeter')\n",
        );
    let mut loader = project.loader();

    let app = loader.load("src/app.js").unwrap();
    assert_eq!(string(&app, "greeting").as_deref(), Some("hello"));
    assert_eq!(app.get("extra"), Some(Value::Boolean(true)));
    assert_eq!(string(&app, "tool").as_deref(), Some("scoped"));
    assert_eq!(
        string(&app, "resolved"),
        Some(
            project
                .path("node_modules/greeter/lib/greeter.js")
                .display()
                .to_string()
        )
    );
}

#[test]
fn test_json_modules() {
    let project = Project::new()
        .file("config.json", r#"{ "port": 8080, "hosts": ["a", "b"] }"#)
        .file("broken.json", r#"{ "port": "#)
        .file("main.js", "const config = require('./config.json')\nexports.port = config.port\n");
    let mut loader = project.loader();

    let main = loader.load("main.js").unwrap();
    assert_eq!(main.get("port"), Some(Value::Number(8080.0)));

    let err = loader.load("broken.json").unwrap_err();
    assert!(matches!(err, ModuleError::Json { .. }));
    assert!(err.is_execution_error());
}

#[test]
fn test_missing_module() {
    let project = Project::new().file("main.js", "require('./nowhere')\n");
    let mut loader = project.loader();

    let err = loader.load("does-not-exist.js").unwrap_err();
    assert!(err.is_resolution_error());
    assert!(loader.cache().is_empty());

    let err = loader.load("main.js").unwrap_err();
    assert!(err.is_resolution_error());
    let message = err.to_string();
    assert!(message.starts_with("Cannot find module './nowhere'"), "{message}");
    assert!(message.contains("Require stack:"), "{message}");
    assert!(message.contains("main.js"), "{message}");
}

#[test]
fn test_execution_errors_propagate() {
    let project = Project::new()
        .file("outer.js", "exports.before = true\nrequire('./inner.js')\nexports.after = true\n")
        .file("inner.js", "exports.partial = 1\nthrow 'inner failed'\n");
    let mut loader = project.loader();

    let err = loader.load("outer.js").unwrap_err();
    match &err {
        ModuleError::Execution {
            path,
            source: ScriptError::Thrown(message),
        } => {
            // The inner failure reaches the caller unchanged
            assert_eq!(path, &project.path("inner.js"));
            assert_eq!(message, "inner failed");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Both entries stay in the cache as Loading
    assert_eq!(
        loader.state(&project.path("inner.js")),
        Some(ModuleState::Loading)
    );
    assert_eq!(
        loader.state(&project.path("outer.js")),
        Some(ModuleState::Loading)
    );

    // Loading again hands back the cached partial exports
    let inner = loader.load("inner.js").unwrap();
    assert_eq!(inner.get("partial"), Some(Value::Number(1.0)));
}

#[test]
fn test_syntax_error_reports_line() {
    let project = Project::new().file("bad.js", "exports.a = 1\nexports.b = (2\n");
    let mut loader = project.loader();

    match loader.load("bad.js").unwrap_err() {
        ModuleError::Execution {
            source: ScriptError::Syntax { line, .. },
            ..
        } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_loaders_are_isolated() {
    let project = Project::new().file("state.js", "exports.items = []\n");
    let mut first = project.loader();
    let mut second = project.loader();

    let a = first.load("state.js").unwrap();
    let b = second.load("state.js").unwrap();
    assert!(!a.ptr_eq(&b));

    a.set("owner", "first");
    assert_eq!(b.get("owner"), None);
    assert_eq!(first.cache().len(), 1);
    assert_eq!(second.cache().len(), 1);
}

#[test]
fn test_file_changes_need_eviction() {
    let project = Project::new().file("version.js", "exports.version = 1\n");
    let mut loader = project.loader();

    assert_eq!(loader.load("version.js").unwrap().get("version"), Some(Value::Number(1.0)));

    fs::write(project.path("version.js"), "exports.version = 2\n").unwrap();
    assert_eq!(loader.load("version.js").unwrap().get("version"), Some(Value::Number(1.0)));

    loader.evict(&project.path("version.js"));
    assert_eq!(loader.load("version.js").unwrap().get("version"), Some(Value::Number(2.0)));
}

#[test]
fn test_memory_file_system_with_builtins() {
    let fs = MemoryFileSystem::new()
        .with_file("/srv/app/index.js", "const env = require('env')\nexports.mode = env.mode\n")
        .with_file("/srv/app/package.json", r#"{ "name": "app" }"#);

    let mut loader = ModuleLoader::with_config(LoaderConfig::default().with_base_dir("/srv/app"))
        .with_file_system(fs);
    let env = Object::new();
    env.set("mode", "test");
    loader.register_builtin("env", env);

    let index = loader.load("/srv/app").unwrap();
    assert_eq!(string(&index, "mode").as_deref(), Some("test"));
    assert_eq!(loader.main_module(), Some(Path::new("/srv/app/index.js")));
}
