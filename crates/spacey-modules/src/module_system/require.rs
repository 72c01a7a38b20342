// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS require() implementation

use crate::error::Result;
use crate::module_system::loader::ModuleLoader;
use crate::value::{Object, Value};
use std::path::Path;

/// The require() function for CommonJS modules
pub fn require(loader: &mut ModuleLoader, specifier: &str, from_dir: &Path) -> Result<Object> {
    loader
        .require(specifier, from_dir)
        .map(|module| module.exports)
}

/// require.resolve() - get the resolved path without loading
pub fn require_resolve(loader: &ModuleLoader, specifier: &str, from_dir: &Path) -> Result<String> {
    loader
        .resolve(specifier, from_dir)
        .map(|resolved| resolved.display_name())
}

/// require.cache - exports of every cached module, keyed by path
pub fn require_cache(loader: &ModuleLoader) -> Object {
    loader
        .cache()
        .iter()
        .map(|record| {
            (
                record.path.display().to_string(),
                Value::Object(record.exports.clone()),
            )
        })
        .collect()
}

/// require.main - the main module's `module` object, or undefined before any load
pub fn require_main(loader: &ModuleLoader) -> Value {
    let Some(record) = loader.main_module().and_then(|path| loader.cache().get(path)) else {
        return Value::Undefined;
    };

    let module = Object::new();
    module.set("id", ".");
    module.set("filename", record.path.display().to_string());
    module.set("exports", record.exports.clone());
    module.set("loaded", record.state.is_loaded());
    Value::Object(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::fs::MemoryFileSystem;

    fn loader() -> ModuleLoader {
        let fs = MemoryFileSystem::new()
            .with_file("/app/main.js", "exports.dep = require('./dep')")
            .with_file("/app/dep.js", "exports.value = 42");
        ModuleLoader::with_config(LoaderConfig::default().with_base_dir("/app")).with_file_system(fs)
    }

    #[test]
    fn test_require_resolve_does_not_load() {
        let loader = loader();
        assert_eq!(
            require_resolve(&loader, "./dep", Path::new("/app")).unwrap(),
            "/app/dep.js"
        );
        assert!(loader.cache().is_empty());
    }

    #[test]
    fn test_require_cache_and_main() {
        let mut loader = loader();
        assert_eq!(require_main(&loader), Value::Undefined);

        loader.load("main.js").unwrap();
        let dep = require(&mut loader, "./dep", Path::new("/app")).unwrap();
        assert_eq!(dep.get("value"), Some(Value::Number(42.0)));

        let cache = require_cache(&loader);
        assert_eq!(
            cache.keys(),
            vec!["/app/main.js".to_string(), "/app/dep.js".to_string()]
        );
        assert_eq!(cache.get("/app/dep.js"), Some(Value::Object(dep)));
        let main = require_main(&loader);
        let main = main.as_object().unwrap();
        assert_eq!(main.get("id"), Some(Value::from(".")));
        assert_eq!(main.get("filename"), Some(Value::from("/app/main.js")));
        assert_eq!(main.get("loaded"), Some(Value::Boolean(true)));
    }
}
