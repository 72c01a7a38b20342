// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tree-walking interpreter for module bodies.

use super::ast::*;
use crate::error::ScriptError;
use crate::module_system::format::{ImportMeta, ModuleFormat, assign_module_exports, default_import};
use crate::module_system::{ModuleContext, ModuleHost, RequiredModule};
use crate::value::{Object, Value};
use std::collections::{HashMap, HashSet};
use tracing::trace;

type EvalResult<T> = Result<T, ScriptError>;

/// What a name in module scope refers to
#[derive(Debug, Clone)]
enum Binding {
    /// `const`, `__filename`, `__dirname`
    Const(Value),
    /// `let`, `var`, `exports`, `module`
    Mutable(Value),
    /// Live view of another module's exports; `None` binds the whole object
    Import {
        exports: Object,
        name: Option<String>,
    },
    /// The CommonJS `require` function
    Require,
}

/// Executes one parsed module body against a module host.
pub struct Interpreter<'a> {
    module: &'a ModuleContext,
    host: &'a mut dyn ModuleHost,
    scope: HashMap<String, Binding>,
    /// CommonJS `module` object
    module_object: Option<Object>,
    /// Local binding name -> export names kept in sync with it
    exported_locals: HashMap<String, Vec<String>>,
    import_meta: Option<Object>,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter for `module`.
    pub fn new(module: &'a ModuleContext, host: &'a mut dyn ModuleHost) -> Self {
        Self {
            module,
            host,
            scope: HashMap::new(),
            module_object: None,
            exported_locals: HashMap::new(),
            import_meta: None,
        }
    }

    /// Runs the program in the module's format.
    pub fn run(mut self, program: &Program) -> EvalResult<()> {
        match self.module.format {
            ModuleFormat::EsModule => self.run_module(program),
            ModuleFormat::CommonJs | ModuleFormat::Json => self.run_commonjs(program),
        }
    }

    fn run_commonjs(&mut self, program: &Program) -> EvalResult<()> {
        for statement in &program.body {
            match statement {
                Statement::Import(decl) => {
                    return Err(ScriptError::syntax(
                        decl.line,
                        "Cannot use import statement outside a module",
                    ));
                }
                Statement::Export(decl) => {
                    return Err(ScriptError::syntax(decl.line, "Unexpected token 'export'"));
                }
                _ => {}
            }
        }

        let context = self.module;
        let filename = context.path.display().to_string();
        let dirname = context.dirname.display().to_string();

        let module = Object::new();
        let id = if context.is_main { ".".to_string() } else { filename.clone() };
        module.set("id", id);
        module.set("filename", filename.clone());
        module.set("exports", context.exports.clone());
        module.set("loaded", false);

        self.scope.insert(
            "exports".to_string(),
            Binding::Mutable(Value::Object(context.exports.clone())),
        );
        self.scope.insert(
            "module".to_string(),
            Binding::Mutable(Value::Object(module.clone())),
        );
        self.scope.insert("require".to_string(), Binding::Require);
        self.scope
            .insert("__filename".to_string(), Binding::Const(Value::String(filename)));
        self.scope
            .insert("__dirname".to_string(), Binding::Const(Value::String(dirname)));
        self.module_object = Some(module.clone());

        for statement in &program.body {
            self.execute(statement)?;
        }

        // Later mutations of a replacement `module.exports` object
        match module.get("exports").unwrap_or(Value::Undefined) {
            Value::Object(obj) if obj.ptr_eq(&context.exports) => {}
            other => assign_module_exports(&context.exports, other),
        }
        module.set("loaded", true);
        Ok(())
    }

    fn run_module(&mut self, program: &Program) -> EvalResult<()> {
        self.collect_local_exports(program)?;

        // Imports and re-exports are linked before the body runs
        for statement in &program.body {
            match statement {
                Statement::Import(decl) => self.link_import(decl)?,
                Statement::Export(ExportDeclaration {
                    kind:
                        ExportKind::Named {
                            specifiers,
                            source: Some(source),
                        },
                    ..
                }) => self.link_reexport(specifiers, source)?,
                Statement::Export(ExportDeclaration {
                    kind: ExportKind::All { source, alias },
                    ..
                }) => self.link_star(source, alias.as_deref())?,
                _ => {}
            }
        }
        self.publish_imported()?;

        for statement in &program.body {
            self.execute(statement)?;
        }

        self.publish_imported()
    }

    /// Record which locals feed which exports, rejecting unknown locals
    fn collect_local_exports(&mut self, program: &Program) -> EvalResult<()> {
        let mut declared: HashSet<&str> = HashSet::new();
        for statement in &program.body {
            match statement {
                Statement::Variable(decl)
                | Statement::Export(ExportDeclaration {
                    kind: ExportKind::Variable(decl),
                    ..
                }) => declared.extend(decl.declarations.iter().map(|d| d.name.as_str())),
                Statement::Import(decl) => {
                    declared.extend(decl.default.as_deref());
                    declared.extend(decl.namespace.as_deref());
                    declared.extend(decl.named.iter().map(|s| s.local.as_str()));
                }
                _ => {}
            }
        }

        for statement in &program.body {
            let Statement::Export(ExportDeclaration { kind, line }) = statement else {
                continue;
            };
            match kind {
                ExportKind::Variable(decl) => {
                    for declarator in &decl.declarations {
                        self.exported_locals
                            .entry(declarator.name.clone())
                            .or_default()
                            .push(declarator.name.clone());
                    }
                }
                ExportKind::Named {
                    specifiers,
                    source: None,
                } => {
                    for specifier in specifiers {
                        if !declared.contains(specifier.local.as_str()) {
                            return Err(ScriptError::syntax(
                                *line,
                                format!("Export '{}' is not defined in module", specifier.local),
                            ));
                        }
                        self.exported_locals
                            .entry(specifier.local.clone())
                            .or_default()
                            .push(specifier.exported.clone());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn link_import(&mut self, decl: &ImportDeclaration) -> EvalResult<()> {
        let required = self.host.require(&decl.source, &self.module.dirname)?;
        trace!(
            "Linked '{}' ({}, complete: {})",
            decl.source, required.format, required.complete
        );

        if let Some(local) = &decl.default {
            let binding = self.import_binding(&required, &decl.source, "default")?;
            self.bind(local, binding, decl.line)?;
        }

        if let Some(local) = &decl.namespace {
            let binding = Binding::Import {
                exports: required.exports.clone(),
                name: None,
            };
            self.bind(local, binding, decl.line)?;
        }

        for specifier in &decl.named {
            let binding = self.import_binding(&required, &decl.source, &specifier.imported)?;
            self.bind(&specifier.local, binding, decl.line)?;
        }
        Ok(())
    }

    /// Binding for `name` imported from `required`
    fn import_binding(
        &self,
        required: &RequiredModule,
        source: &str,
        name: &str,
    ) -> EvalResult<Binding> {
        if name == "default" {
            if let Some(Value::Object(obj)) = default_import(&required.exports, required.format) {
                if obj.ptr_eq(&required.exports) {
                    // CommonJS or JSON module without a default entry: the whole object
                    return Ok(Binding::Import {
                        exports: obj,
                        name: None,
                    });
                }
            }
        }

        // Names missing from a module still executing may appear later
        if required.complete && !required.exports.has(name) {
            return Err(ScriptError::MissingExport {
                specifier: source.to_string(),
                name: name.to_string(),
            });
        }

        Ok(Binding::Import {
            exports: required.exports.clone(),
            name: Some(name.to_string()),
        })
    }

    fn link_reexport(&mut self, specifiers: &[ExportSpecifier], source: &str) -> EvalResult<()> {
        let required = self.host.require(source, &self.module.dirname)?;
        for specifier in specifiers {
            let binding = self.import_binding(&required, source, &specifier.local)?;
            let value = self.binding_value(&specifier.local, &binding)?;
            self.module.exports.set(specifier.exported.clone(), value);
        }
        Ok(())
    }

    fn link_star(&mut self, source: &str, alias: Option<&str>) -> EvalResult<()> {
        let required = self.host.require(source, &self.module.dirname)?;
        match alias {
            Some(alias) => self
                .module
                .exports
                .set(alias, Value::Object(required.exports.clone())),
            None => {
                for (key, value) in required.exports.entries() {
                    if key != "default" && !self.module.exports.has(&key) {
                        self.module.exports.set(key, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Copy imported bindings that are re-exported by name
    fn publish_imported(&mut self) -> EvalResult<()> {
        let imported: Vec<(String, Binding)> = self
            .exported_locals
            .keys()
            .filter_map(|local| match self.scope.get(local) {
                Some(binding @ Binding::Import { .. }) => Some((local.clone(), binding.clone())),
                _ => None,
            })
            .collect();

        for (local, binding) in imported {
            let value = self.binding_value(&local, &binding)?;
            self.publish(&local, &value);
        }
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> EvalResult<()> {
        match statement {
            Statement::Variable(decl) => self.execute_variable(decl),
            Statement::Expression(expression) => self.evaluate(expression).map(|_| ()),
            Statement::Throw(expression) => {
                let value = self.evaluate(expression)?;
                Err(ScriptError::Thrown(describe_thrown(&value)))
            }
            // Linked before the body runs
            Statement::Import(_) => Ok(()),
            Statement::Export(decl) => self.execute_export(decl),
            Statement::Empty => Ok(()),
        }
    }

    fn execute_variable(&mut self, decl: &VariableDeclaration) -> EvalResult<()> {
        for declarator in &decl.declarations {
            let value = match &declarator.init {
                Some(init) => Some(self.evaluate(init)?),
                None => None,
            };

            // `var x;` leaves an existing x alone
            if value.is_none()
                && decl.kind == VariableKind::Var
                && self.scope.contains_key(&declarator.name)
            {
                continue;
            }

            self.declare(
                decl.kind,
                &declarator.name,
                value.unwrap_or(Value::Undefined),
                decl.line,
            )?;
        }
        Ok(())
    }

    fn execute_export(&mut self, decl: &ExportDeclaration) -> EvalResult<()> {
        match &decl.kind {
            ExportKind::Variable(variable) => self.execute_variable(variable),
            ExportKind::Default(expression) => {
                let value = self.evaluate(expression)?;
                self.module.exports.set("default", value);
                Ok(())
            }
            ExportKind::Named { .. } | ExportKind::All { .. } => Ok(()),
        }
    }

    fn declare(
        &mut self,
        kind: VariableKind,
        name: &str,
        value: Value,
        line: usize,
    ) -> EvalResult<()> {
        if let Some(existing) = self.scope.get(name) {
            let redeclarable = kind == VariableKind::Var && matches!(existing, Binding::Mutable(_));
            if !redeclarable {
                return Err(ScriptError::syntax(
                    line,
                    format!("Identifier '{}' has already been declared", name),
                ));
            }
        }

        let binding = match kind {
            VariableKind::Const => Binding::Const(value.clone()),
            VariableKind::Let | VariableKind::Var => Binding::Mutable(value.clone()),
        };
        self.scope.insert(name.to_string(), binding);
        self.publish(name, &value);
        Ok(())
    }

    fn bind(&mut self, name: &str, binding: Binding, line: usize) -> EvalResult<()> {
        if self.scope.contains_key(name) {
            return Err(ScriptError::syntax(
                line,
                format!("Identifier '{}' has already been declared", name),
            ));
        }
        self.scope.insert(name.to_string(), binding);
        Ok(())
    }

    /// Push a local's new value to the exports it backs
    fn publish(&self, local: &str, value: &Value) {
        if let Some(names) = self.exported_locals.get(local) {
            for exported in names {
                self.module.exports.set(exported.clone(), value.clone());
            }
        }
    }

    fn lookup(&self, name: &str) -> EvalResult<Value> {
        match self.scope.get(name) {
            Some(binding) => self.binding_value(name, binding),
            None => match name {
                "undefined" => Ok(Value::Undefined),
                "NaN" => Ok(Value::Number(f64::NAN)),
                "Infinity" => Ok(Value::Number(f64::INFINITY)),
                _ => Err(ScriptError::Reference(name.to_string())),
            },
        }
    }

    fn binding_value(&self, name: &str, binding: &Binding) -> EvalResult<Value> {
        match binding {
            Binding::Const(value) | Binding::Mutable(value) => Ok(value.clone()),
            Binding::Import {
                exports,
                name: Some(export),
            } => Ok(exports.get(export).unwrap_or(Value::Undefined)),
            Binding::Import {
                exports,
                name: None,
            } => Ok(Value::Object(exports.clone())),
            Binding::Require => Err(ScriptError::type_error(format!(
                "{} can only be called, or used as {}.resolve / {}.cache",
                name, name, name
            ))),
        }
    }

    fn assign_identifier(&mut self, name: &str, value: Value) -> EvalResult<()> {
        match self.scope.get_mut(name) {
            Some(Binding::Mutable(slot)) => *slot = value.clone(),
            Some(_) => {
                return Err(ScriptError::type_error("Assignment to constant variable."));
            }
            None => return Err(ScriptError::Reference(name.to_string())),
        }
        self.publish(name, &value);
        Ok(())
    }

    fn is_require(&self, expression: &Expression) -> bool {
        matches!(
            expression,
            Expression::Identifier(name) if matches!(self.scope.get(name), Some(Binding::Require))
        )
    }

    /// Evaluates an expression.
    fn evaluate(&mut self, expression: &Expression) -> EvalResult<Value> {
        match expression {
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Boolean(b) => Ok(Value::Boolean(*b)),
            Expression::Null => Ok(Value::Null),
            Expression::Identifier(name) => self.lookup(name),
            Expression::Array(elements) => elements
                .iter()
                .map(|element| self.evaluate(element))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),
            Expression::Object(properties) => {
                let obj = Object::new();
                for (key, value) in properties {
                    let value = self.evaluate(value)?;
                    obj.set(key.clone(), value);
                }
                Ok(Value::Object(obj))
            }
            Expression::Member { object, property } => {
                if self.is_require(object) {
                    return self.require_property(property);
                }
                let target = self.evaluate(object)?;
                get_property(&target, property)
            }
            Expression::Computed { object, property } => {
                let target = self.evaluate(object)?;
                let key = self.evaluate(property)?.to_string();
                get_property(&target, &key)
            }
            Expression::Call { callee, arguments } => self.call(callee, arguments),
            Expression::Unary { operator, argument } => self.evaluate_unary(*operator, argument),
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(binary(*operator, &left, &right))
            }
            Expression::Assign { target, value } => self.evaluate_assignment(target, value),
            Expression::ImportMeta(line) => {
                if self.module.format != ModuleFormat::EsModule {
                    return Err(ScriptError::syntax(
                        *line,
                        "Cannot use 'import.meta' outside a module",
                    ));
                }
                let module = self.module;
                let meta = self
                    .import_meta
                    .get_or_insert_with(|| ImportMeta::new(&module.path, module.is_main).to_object());
                Ok(Value::Object(meta.clone()))
            }
        }
    }

    fn evaluate_unary(&mut self, operator: UnaryOperator, argument: &Expression) -> EvalResult<Value> {
        if operator == UnaryOperator::Typeof {
            if self.is_require(argument) {
                return Ok(Value::from("function"));
            }
            // typeof never throws on undeclared names
            if let Expression::Identifier(name) = argument {
                if self.lookup(name).is_err() {
                    return Ok(Value::from("undefined"));
                }
            }
        }

        let value = self.evaluate(argument)?;
        Ok(match operator {
            UnaryOperator::Not => Value::Boolean(!value.to_boolean()),
            UnaryOperator::Minus => Value::Number(-value.to_number()),
            UnaryOperator::Plus => Value::Number(value.to_number()),
            UnaryOperator::Typeof => Value::from(value.type_of()),
        })
    }

    fn evaluate_assignment(&mut self, target: &Expression, value: &Expression) -> EvalResult<Value> {
        match target {
            Expression::Identifier(name) => {
                let value = self.evaluate(value)?;
                self.assign_identifier(name, value.clone())?;
                Ok(value)
            }
            Expression::Member { object, property } => {
                let object = self.evaluate(object)?;
                let value = self.evaluate(value)?;
                self.set_property(&object, property, value.clone())?;
                Ok(value)
            }
            Expression::Computed { object, property } => {
                let object = self.evaluate(object)?;
                let key = self.evaluate(property)?.to_string();
                let value = self.evaluate(value)?;
                self.set_property(&object, &key, value.clone())?;
                Ok(value)
            }
            _ => Err(ScriptError::type_error("Invalid assignment target")),
        }
    }

    fn set_property(&self, target: &Value, key: &str, value: Value) -> EvalResult<()> {
        match target {
            Value::Object(obj) => {
                let is_module_exports = key == "exports"
                    && self
                        .module_object
                        .as_ref()
                        .is_some_and(|module| module.ptr_eq(obj));
                if is_module_exports {
                    // Requesters keep the original exports object
                    assign_module_exports(&self.module.exports, value.clone());
                }
                obj.set(key, value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(ScriptError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                target, key
            ))),
            other => Err(ScriptError::type_error(format!(
                "Cannot create property '{}' on {} '{}'",
                key,
                other.type_of(),
                other
            ))),
        }
    }

    fn call(&mut self, callee: &Expression, arguments: &[Expression]) -> EvalResult<Value> {
        if self.is_require(callee) {
            let specifier = self.specifier_argument(arguments)?;
            let module = self.host.require(&specifier, &self.module.dirname)?;
            return Ok(Value::Object(module.exports));
        }

        if let Expression::Member { object, property } = callee {
            if property == "resolve" && self.is_require(object) {
                let specifier = self.specifier_argument(arguments)?;
                let resolved = self.host.resolve(&specifier, &self.module.dirname)?;
                return Ok(Value::String(resolved));
            }
        }

        // Surface reference errors before the call error
        self.evaluate(callee)?;
        Err(ScriptError::type_error(format!(
            "{} is not a function",
            describe_callee(callee)
        )))
    }

    fn specifier_argument(&mut self, arguments: &[Expression]) -> EvalResult<String> {
        let value = match arguments.first() {
            Some(argument) => self.evaluate(argument)?,
            None => Value::Undefined,
        };
        match value {
            Value::String(specifier) if !specifier.is_empty() => Ok(specifier),
            Value::String(_) => Err(ScriptError::type_error(
                "The argument 'id' must be a non-empty string. Received ''",
            )),
            other => Err(ScriptError::type_error(format!(
                "The \"id\" argument must be of type string. Received type {}",
                other.type_of()
            ))),
        }
    }

    fn require_property(&mut self, property: &str) -> EvalResult<Value> {
        match property {
            "cache" => Ok(Value::Object(self.host.cache_snapshot())),
            "main" => match &self.module_object {
                Some(module) if self.module.is_main => Ok(Value::Object(module.clone())),
                _ => Ok(self.host.main_module_object()),
            },
            "resolve" => Err(ScriptError::type_error("require.resolve must be called")),
            _ => Ok(Value::Undefined),
        }
    }
}

fn get_property(target: &Value, key: &str) -> EvalResult<Value> {
    match target {
        Value::Object(obj) => Ok(obj.get(key).unwrap_or(Value::Undefined)),
        Value::Array(items) => Ok(if key == "length" {
            Value::Number(items.len() as f64)
        } else {
            key.parse::<usize>()
                .ok()
                .and_then(|index| items.get(index).cloned())
                .unwrap_or(Value::Undefined)
        }),
        Value::String(s) => Ok(if key == "length" {
            Value::Number(s.encode_utf16().count() as f64)
        } else {
            key.parse::<usize>()
                .ok()
                .and_then(|index| s.chars().nth(index))
                .map(|ch| Value::String(ch.to_string()))
                .unwrap_or(Value::Undefined)
        }),
        Value::Undefined | Value::Null => Err(ScriptError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            target, key
        ))),
        Value::Boolean(_) | Value::Number(_) => Ok(Value::Undefined),
    }
}

fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOperator::Add => {
            if is_numeric_primitive(left) && is_numeric_primitive(right) {
                Value::Number(left.to_number() + right.to_number())
            } else {
                Value::String(format!("{}{}", left, right))
            }
        }
        BinaryOperator::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::StrictEqual => Value::Boolean(left == right),
        BinaryOperator::StrictNotEqual => Value::Boolean(left != right),
        BinaryOperator::Equal => Value::Boolean(loose_equals(left, right)),
        BinaryOperator::NotEqual => Value::Boolean(!loose_equals(left, right)),
    }
}

fn is_numeric_primitive(value: &Value) -> bool {
    matches!(
        value,
        Value::Undefined | Value::Null | Value::Boolean(_) | Value::Number(_)
    )
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    if left.is_nullish() || right.is_nullish() {
        return left.is_nullish() && right.is_nullish();
    }
    match (left, right) {
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => left == right,
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => {
            left.to_string() == right.to_string()
        }
        (Value::String(a), Value::String(b)) => a == b,
        _ => left.to_number() == right.to_number(),
    }
}

/// Message for `throw value`; error-like objects render as `Name: message`
fn describe_thrown(value: &Value) -> String {
    if let Value::Object(obj) = value {
        if let Some(message) = obj.get("message") {
            let name = obj.get("name").unwrap_or_else(|| Value::from("Error"));
            return format!("{}: {}", name, message);
        }
    }
    value.to_string()
}

fn describe_callee(callee: &Expression) -> String {
    match callee {
        Expression::Identifier(name) => name.clone(),
        Expression::Member { object, property } => {
            format!("{}.{}", describe_callee(object), property)
        }
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;
    use crate::script::parser::Parser;
    use std::path::{Path, PathBuf};

    /// Host serving pre-built modules by specifier
    #[derive(Default)]
    struct TestHost {
        modules: HashMap<String, RequiredModule>,
        required: Vec<String>,
    }

    impl TestHost {
        fn with_module(mut self, specifier: &str, format: ModuleFormat, exports: Object) -> Self {
            self.modules.insert(
                specifier.to_string(),
                RequiredModule {
                    exports,
                    format,
                    complete: true,
                },
            );
            self
        }
    }

    impl ModuleHost for TestHost {
        fn require(
            &mut self,
            specifier: &str,
            _from_dir: &Path,
        ) -> crate::error::Result<RequiredModule> {
            self.required.push(specifier.to_string());
            self.modules
                .get(specifier)
                .cloned()
                .ok_or_else(|| ModuleError::not_found(specifier))
        }

        fn resolve(&self, specifier: &str, from_dir: &Path) -> crate::error::Result<String> {
            Ok(from_dir.join(specifier).display().to_string())
        }

        fn cache_snapshot(&self) -> Object {
            let cache = Object::new();
            cache.set("/app/cached.js", Object::new());
            cache
        }

        fn main_module_object(&self) -> Value {
            let main = Object::new();
            main.set("id", ".");
            Value::Object(main)
        }
    }

    fn context(format: ModuleFormat, source: &str) -> ModuleContext {
        ModuleContext {
            path: PathBuf::from("/app/main.js"),
            dirname: PathBuf::from("/app"),
            source: source.to_string(),
            format,
            exports: Object::new(),
            is_main: true,
        }
    }

    fn run_with(host: &mut TestHost, format: ModuleFormat, source: &str) -> EvalResult<Object> {
        let module = context(format, source);
        let program = Parser::new(source).parse_program()?;
        Interpreter::new(&module, host).run(&program)?;
        Ok(module.exports)
    }

    fn run(format: ModuleFormat, source: &str) -> EvalResult<Object> {
        run_with(&mut TestHost::default(), format, source)
    }

    fn object(entries: &[(&str, Value)]) -> Object {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_commonjs_exports() {
        let exports = run(
            ModuleFormat::CommonJs,
            "const greeting = 'hello'\nexports.hello = greeting + ' world!'\nexports['n'] = 1 + 2 - 0.5",
        )
        .unwrap();
        assert_eq!(exports.get("hello"), Some(Value::from("hello world!")));
        assert_eq!(exports.get("n"), Some(Value::Number(2.5)));
    }

    #[test]
    fn test_commonjs_scope() {
        let exports = run(
            ModuleFormat::CommonJs,
            "exports.file = __filename\n\
             exports.dir = __dirname\n\
             exports.id = module.id\n\
             exports.loaded = module.loaded\n\
             exports.same = module.exports === exports\n\
             exports.kind = typeof require",
        )
        .unwrap();
        assert_eq!(exports.get("file"), Some(Value::from("/app/main.js")));
        assert_eq!(exports.get("dir"), Some(Value::from("/app")));
        assert_eq!(exports.get("id"), Some(Value::from(".")));
        assert_eq!(exports.get("loaded"), Some(Value::Boolean(false)));
        assert_eq!(exports.get("same"), Some(Value::Boolean(true)));
        assert_eq!(exports.get("kind"), Some(Value::from("function")));
    }

    #[test]
    fn test_module_exports_replacement() {
        let exports = run(
            ModuleFormat::CommonJs,
            "exports.stale = true\nmodule.exports = { c: 'c' }",
        )
        .unwrap();
        assert_eq!(exports.keys(), vec!["c".to_string()]);

        // The common `exports = module.exports = {...}` idiom
        let exports = run(
            ModuleFormat::CommonJs,
            "exports = module.exports = { a: 1 }\nexports.b = 2",
        )
        .unwrap();
        assert_eq!(exports.get("a"), Some(Value::Number(1.0)));
        assert_eq!(exports.get("b"), Some(Value::Number(2.0)));

        let exports = run(ModuleFormat::CommonJs, "module.exports = 'text'").unwrap();
        assert_eq!(exports.get("default"), Some(Value::from("text")));
    }

    #[test]
    fn test_require_calls() {
        let dep = object(&[("value", Value::Number(42.0))]);
        let mut host = TestHost::default().with_module("./dep", ModuleFormat::CommonJs, dep.clone());

        let exports = run_with(
            &mut host,
            ModuleFormat::CommonJs,
            "const dep = require('./dep')\n\
             exports.value = dep.value\n\
             exports.dep = dep\n\
             exports.where = require.resolve('./dep')\n\
             exports.cache = require.cache",
        )
        .unwrap();

        assert_eq!(exports.get("value"), Some(Value::Number(42.0)));
        assert_eq!(exports.get("dep"), Some(Value::Object(dep)));
        assert_eq!(exports.get("where"), Some(Value::from("/app/./dep")));
        let cache = exports.get("cache").unwrap();
        assert!(cache.as_object().unwrap().has("/app/cached.js"));
        assert_eq!(host.required, vec!["./dep".to_string()]);
    }

    #[test]
    fn test_require_main() {
        let exports = run(
            ModuleFormat::CommonJs,
            "exports.isMain = require.main === module",
        )
        .unwrap();
        assert_eq!(exports.get("isMain"), Some(Value::Boolean(true)));

        let mut module = context(ModuleFormat::CommonJs, "exports.mainId = require.main.id");
        module.is_main = false;
        let program = Parser::new(&module.source).parse_program().unwrap();
        Interpreter::new(&module, &mut TestHost::default())
            .run(&program)
            .unwrap();
        assert_eq!(module.exports.get("mainId"), Some(Value::from(".")));
    }

    #[test]
    fn test_require_errors() {
        let err = run(ModuleFormat::CommonJs, "require('./missing')").unwrap_err();
        assert!(matches!(err, ScriptError::Module(ref inner) if inner.is_resolution_error()));

        let err = run(ModuleFormat::CommonJs, "require(42)").unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));

        let err = run(ModuleFormat::CommonJs, "const r = require").unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn test_runtime_errors() {
        assert!(matches!(
            run(ModuleFormat::CommonJs, "exports.a = missing").unwrap_err(),
            ScriptError::Reference(name) if name == "missing"
        ));
        assert!(matches!(
            run(ModuleFormat::CommonJs, "const a = 1\na = 2").unwrap_err(),
            ScriptError::Type(msg) if msg.contains("constant")
        ));
        assert!(matches!(
            run(ModuleFormat::CommonJs, "let a = 1\nlet a = 2").unwrap_err(),
            ScriptError::Syntax { line: 2, .. }
        ));
        assert!(matches!(
            run(ModuleFormat::CommonJs, "exports.a = undefined.b").unwrap_err(),
            ScriptError::Type(msg) if msg.contains("reading 'b'")
        ));
        assert!(matches!(
            run(ModuleFormat::CommonJs, "exports.nope()").unwrap_err(),
            ScriptError::Type(msg) if msg == "exports.nope is not a function"
        ));
        assert!(matches!(
            run(ModuleFormat::CommonJs, "throw { name: 'RangeError', message: 'too big' }").unwrap_err(),
            ScriptError::Thrown(msg) if msg == "RangeError: too big"
        ));
    }

    #[test]
    fn test_module_syntax_in_commonjs() {
        assert!(matches!(
            run(ModuleFormat::CommonJs, "exports.a = 1\nimport x from './x'").unwrap_err(),
            ScriptError::Syntax { line: 2, .. }
        ));
        assert!(matches!(
            run(ModuleFormat::CommonJs, "export const a = 1").unwrap_err(),
            ScriptError::Syntax { line: 1, .. }
        ));
        assert!(matches!(
            run(ModuleFormat::CommonJs, "exports.url = import.meta.url").unwrap_err(),
            ScriptError::Syntax { .. }
        ));
    }

    #[test]
    fn test_esm_exports() {
        let exports = run(
            ModuleFormat::EsModule,
            "export const c = 'c'\n\
             let count = 1\n\
             export { count, count as total }\n\
             count = count + 1\n\
             export default { answer: 42 }",
        )
        .unwrap();

        assert_eq!(exports.get("c"), Some(Value::from("c")));
        assert_eq!(exports.get("count"), Some(Value::Number(2.0)));
        assert_eq!(exports.get("total"), Some(Value::Number(2.0)));
        let default = exports.get("default").unwrap();
        assert_eq!(
            default.as_object().unwrap().get("answer"),
            Some(Value::Number(42.0))
        );
    }

    #[test]
    fn test_esm_has_no_commonjs_scope() {
        for source in ["require('./x')", "exports.a = 1", "module.exports = 1"] {
            assert!(matches!(
                run(ModuleFormat::EsModule, source).unwrap_err(),
                ScriptError::Reference(_)
            ));
        }
    }

    #[test]
    fn test_esm_imports() {
        let esm = object(&[("a", Value::Number(1.0)), ("default", Value::from("d"))]);
        let cjs = object(&[("x", Value::from("x"))]);
        let mut host = TestHost::default()
            .with_module("./esm.js", ModuleFormat::EsModule, esm.clone())
            .with_module("./cjs.js", ModuleFormat::CommonJs, cjs.clone());

        let exports = run_with(
            &mut host,
            ModuleFormat::EsModule,
            "import d, { a as renamed } from './esm.js'\n\
             import * as ns from './esm.js'\n\
             import whole, { x } from './cjs.js'\n\
             export const values = [d, renamed, ns.a, whole.x, x]\n\
             export const same = whole === ns",
        )
        .unwrap();

        assert_eq!(
            exports.get("values"),
            Some(Value::Array(vec![
                Value::from("d"),
                Value::Number(1.0),
                Value::Number(1.0),
                Value::from("x"),
                Value::from("x"),
            ]))
        );
        assert_eq!(exports.get("same"), Some(Value::Boolean(false)));
    }

    #[test]
    fn test_imports_are_live_and_read_only() {
        let esm = object(&[("count", Value::Number(1.0))]);
        let mut host =
            TestHost::default().with_module("./counter.js", ModuleFormat::EsModule, esm.clone());

        let module = context(
            ModuleFormat::EsModule,
            "import { count } from './counter.js'\nexport const before = count\nconst later = 1",
        );
        let program = Parser::new(&module.source).parse_program().unwrap();
        esm.set("count", 5.0);
        Interpreter::new(&module, &mut host).run(&program).unwrap();
        assert_eq!(module.exports.get("before"), Some(Value::Number(5.0)));

        let err = run_with(
            &mut host,
            ModuleFormat::EsModule,
            "import { count } from './counter.js'\ncount = 2",
        )
        .unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn test_missing_named_export() {
        let esm = object(&[("a", Value::Number(1.0))]);
        let mut host = TestHost::default().with_module("./esm.js", ModuleFormat::EsModule, esm);

        let err = run_with(
            &mut host,
            ModuleFormat::EsModule,
            "import { nope } from './esm.js'",
        )
        .unwrap_err();
        assert!(
            matches!(err, ScriptError::MissingExport { ref specifier, ref name } if specifier == "./esm.js" && name == "nope")
        );

        let err = run_with(&mut host, ModuleFormat::EsModule, "import d from './esm.js'").unwrap_err();
        assert!(matches!(err, ScriptError::MissingExport { ref name, .. } if name == "default"));
    }

    #[test]
    fn test_incomplete_module_defers_missing_exports() {
        let partial = Object::new();
        let mut host = TestHost::default();
        host.modules.insert(
            "./cycle.js".to_string(),
            RequiredModule {
                exports: partial.clone(),
                format: ModuleFormat::EsModule,
                complete: false,
            },
        );

        let exports = run_with(
            &mut host,
            ModuleFormat::EsModule,
            "import { later } from './cycle.js'\nexport const seen = later",
        )
        .unwrap();
        assert_eq!(exports.get("seen"), Some(Value::Undefined));
    }

    #[test]
    fn test_reexports() {
        let lib = object(&[
            ("a", Value::Number(1.0)),
            ("b", Value::Number(2.0)),
            ("default", Value::from("lib")),
        ]);
        let mut host = TestHost::default().with_module("./lib.js", ModuleFormat::EsModule, lib.clone());

        let exports = run_with(
            &mut host,
            ModuleFormat::EsModule,
            "export { a as first, default } from './lib.js'\n\
             export * from './lib.js'\n\
             export * as lib from './lib.js'\n\
             import { b } from './lib.js'\n\
             export { b as second }",
        )
        .unwrap();

        assert_eq!(exports.get("first"), Some(Value::Number(1.0)));
        assert_eq!(exports.get("default"), Some(Value::from("lib")));
        assert_eq!(exports.get("a"), Some(Value::Number(1.0)));
        assert_eq!(exports.get("second"), Some(Value::Number(2.0)));
        assert_eq!(exports.get("lib"), Some(Value::Object(lib)));
    }

    #[test]
    fn test_undefined_local_export() {
        let err = run(ModuleFormat::EsModule, "export { ghost }").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { ref message, .. } if message.contains("ghost")));
    }

    #[test]
    fn test_import_meta() {
        let exports = run(
            ModuleFormat::EsModule,
            "export const url = import.meta.url\nexport const main = import.meta.main\nexport const same = import.meta === import.meta",
        )
        .unwrap();
        assert_eq!(exports.get("url"), Some(Value::from("file:///app/main.js")));
        assert_eq!(exports.get("main"), Some(Value::Boolean(true)));
        assert_eq!(exports.get("same"), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_operators() {
        let exports = run(
            ModuleFormat::CommonJs,
            "exports.concat = 'a' + 1\n\
             exports.sum = 1 + true\n\
             exports.neg = -'3'\n\
             exports.not = !''\n\
             exports.loose = null == undefined\n\
             exports.strict = null === undefined\n\
             exports.numeric = '1' == 1\n\
             exports.nan = NaN !== NaN\n\
             exports.len = 'héllo'.length + [1, 2].length\n\
             exports.type = typeof undeclared",
        )
        .unwrap();

        assert_eq!(exports.get("concat"), Some(Value::from("a1")));
        assert_eq!(exports.get("sum"), Some(Value::Number(2.0)));
        assert_eq!(exports.get("neg"), Some(Value::Number(-3.0)));
        assert_eq!(exports.get("not"), Some(Value::Boolean(true)));
        assert_eq!(exports.get("loose"), Some(Value::Boolean(true)));
        assert_eq!(exports.get("strict"), Some(Value::Boolean(false)));
        assert_eq!(exports.get("numeric"), Some(Value::Boolean(true)));
        assert_eq!(exports.get("nan"), Some(Value::Boolean(true)));
        assert_eq!(exports.get("len"), Some(Value::Number(7.0)));
        assert_eq!(exports.get("type"), Some(Value::from("undefined")));
    }
}
