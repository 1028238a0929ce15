//! Evaluation of parsed expressions against one pipe item.

use super::parser::{number, CmpOp, Expr};
use crate::error::{Result, ShelveError};
use crate::pipe::PipeItem;
use crate::services::FileSystem;
use crate::util::paths;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Names visible to an expression evaluated for `item`.
///
/// Derived bindings (`basename`, `filename`, `extension`, `folderpath`,
/// `property`) shadow item data of the same name.
pub struct Scope<'a> {
    item: &'a PipeItem,
    fs: &'a dyn FileSystem,
}

impl<'a> Scope<'a> {
    pub fn new(item: &'a PipeItem, fs: &'a dyn FileSystem) -> Self {
        Self { item, fs }
    }

    pub fn resolve(&self, name: &str) -> Option<Value> {
        let path = &self.item.filepath;
        let derived = match name {
            "basename" => Some(paths::stem(path)),
            "filename" => Some(paths::file_name(path)),
            "extension" => Some(paths::extension(path)),
            "folderpath" => Some(paths::folder(path)),
            "property" => return Some(self.property()),
            _ => None,
        };
        match derived {
            Some(text) => Some(Value::String(text)),
            None => self.item.data.get(name).cloned(),
        }
    }

    /// Filesystem predicates plus pass-through item data.
    pub fn property(&self) -> Value {
        let mut map = self.item.data.clone();
        let path = &self.item.filepath;
        map.insert("islink".to_string(), Value::Bool(self.fs.is_link(path)));
        map.insert("isfile".to_string(), Value::Bool(self.fs.is_file(path)));
        map.insert("isdir".to_string(), Value::Bool(self.fs.is_dir(path)));
        Value::Object(map)
    }
}

pub struct Evaluator<'a> {
    scope: &'a Scope<'a>,
    source: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a Scope<'a>, source: &'a str) -> Self {
        Self { scope, source }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self
                .scope
                .resolve(name)
                .ok_or_else(|| self.error(format!("Invalid argument {}", name))),
            Expr::Attr(target, attr) => {
                let target = self.eval(target)?;
                match &target {
                    Value::Object(map) => map
                        .get(attr)
                        .cloned()
                        .ok_or_else(|| self.error(format!("Invalid argument {}", attr))),
                    _ => Err(self.error(format!(
                        "{} has no attribute {}",
                        type_name(&target),
                        attr
                    ))),
                }
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                self.index(&target, &index)
            }
            Expr::Call(callee, args) => self.call(callee, args),
            Expr::Not(inner) => Ok(Value::Bool(!truthy(&self.eval(inner)?))),
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Compare(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.compare(*op, &left, &right).map(Value::Bool)
            }
            Expr::Add(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) if left.is_number() && right.is_number() => Ok(number(a + b)),
                    _ => Ok(Value::String(render(&left) + &render(&right))),
                }
            }
        }
    }

    fn index(&self, target: &Value, index: &Value) -> Result<Value> {
        match (target, index) {
            (Value::Object(map), _) => {
                let key = render(index);
                map.get(&key)
                    .cloned()
                    .ok_or_else(|| self.error(format!("Invalid argument {}", key)))
            }
            (Value::Array(list), Value::Number(n)) => {
                let i = n
                    .as_i64()
                    .ok_or_else(|| self.error("list index must be an integer"))?;
                let len = list.len() as i64;
                let i = if i < 0 { len + i } else { i };
                list.get(i as usize)
                    .filter(|_| i >= 0)
                    .cloned()
                    .ok_or_else(|| self.error(format!("index {} out of range", i)))
            }
            (Value::String(text), Value::Number(n)) => {
                let i = n
                    .as_i64()
                    .ok_or_else(|| self.error("string index must be an integer"))?;
                let chars: Vec<char> = text.chars().collect();
                let len = chars.len() as i64;
                let i = if i < 0 { len + i } else { i };
                if i < 0 || i >= len {
                    return Err(self.error(format!("index {} out of range", i)));
                }
                Ok(Value::String(chars[i as usize].to_string()))
            }
            _ => Err(self.error(format!("{} is not indexable", type_name(target)))),
        }
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> Result<Value> {
        let (name, mut values) = match callee {
            Expr::Name(name) => (name.as_str(), Vec::new()),
            // Method form: `x.upper()` is `upper(x)`.
            Expr::Attr(receiver, method) if is_builtin(method) => {
                (method.as_str(), vec![self.eval(receiver)?])
            }
            _ => return Err(self.error("expression is not callable")),
        };
        for arg in args {
            values.push(self.eval(arg)?);
        }
        self.builtin(name, &values)
    }

    fn builtin(&self, name: &str, args: &[Value]) -> Result<Value> {
        let arity = |n: usize| -> Result<()> {
            if args.len() == n {
                Ok(())
            } else {
                Err(self.error(format!(
                    "{}() takes {} argument(s), {} given",
                    name,
                    n,
                    args.len()
                )))
            }
        };
        let text = |i: usize| render(&args[i]);

        match name {
            "lowercase" | "lower" => {
                arity(1)?;
                Ok(Value::String(text(0).to_lowercase()))
            }
            "uppercase" | "upper" => {
                arity(1)?;
                Ok(Value::String(text(0).to_uppercase()))
            }
            "titlecase" | "title" => {
                arity(1)?;
                Ok(Value::String(titlecase(&text(0))))
            }
            "trim" | "strip" => {
                arity(1)?;
                Ok(Value::String(text(0).trim().to_string()))
            }
            "str" => {
                arity(1)?;
                Ok(Value::String(text(0)))
            }
            "len" => {
                arity(1)?;
                let len = match &args[0] {
                    Value::Array(list) => list.len(),
                    Value::Object(map) => map.len(),
                    other => render(other).chars().count(),
                };
                Ok(Value::from(len))
            }
            "replace" => {
                arity(3)?;
                Ok(Value::String(text(0).replace(&text(1), &text(2))))
            }
            "contains" => {
                arity(2)?;
                self.compare(CmpOp::In, &args[1], &args[0]).map(Value::Bool)
            }
            "startswith" => {
                arity(2)?;
                Ok(Value::Bool(text(0).starts_with(&text(1))))
            }
            "endswith" => {
                arity(2)?;
                Ok(Value::Bool(text(0).ends_with(&text(1))))
            }
            "default" => {
                arity(2)?;
                Ok(if truthy(&args[0]) {
                    args[0].clone()
                } else {
                    args[1].clone()
                })
            }
            _ => Err(self.error(format!("Invalid argument {}", name))),
        }
    }

    fn compare(&self, op: CmpOp, left: &Value, right: &Value) -> Result<bool> {
        match op {
            CmpOp::Eq => Ok(loose_eq(left, right)),
            CmpOp::Ne => Ok(!loose_eq(left, right)),
            CmpOp::In => match right {
                Value::String(haystack) => Ok(haystack.contains(&render(left))),
                Value::Array(list) => Ok(list.iter().any(|v| loose_eq(v, left))),
                Value::Object(map) => Ok(map.contains_key(&render(left))),
                other => Err(self.error(format!("cannot search in {}", type_name(other)))),
            },
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                let ordering = order(left, right).ok_or_else(|| {
                    self.error(format!(
                        "cannot compare {} with {}",
                        type_name(left),
                        type_name(right)
                    ))
                })?;
                Ok(match op {
                    CmpOp::Lt => ordering == Ordering::Less,
                    CmpOp::Le => ordering != Ordering::Greater,
                    CmpOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                })
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ShelveError {
        ShelveError::expression(self.source, message)
    }
}

pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "lowercase"
            | "lower"
            | "uppercase"
            | "upper"
            | "titlecase"
            | "title"
            | "trim"
            | "strip"
            | "str"
            | "len"
            | "replace"
            | "contains"
            | "startswith"
            | "endswith"
            | "default"
    )
}

/// String form used when an expression result is spliced into content.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(list) => !list.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "none",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn titlecase(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Builds a map value; used by callers that hand structured data to items.
pub fn object<I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect::<Map<_, _>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::Parser;
    use crate::pipe::Pipe;
    use crate::services::LocalFileSystem;
    use std::path::PathBuf;

    fn eval_for(path: &str, source: &str) -> Result<Value> {
        let pipe = Pipe::new(vec![PathBuf::from(path)], "/");
        let item = pipe.items().next().unwrap().clone();
        eval_item(&item, source)
    }

    fn eval_item(item: &PipeItem, source: &str) -> Result<Value> {
        let fs = LocalFileSystem::new();
        let scope = Scope::new(item, &fs);
        let expr = Parser::parse(source)?;
        Evaluator::new(&scope, source).eval(&expr)
    }

    #[test]
    fn test_derived_bindings() {
        let path = "/data/Inbox/Report.PDF";
        assert_eq!(eval_for(path, "basename").unwrap(), Value::from("Report"));
        assert_eq!(eval_for(path, "filename").unwrap(), Value::from("Report.PDF"));
        assert_eq!(eval_for(path, "extension").unwrap(), Value::from("pdf"));
        assert_eq!(eval_for(path, "folderpath").unwrap(), Value::from("/data/Inbox"));
        assert_eq!(eval_for(path, "path").unwrap(), Value::from(path));
    }

    #[test]
    fn test_string_builtins() {
        let path = "/tmp/my report.txt";
        assert_eq!(eval_for(path, "upper(basename)").unwrap(), Value::from("MY REPORT"));
        assert_eq!(eval_for(path, "basename.title()").unwrap(), Value::from("My Report"));
        assert_eq!(
            eval_for(path, "replace(basename, ' ', '_')").unwrap(),
            Value::from("my_report")
        );
        assert_eq!(eval_for(path, "len(extension)").unwrap(), Value::from(3));
        assert_eq!(eval_for(path, "startswith(filename, 'my')").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_item_data_and_groups() {
        let pipe = Pipe::new(vec![PathBuf::from("/tmp/inv-2024.txt")], "/tmp");
        let mut item = pipe.items().next().unwrap().clone();
        item.set("year", Value::from("2024"));
        item.set("groups", Value::from(vec!["inv", "2024"]));
        item.set("terminal", object([("out", Value::from("ok\n"))]));

        assert_eq!(eval_item(&item, "year").unwrap(), Value::from("2024"));
        assert_eq!(eval_item(&item, "groups[-1]").unwrap(), Value::from("2024"));
        assert_eq!(eval_item(&item, "terminal.out.trim()").unwrap(), Value::from("ok"));
        assert_eq!(eval_item(&item, "property.year").unwrap(), Value::from("2024"));
    }

    #[test]
    fn test_logic_and_comparison() {
        let path = "/tmp/a.txt";
        assert_eq!(
            eval_for(path, "extension == 'txt' and not (basename == 'b')").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval_for(path, "'x' in basename or 'fallback'").unwrap(), Value::from("fallback"));
        assert_eq!(eval_for(path, "1 + 2 > 2").unwrap(), Value::Bool(true));
        assert_eq!(eval_for(path, "basename + 1").unwrap(), Value::from("a1"));
    }

    #[test]
    fn test_property_checks_filesystem() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        let file = file.to_string_lossy().to_string();

        assert_eq!(eval_for(&file, "property.isfile").unwrap(), Value::Bool(true));
        assert_eq!(eval_for(&file, "property.isdir").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_undefined_name_is_an_expression_error() {
        let err = eval_for("/tmp/a.txt", "missing + basename").unwrap_err();
        assert_eq!(err.to_string(), "Expression `missing + basename`: Invalid argument missing");
        assert!(eval_for("/tmp/a.txt", "property.nothing").is_err());
        assert!(eval_for("/tmp/a.txt", "nothing(basename)").is_err());
    }

    #[test]
    fn test_render_and_truthy() {
        assert_eq!(render(&Value::Null), "");
        assert_eq!(render(&Value::from(2)), "2");
        assert_eq!(render(&Value::from(2.5)), "2.5");
        assert!(!truthy(&Value::from("")));
        assert!(truthy(&Value::from(vec![1])));
        assert_eq!(titlecase("hello wORLD-x"), "Hello World-X");
    }
}
