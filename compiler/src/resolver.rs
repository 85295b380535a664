use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::{
    error::{HdiError, Result},
    file_detail::FileDetail,
    options::Options,
    utils::quote,
};

/// Discovers every unit reachable from the entry files and orders them so
/// that each unit comes after everything it imports.
pub struct ModuleResolver<'a> {
    options: &'a Options,
    details: IndexMap<String, FileDetail>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(options: &'a Options) -> ModuleResolver<'a> {
        ModuleResolver {
            options,
            details: IndexMap::new(),
        }
    }

    /// Pre-scanned units keyed by full name, sorted by name after `resolve`.
    pub fn details(&self) -> &IndexMap<String, FileDetail> {
        &self.details
    }

    pub fn resolve(&mut self, entries: &[PathBuf]) -> Result<Vec<PathBuf>> {
        self.discover(entries)?;
        let order = self.topological_order()?;
        debug!(order = ?order, "compile order");
        Ok(order
            .iter()
            .filter_map(|name| self.details.get(name))
            .map(|detail| detail.file_path.clone())
            .collect())
    }

    fn discover(&mut self, entries: &[PathBuf]) -> Result<()> {
        let mut queue: VecDeque<(PathBuf, Option<String>)> =
            entries.iter().map(|path| (path.clone(), None)).collect();

        while let Some((path, expected)) = queue.pop_front() {
            let detail = FileDetail::scan(&path)?;
            let full_name = detail.full_name();
            debug!(unit = %full_name, path = %path.display(), imports = detail.imports.len(), "pre-scanned");

            if let Some(expected) = expected {
                if expected != full_name {
                    return Err(HdiError::Resolve(format!(
                        "{} was imported as {} but declares {}",
                        path.display(),
                        quote(&expected),
                        quote(&full_name)
                    )));
                }
            }

            if let Some(existing) = self.details.get(&full_name) {
                if same_file(&existing.file_path, &path) {
                    continue;
                }
                return Err(HdiError::Resolve(format!(
                    "unit {} is declared by both {} and {}",
                    quote(&full_name),
                    existing.file_path.display(),
                    path.display()
                )));
            }

            for import in &detail.imports {
                if self.details.contains_key(import) {
                    continue;
                }
                let import_path = self.options.import_path(import)?;
                if !import_path.is_file() {
                    return Err(HdiError::Resolve(format!(
                        "cannot find {} imported by {}, looked for {}",
                        quote(import),
                        path.display(),
                        import_path.display()
                    )));
                }
                queue.push_back((import_path, Some(import.clone())));
            }
            self.details.insert(full_name, detail);
        }

        self.details.sort_keys();
        Ok(())
    }

    /// Kahn's algorithm over full unit names, ties broken by name.
    fn topological_order(&self) -> Result<Vec<String>> {
        let mut pending: IndexMap<&str, IndexSet<&str>> = self
            .details
            .iter()
            .map(|(name, detail)| {
                (name.as_str(), detail.imports.iter().map(String::as_str).collect())
            })
            .collect();

        let mut queue: VecDeque<&str> = pending
            .iter()
            .filter(|(_, imports)| imports.is_empty())
            .map(|(name, _)| *name)
            .collect();
        for name in &queue {
            pending.shift_remove(name);
        }

        let mut order = Vec::with_capacity(self.details.len());
        while let Some(name) = queue.pop_front() {
            order.push(name.to_owned());
            let mut ready = Vec::new();
            for (other, imports) in pending.iter_mut() {
                if imports.shift_remove(name) && imports.is_empty() {
                    ready.push(*other);
                }
            }
            for other in ready {
                pending.shift_remove(other);
                queue.push_back(other);
            }
        }

        if order.len() < self.details.len() {
            let units = pending.keys().map(|name| name.to_string()).collect();
            return Err(HdiError::Cycle { units });
        }
        Ok(order)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn options(dir: &Path) -> Options {
        Options {
            roots: vec![format!("ohos.hdi:{}", dir.display()).parse().unwrap()],
            ..Options::default()
        }
    }

    #[test]
    fn imports_come_first() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "foo/v1_0/Types.idl", "package ohos.hdi.foo.v1_0;\nstruct S { int x; };");
        write(
            dir.path(),
            "foo/v1_0/IFooCallback.idl",
            "package ohos.hdi.foo.v1_0;\nimport ohos.hdi.foo.v1_0.Types;\n[callback] interface IFooCallback { Done([in] S s); }",
        );
        let entry = write(
            dir.path(),
            "foo/v1_0/IFoo.idl",
            "package ohos.hdi.foo.v1_0;\nimport ohos.hdi.foo.v1_0.IFooCallback;\nimport ohos.hdi.foo.v1_0.Types;\ninterface IFoo { Run([in] IFooCallback cb); }",
        );

        let options = options(dir.path());
        let mut resolver = ModuleResolver::new(&options);
        let order = resolver.resolve(&[entry]).unwrap();
        let names: Vec<_> = order
            .iter()
            .map(|p| p.file_stem().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["Types", "IFooCallback", "IFoo"]);
        assert_eq!(resolver.details().len(), 3);
    }

    #[test]
    fn cycle_is_rejected() {
        let dir = TempDir::new().unwrap();
        let a = write(
            dir.path(),
            "c/v1_0/A.idl",
            "package ohos.hdi.c.v1_0;\nimport ohos.hdi.c.v1_0.B;\nstruct A { int x; };",
        );
        write(
            dir.path(),
            "c/v1_0/B.idl",
            "package ohos.hdi.c.v1_0;\nimport ohos.hdi.c.v1_0.A;\nstruct B { int y; };",
        );
        let options = options(dir.path());
        match ModuleResolver::new(&options).resolve(&[a]) {
            Err(HdiError::Cycle { units }) => {
                assert_eq!(units, ["ohos.hdi.c.v1_0.A", "ohos.hdi.c.v1_0.B"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn missing_import() {
        let dir = TempDir::new().unwrap();
        let a = write(
            dir.path(),
            "m/v1_0/A.idl",
            "package ohos.hdi.m.v1_0;\nimport ohos.hdi.m.v1_0.Gone;\nstruct A { int x; };",
        );
        let options = options(dir.path());
        let err = ModuleResolver::new(&options).resolve(&[a]).unwrap_err();
        assert!(err.to_string().contains("cannot find \"ohos.hdi.m.v1_0.Gone\""));
    }

    #[test]
    fn same_entry_twice_is_one_unit() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "s/v1_0/A.idl", "package ohos.hdi.s.v1_0;\nstruct A { int x; };");
        let options = options(dir.path());
        let order = ModuleResolver::new(&options).resolve(&[a.clone(), a]).unwrap();
        assert_eq!(order.len(), 1);
    }
}
