use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Serialize;

use crate::{
    error::{HdiError, Result},
    lexer::Lexer,
    token::TokenKind,
    utils::quote,
};

/// What the resolver needs to know about a file: its package and what it
/// imports. Built by a cheap scan of the header statements only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDetail {
    pub file_path: PathBuf,
    pub package:   String,
    pub name:      String,
    pub imports:   IndexSet<String>,
}

impl FileDetail {
    pub fn scan(path: &Path) -> Result<FileDetail> {
        let source = fs::read_to_string(path).map_err(|source| HdiError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::scan_source(path, &source)
    }

    /// Reads `package` and the `import` statements that follow it. Anything
    /// malformed is left for the parser to report.
    pub fn scan_source(path: &Path, source: &str) -> Result<FileDetail> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| HdiError::Resolve(format!("invalid file name {}", path.display())))?
            .to_owned();

        let mut lexer = Lexer::new(source);
        if !lexer.next(true).is(TokenKind::Package) {
            return Err(HdiError::Resolve(format!(
                "{}: missing package declaration",
                path.display()
            )));
        }
        let package = read_qualified_name(&mut lexer)
            .filter(|_| lexer.next(true).is(TokenKind::Semicolon))
            .ok_or_else(|| {
                HdiError::Resolve(format!("{}: malformed package declaration", path.display()))
            })?;

        let mut imports = IndexSet::new();
        loop {
            match lexer.peek(true).kind {
                TokenKind::Import => {
                    lexer.next(true);
                    match read_qualified_name(&mut lexer) {
                        Some(import) if lexer.peek(true).is(TokenKind::Semicolon) => {
                            lexer.next(true);
                            imports.insert(import);
                        }
                        _ => skip_statement(&mut lexer),
                    }
                }
                TokenKind::Sequenceable => skip_statement(&mut lexer),
                _ => break,
            }
        }

        Ok(FileDetail {
            file_path: path.to_path_buf(),
            package,
            name,
            imports,
        })
    }

    /// `package.name`, the key every other stage uses for this unit.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

/// `ident ( '.' ident )*`. Stops in front of the first token that does not fit.
fn read_qualified_name(lexer: &mut Lexer) -> Option<String> {
    if !lexer.peek(true).is(TokenKind::Identifier) {
        return None;
    }
    let mut name = lexer.next(true).text;
    while lexer.peek(true).is(TokenKind::Dot) {
        lexer.next(true);
        if !lexer.peek(true).is(TokenKind::Identifier) {
            return None;
        }
        name.push('.');
        name.push_str(&lexer.next(true).text);
    }
    Some(name)
}

fn skip_statement(lexer: &mut Lexer) {
    loop {
        let token = lexer.next(true);
        if token.is(TokenKind::Semicolon) || token.is(TokenKind::Eof) {
            return;
        }
    }
}

impl std::fmt::Display for FileDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", quote(&self.full_name()), self.file_path.display())?;
        for import in &self.imports {
            write!(f, "\n  import {}", import)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_header() {
        let source = r#"
/*
 * Copyright (c) 2026
 */
package ohos.hdi.foo.v1_0;

import ohos.hdi.foo.v1_0.Types;
sequenceable ohos.hdi.foo.Buffer;
import ohos.hdi.foo.v1_0.IFooCallback;

interface IFoo {
    Open([in] int id);
}
"#;
        let detail = FileDetail::scan_source(Path::new("idl/foo/v1_0/IFoo.idl"), source).unwrap();
        assert_eq!(detail.package, "ohos.hdi.foo.v1_0");
        assert_eq!(detail.name, "IFoo");
        assert_eq!(detail.full_name(), "ohos.hdi.foo.v1_0.IFoo");
        assert_eq!(
            detail.imports.iter().collect::<Vec<_>>(),
            ["ohos.hdi.foo.v1_0.Types", "ohos.hdi.foo.v1_0.IFooCallback"]
        );
    }

    #[test]
    fn malformed_imports_are_skipped() {
        let source = "package a.v1_0;\nimport a.;\nimport a.v1_0.B;\nstruct S { int x; };";
        let detail = FileDetail::scan_source(Path::new("A.idl"), source).unwrap();
        assert_eq!(detail.imports.len(), 1);
        assert!(detail.imports.contains("a.v1_0.B"));
    }

    #[test]
    fn package_is_required() {
        let err = FileDetail::scan_source(Path::new("A.idl"), "import a.v1_0.B;").unwrap_err();
        assert!(matches!(err, HdiError::Resolve(_)));
    }
}
