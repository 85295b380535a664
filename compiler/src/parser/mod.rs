//! Recursive-descent parser for `.idl` files.
//!
//! Errors never abort a file: each one is recorded in the shared
//! [`Diagnostics`] and the parser skips to the next statement or declaration
//! boundary, so one run reports as many independent problems as possible. A
//! unit that recorded any error is not added to the module.

mod interface;
mod types;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    ast::{Ast, AstKind, AstModule, Attributes, NamespaceId, Position, SequenceableType, TypeId, TypeKey, TypeKind},
    error::{Diagnostic, DiagnosticKind, Diagnostics},
    lexer::Lexer,
    options::Options,
    package::{parse_package, split_full_name, Version},
    token::{Token, TokenKind},
    utils::quote,
    verifier::verify_ast,
};

/// Marker for "an error was recorded, resynchronize". Never carries data: the
/// diagnostic is already in the list.
#[derive(Debug)]
pub(crate) struct Recover;

pub(crate) type PResult<T> = std::result::Result<T, Recover>;

pub struct Parser<'a> {
    options:     &'a Options,
    module:      &'a mut AstModule,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(
        options: &'a Options,
        module: &'a mut AstModule,
        diagnostics: &'a mut Diagnostics,
    ) -> Parser<'a> {
        Parser {
            options,
            module,
            diagnostics,
        }
    }

    /// Parses one file into the module. Returns false if any error was recorded.
    pub fn parse(&mut self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(source) => self.parse_source(path, &source),
            Err(err) => {
                self.diagnostics.push(Diagnostic {
                    kind:    DiagnosticKind::Structural,
                    file:    path.to_path_buf(),
                    line:    0,
                    column:  0,
                    message: format!("cannot read file: {}", err),
                });
                false
            }
        }
    }

    pub fn parse_source(&mut self, path: &Path, source: &str) -> bool {
        debug!(path = %path.display(), "parsing");
        let mark = self.module.types.len();
        let mut file = FileParser::new(self.options, self.module, self.diagnostics, path, source);
        file.parse_file();
        let ok = file.finish();
        if !ok {
            self.module.types.truncate(mark);
        }
        ok
    }
}

pub(crate) struct FileParser<'p> {
    options:       &'p Options,
    module:        &'p mut AstModule,
    diagnostics:   &'p mut Diagnostics,
    lexer:         Lexer,
    ast:           Ast,
    errors:        usize,
    sequenceables: Vec<(String, Ast)>,
}

pub(crate) fn position(token: &Token) -> Position {
    Position {
        line:   token.line,
        column: token.column,
    }
}

impl<'p> FileParser<'p> {
    fn new(
        options: &'p Options,
        module: &'p mut AstModule,
        diagnostics: &'p mut Diagnostics,
        path: &Path,
        source: &str,
    ) -> FileParser<'p> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_owned();
        let ast = Ast::new(
            AstKind::Types,
            &name,
            "",
            NamespaceId::ROOT,
            path.to_path_buf(),
            Version::default(),
        );
        FileParser {
            options,
            module,
            diagnostics,
            lexer: Lexer::new(source),
            ast,
            errors: 0,
            sequenceables: Vec::new(),
        }
    }

    fn path(&self) -> PathBuf {
        self.ast.file_path.clone()
    }

    // ----- diagnostics -----

    pub(crate) fn error(&mut self, kind: DiagnosticKind, pos: Position, message: String) {
        self.errors += 1;
        let file = self.path();
        self.diagnostics.push(Diagnostic {
            kind,
            file,
            line: pos.line,
            column: pos.column,
            message,
        });
    }

    pub(crate) fn semantic(&mut self, pos: Position, message: String) {
        self.error(DiagnosticKind::Semantic, pos, message);
    }

    /// Reports `token` where `expected` should have been. Unknown characters
    /// are reported as lexical errors.
    pub(crate) fn unexpected(&mut self, token: &Token, expected: &str) -> Recover {
        if token.is(TokenKind::Unknown) {
            let message = if token.text.starts_with("/*") {
                "unterminated block comment".to_owned()
            } else {
                format!("unrecognized character {}", quote(&token.text))
            };
            self.error(DiagnosticKind::Lexical, position(token), message);
        } else {
            self.error(
                DiagnosticKind::Syntax,
                position(token),
                format!("expected {} but found {}", expected, token),
            );
        }
        Recover
    }

    // ----- tokens -----

    pub(crate) fn peek(&mut self) -> &Token {
        self.lexer.peek(true)
    }

    pub(crate) fn peek_kind(&mut self) -> TokenKind {
        self.lexer.peek(true).kind
    }

    pub(crate) fn next(&mut self) -> Token {
        self.lexer.next(true)
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.next();
            true
        } else {
            false
        }
    }

    /// Consumes a token of `kind` or reports it. The offending token stays put.
    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<Token> {
        if self.peek_kind() == kind {
            Ok(self.next())
        } else {
            let token = self.peek().clone();
            Err(self.unexpected(&token, expected))
        }
    }

    /// `ident ( '.' ident )*`
    pub(crate) fn qualified_name(&mut self, expected: &str) -> PResult<(String, Position)> {
        let first = self.expect(TokenKind::Identifier, expected)?;
        let mut name = first.text.clone();
        while self.eat(TokenKind::Dot) {
            let segment = self.expect(TokenKind::Identifier, "an identifier after \".\"")?;
            name.push('.');
            name.push_str(&segment.text);
        }
        Ok((name, position(&first)))
    }

    // ----- recovery -----

    /// Skips past the next `;`, or up to a `}` or declaration keyword.
    pub(crate) fn recover_statement(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof | TokenKind::BraceClose => return,
                kind if kind.starts_declaration() => return,
                TokenKind::Semicolon => {
                    self.next();
                    return;
                }
                _ => {
                    self.next();
                }
            }
        }
    }

    /// Skips the rest of a declaration, including any braced body.
    pub(crate) fn recover_declaration(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                kind if depth == 0 && (kind.starts_declaration() || kind == TokenKind::BracketOpen) => {
                    return
                }
                TokenKind::BraceOpen => {
                    depth += 1;
                    self.next();
                }
                TokenKind::BraceClose => {
                    self.next();
                    if depth <= 1 {
                        self.eat(TokenKind::Semicolon);
                        return;
                    }
                    depth -= 1;
                }
                _ => {
                    self.next();
                }
            }
        }
    }

    // ----- file structure -----

    fn parse_file(&mut self) {
        self.parse_license();
        if self.parse_package_decl().is_err() {
            return;
        }

        loop {
            let result = match self.peek_kind() {
                TokenKind::Import => self.parse_import(),
                TokenKind::Sequenceable => self.parse_sequenceable(),
                _ => break,
            };
            if result.is_err() {
                self.recover_statement();
            }
        }

        while self.peek_kind() != TokenKind::Eof {
            if self.parse_declaration().is_err() {
                self.recover_declaration();
            }
        }
    }

    /// A block comment in front of `package` is carried into generated files.
    fn parse_license(&mut self) {
        loop {
            let token = self.lexer.peek(false);
            match token.kind {
                TokenKind::BlockComment => {
                    let text = token.text.clone();
                    self.lexer.next(false);
                    if self.ast.license.is_none() {
                        self.ast.license = Some(text);
                    }
                }
                TokenKind::LineComment => {
                    self.lexer.next(false);
                }
                _ => return,
            }
        }
    }

    fn parse_package_decl(&mut self) -> PResult<()> {
        self.expect(TokenKind::Package, "\"package\"")?;
        let (package, pos) = self.qualified_name("a package name")?;
        self.expect(TokenKind::Semicolon, "\";\"")?;

        match parse_package(&package) {
            Ok(version) => self.ast.version = version,
            Err(message) => self.semantic(pos, message),
        }
        if let Err(message) = self.options.check_package_path(&package, &self.ast.file_path) {
            self.semantic(pos, message);
        }
        self.ast.namespace = self.module.namespaces.intern(&package);
        self.ast.package = package;
        Ok(())
    }

    fn parse_import(&mut self) -> PResult<()> {
        self.expect(TokenKind::Import, "\"import\"")?;
        let (full_name, pos) = self.qualified_name("an imported unit name")?;
        self.expect(TokenKind::Semicolon, "\";\"")?;

        if self.ast.imports.contains_key(&full_name) {
            self.semantic(pos, format!("{} is imported twice", quote(&full_name)));
            return Ok(());
        }
        let id = match self.module.find(&full_name) {
            Some(id) => id,
            None => {
                self.semantic(pos, format!("imported unit {} has not been compiled", quote(&full_name)));
                return Ok(());
            }
        };

        let imported = self.module.get(id);
        let definitions = imported.type_definitions.clone();
        let interface = imported.interface;
        for ty in definitions {
            if let Some(key) = self.named_key(ty) {
                self.ast.register(key, ty);
            }
        }
        if let Some(ty) = interface {
            if let TypeKind::Interface(interface) = self.module.types.get_mut(ty) {
                interface.serializable = true;
            }
            if let Some(key) = self.named_key(ty) {
                self.ast.register(key, ty);
            }
        }
        self.ast.imports.insert(full_name, id);
        Ok(())
    }

    fn parse_sequenceable(&mut self) -> PResult<()> {
        self.expect(TokenKind::Sequenceable, "\"sequenceable\"")?;
        let (full_name, pos) = self.qualified_name("a sequenceable name")?;
        self.expect(TokenKind::Semicolon, "\";\"")?;

        let (package, name) = match split_full_name(&full_name) {
            Some(parts) => parts,
            None => {
                self.semantic(pos, format!("sequenceable {} needs a package", quote(&full_name)));
                return Ok(());
            }
        };
        if self.ast.imports.contains_key(&full_name)
            || self.sequenceables.iter().any(|(n, _)| *n == full_name)
        {
            self.semantic(pos, format!("{} is imported twice", quote(&full_name)));
            return Ok(());
        }

        let namespace = self.module.namespaces.intern(package);
        let key = TypeKey::Named {
            namespace,
            name: name.to_owned(),
        };
        if let Some(id) = self.module.find(&full_name) {
            let existing = self.module.get(id);
            if let Some(&ty) = existing.types.get(&key) {
                self.ast.register(key, ty);
                self.ast.imports.insert(full_name, id);
                return Ok(());
            }
        }

        let ty = self.module.types.alloc(TypeKind::Sequenceable(SequenceableType {
            name: name.to_owned(),
            namespace,
        }));
        let mut unit = Ast::new(
            AstKind::Sequenceable,
            name,
            package,
            namespace,
            self.ast.file_path.clone(),
            Version::default(),
        );
        unit.register(key.clone(), ty);
        unit.type_definitions.push(ty);
        self.ast.register(key, ty);
        self.sequenceables.push((full_name, unit));
        Ok(())
    }

    fn parse_declaration(&mut self) -> PResult<()> {
        let (attrs, attrs_pos) = if self.peek_kind() == TokenKind::BracketOpen {
            self.parse_attributes()?
        } else {
            (Attributes::default(), position(self.peek()))
        };

        let token = self.peek().clone();
        match token.kind {
            TokenKind::Enum => self.parse_enum(attrs, attrs_pos),
            TokenKind::Struct => self.parse_struct(attrs, attrs_pos, false),
            TokenKind::Union => self.parse_struct(attrs, attrs_pos, true),
            TokenKind::Interface => self.parse_interface(attrs),
            TokenKind::Package | TokenKind::Import | TokenKind::Sequenceable => {
                self.error(
                    DiagnosticKind::Syntax,
                    position(&token),
                    format!("{} must come before every declaration", token),
                );
                self.next();
                self.recover_statement();
                Ok(())
            }
            _ => Err(self.unexpected(&token, "a declaration")),
        }
    }

    /// `[a, b, ...]` in front of a declaration or method.
    pub(crate) fn parse_attributes(&mut self) -> PResult<(Attributes, Position)> {
        let open = self.expect(TokenKind::BracketOpen, "\"[\"")?;
        let mut attrs = Attributes::default();
        loop {
            let token = self.next();
            let slot = match token.kind {
                TokenKind::Oneway => Some(&mut attrs.oneway),
                TokenKind::Callback => Some(&mut attrs.callback),
                TokenKind::Full => Some(&mut attrs.full),
                TokenKind::Lite => Some(&mut attrs.lite),
                TokenKind::Identifier | TokenKind::In | TokenKind::Out => None,
                _ => return Err(self.unexpected(&token, "an attribute")),
            };
            match slot {
                Some(flag) if *flag => {
                    self.semantic(position(&token), format!("attribute {} is repeated", token));
                }
                Some(flag) => *flag = true,
                None => self.semantic(position(&token), format!("unknown attribute {}", token)),
            }

            let token = self.next();
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::BracketClose => break,
                _ => return Err(self.unexpected(&token, "\",\" or \"]\"")),
            }
        }
        if attrs.full && attrs.lite {
            self.semantic(position(&open), "attributes \"full\" and \"lite\" are mutually exclusive".to_owned());
        }
        Ok((attrs, position(&open)))
    }

    /// Key under which a named node is registered in unit tables.
    pub(crate) fn named_key(&self, ty: TypeId) -> Option<TypeKey> {
        let kind = self.module.types.get(ty);
        Some(TypeKey::Named {
            namespace: kind.namespace()?,
            name:      kind.name()?.to_owned(),
        })
    }

    // ----- completion -----

    fn finish(mut self) -> bool {
        let file_pos = Position { line: 1, column: 1 };
        let interface = self.ast.interface;
        match interface {
            Some(ty) => {
                let callback = self
                    .module
                    .types
                    .as_interface(ty)
                    .map_or(false, |interface| interface.is_callback());
                self.ast.kind = if callback { AstKind::Callback } else { AstKind::Interface };
                if !self.ast.type_definitions.is_empty() {
                    self.error(
                        DiagnosticKind::Structural,
                        file_pos,
                        "an interface file cannot declare custom types, move them to a types file".to_owned(),
                    );
                }
            }
            None => {
                self.ast.kind = AstKind::Types;
                if self.ast.type_definitions.is_empty() && self.errors == 0 {
                    self.error(
                        DiagnosticKind::Structural,
                        file_pos,
                        "the file declares neither an interface nor any custom type".to_owned(),
                    );
                }
            }
        }

        if self.errors == 0 {
            let verified = verify_ast(&self.module.types, &self.ast, self.diagnostics);
            if !verified {
                self.errors += 1;
            }
        }
        if self.errors > 0 {
            debug!(unit = %self.ast.full_name(), errors = self.errors, "unit rejected");
            return false;
        }

        for (full_name, unit) in std::mem::take(&mut self.sequenceables) {
            let namespace = unit.namespace;
            let ty = unit.type_definitions.first().copied();
            let id = self.module.add(unit);
            if let Some(ty) = ty {
                self.module.namespaces.add_sequenceable(namespace, ty);
            }
            self.ast.imports.insert(full_name, id);
        }
        if let Some(ty) = self.ast.interface {
            self.module.namespaces.add_interface(self.ast.namespace, ty);
        }

        debug!(unit = %self.ast.full_name(), kind = ?self.ast.kind, types = self.ast.type_definitions.len(), "unit compiled");
        self.module.add(self.ast);
        true
    }
}

#[cfg(test)]
mod tests;
