//! Code generation.
//!
//! [`CodeGenerator`] picks the artifacts each compiled unit needs from its
//! kind and the requested build target, hands them to the emitter of the
//! selected language and writes the results under
//! `<out>/<package path>/`.

mod c;
mod cpp;
mod java;
pub mod writer;

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::{
    ast::{Ast, AstKind, AstModule, InterfaceType, Method, TypeArena, TypeId},
    error::{HdiError, Result},
    options::{BuildTarget, Language, Options},
    package::package_to_path,
    utils::base_name,
};

use self::writer::CodeWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    CustomTypes,
    Interface,
    Proxy,
    Stub,
    Driver,
    ServiceImpl,
}

/// Artifacts a unit needs for `target`. Callbacks always get the served side
/// because the client that registers them hosts the implementation; they
/// have no driver of their own.
pub fn artifacts_for(kind: AstKind, target: BuildTarget) -> Vec<Artifact> {
    use Artifact::*;
    match (kind, target) {
        (AstKind::Types, _) => vec![CustomTypes],
        (AstKind::Sequenceable, _) => vec![],
        (AstKind::Callback, _) => vec![Interface, Proxy, Stub, ServiceImpl],
        (AstKind::Interface, BuildTarget::Client) => vec![Interface, Proxy],
        (AstKind::Interface, BuildTarget::Server) => vec![Interface, Driver, Stub, ServiceImpl],
        (AstKind::Interface, BuildTarget::All) => vec![Interface, Proxy, Driver, Stub, ServiceImpl],
    }
}

/// C and C++ spelling of an enum value. Values past `i64::MAX` only fit an
/// unsigned 64-bit base and need the suffix to stay a valid literal.
pub(crate) fn enum_literal(value: i128) -> String {
    if value > i64::MAX as i128 {
        format!("{}ULL", value)
    } else {
        value.to_string()
    }
}

/// One rendered file, named relative to its package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name:     String,
    pub contents: String,
}

/// Everything an emitter may look at while rendering one unit.
pub(crate) struct Context<'a> {
    pub options: &'a Options,
    pub module:  &'a AstModule,
    pub ast:     &'a Ast,
}

impl<'a> Context<'a> {
    pub fn types(&self) -> &'a TypeArena {
        &self.module.types
    }

    pub fn kernel(&self) -> bool {
        self.options.kernel
    }

    pub fn interface(&self) -> Result<&'a InterfaceType> {
        self.module
            .interface_of(self.ast)
            .ok_or_else(|| HdiError::Generate(format!("{} declares no interface", self.ast.full_name())))
    }

    /// `ISample` -> `Sample`.
    pub fn base(&self) -> &'a str {
        base_name(&self.ast.name)
    }

    /// Methods emitted in this build with their command ids. Ids are assigned
    /// over every declared method, so hiding `full` or `lite` methods never
    /// renumbers the rest.
    pub fn methods(&self) -> Result<Vec<(u32, &'a Method)>> {
        let kernel = self.kernel();
        Ok(self
            .interface()?
            .commands()
            .filter(|(_, method)| method.attrs.visible(kernel))
            .collect())
    }

    /// Custom types emitted in this build, in declaration order.
    pub fn custom_types(&self) -> Vec<TypeId> {
        let kernel = self.kernel();
        let types = self.types();
        self.ast
            .type_definitions
            .iter()
            .copied()
            .filter(|&id| types.get(id).attrs().visible(kernel))
            .collect()
    }

    /// Imported units that produce code of their own.
    pub fn imports(&self) -> impl Iterator<Item = &'a Ast> + 'a {
        let module = self.module;
        self.ast
            .imports
            .values()
            .map(move |&id| module.get(id))
            .filter(|ast| ast.kind != AstKind::Sequenceable)
    }

    /// Copies the unit's license comment to the top of a generated file.
    pub fn license(&self, w: &mut CodeWriter) {
        if let Some(license) = &self.ast.license {
            w.block(license);
            w.blank();
        }
    }
}

/// A language back end.
pub(crate) trait Emitter {
    /// Some languages only implement part of the artifact set.
    fn supports(&self, _artifact: Artifact) -> bool {
        true
    }

    fn emit(&self, ctx: &Context, artifact: Artifact) -> Result<Vec<GeneratedFile>>;
}

fn emitter_for(language: Language) -> Box<dyn Emitter> {
    match language {
        Language::C => Box::new(c::CEmitter),
        Language::Cpp => Box::new(cpp::CppEmitter),
        Language::Java => Box::new(java::JavaEmitter),
    }
}

pub struct CodeGenerator<'a> {
    options: &'a Options,
    module:  &'a AstModule,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(options: &'a Options, module: &'a AstModule) -> CodeGenerator<'a> {
        CodeGenerator { options, module }
    }

    fn language(&self) -> Result<Language> {
        self.options
            .language
            .ok_or_else(|| HdiError::Options("no target language selected".to_owned()))
    }

    /// An interface marked `lite` only exists in kernel builds, one marked
    /// `full` only in user builds.
    fn visible(&self, ast: &Ast) -> bool {
        self.module
            .interface_of(ast)
            .map_or(true, |interface| interface.attrs.visible(self.options.kernel))
    }

    /// Renders every artifact of one unit without touching the disk.
    pub fn render(&self, ast: &Ast) -> Result<Vec<GeneratedFile>> {
        let emitter = emitter_for(self.language()?);
        if !self.visible(ast) {
            debug!(unit = %ast.full_name(), "hidden in this build");
            return Ok(Vec::new());
        }
        let ctx = Context {
            options: self.options,
            module:  self.module,
            ast,
        };
        let mut files = Vec::new();
        for artifact in artifacts_for(ast.kind, self.options.build_target) {
            if !emitter.supports(artifact) {
                continue;
            }
            debug!(unit = %ast.full_name(), ?artifact, "emitting");
            files.extend(emitter.emit(&ctx, artifact)?);
        }
        Ok(files)
    }

    /// Renders and writes every unit of the module. Returns the written paths.
    pub fn generate(&self) -> Result<Vec<PathBuf>> {
        let out_dir = self
            .options
            .out_dir
            .as_ref()
            .ok_or_else(|| HdiError::Options("no output directory given (-d)".to_owned()))?;

        let mut written = Vec::new();
        for ast in self.module.iter() {
            let files = self.render(ast)?;
            if files.is_empty() {
                continue;
            }
            let dir = out_dir.join(package_to_path(&ast.package));
            fs::create_dir_all(&dir).map_err(|source| HdiError::Write {
                path: dir.clone(),
                source,
            })?;
            for file in files {
                let path = dir.join(&file.name);
                fs::write(&path, file.contents).map_err(|source| HdiError::Write {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), "wrote");
                written.push(path);
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_selection() {
        use Artifact::*;
        assert_eq!(artifacts_for(AstKind::Types, BuildTarget::Server), [CustomTypes]);
        assert_eq!(artifacts_for(AstKind::Interface, BuildTarget::Client), [Interface, Proxy]);
        assert_eq!(
            artifacts_for(AstKind::Interface, BuildTarget::Server),
            [Interface, Driver, Stub, ServiceImpl]
        );
        assert_eq!(
            artifacts_for(AstKind::Callback, BuildTarget::Client),
            artifacts_for(AstKind::Callback, BuildTarget::Server)
        );
        assert!(artifacts_for(AstKind::Sequenceable, BuildTarget::All).is_empty());
    }

    #[test]
    fn wide_enum_values_get_an_unsigned_suffix() {
        assert_eq!(enum_literal(-1), "-1");
        assert_eq!(enum_literal(i64::MAX as i128), "9223372036854775807");
        assert_eq!(enum_literal(u64::MAX as i128), "18446744073709551615ULL");
    }
}
