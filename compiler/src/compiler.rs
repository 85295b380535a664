//! One compiler run, stage by stage: resolve, parse, dump, generate.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{
    ast::{
        dump::{dump_json, dump_text},
        AstKind,
        AstModule,
    },
    codegen::CodeGenerator,
    error::{Diagnostics, HdiError, Result},
    options::{DumpFormat, Options},
    package::has_prefix,
    parser::Parser,
    resolver::ModuleResolver,
};

/// Hex SHA-256 of a file's bytes.
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| HdiError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// `<path>:<hash>` for every source file, in the order given.
pub fn gen_hashes(options: &Options) -> Result<Vec<String>> {
    options
        .sources
        .iter()
        .map(|path| Ok(format!("{}:{}", path.display(), hash_file(path)?)))
        .collect()
}

/// Resolves the sources and everything they import, then parses each unit in
/// dependency order. Every recoverable error of every file is collected; if
/// there is any, the whole module is rejected.
pub fn compile(options: &Options) -> Result<AstModule> {
    let mut resolver = ModuleResolver::new(options);
    let order = resolver.resolve(&options.sources)?;
    info!(units = order.len(), "resolved compile order");

    let mut module = AstModule::new();
    let mut diagnostics = Diagnostics::new();
    {
        let mut parser = Parser::new(options, &mut module, &mut diagnostics);
        for path in &order {
            if !parser.parse(path) {
                debug!(path = %path.display(), "unit rejected");
            }
        }
    }

    if !diagnostics.is_empty() {
        return Err(HdiError::Compile(diagnostics));
    }
    for root in &options.roots {
        if !module.iter().any(|ast| has_prefix(&ast.package, &root.package)) {
            warn!(package = %root.package, "root mapping matched no compiled unit");
        }
    }
    info!(units = module.len(), "compiled");
    Ok(module)
}

/// Dump of every compiled unit in the requested format.
pub fn dump(options: &Options, module: &AstModule) -> Result<String> {
    match options.dump_format {
        DumpFormat::Json => dump_json(module),
        DumpFormat::Text => Ok(module
            .iter()
            .filter(|ast| ast.kind != AstKind::Sequenceable)
            .map(|ast| dump_text(module, ast))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// What a full run produced, for the caller to report.
#[derive(Debug, Default)]
pub struct RunOutput {
    pub hashes:  Vec<String>,
    pub dump:    Option<String>,
    pub written: Vec<PathBuf>,
}

/// Validates the options and runs every requested stage. Nothing is written
/// unless the whole module compiled cleanly.
pub fn run(options: &Options) -> Result<RunOutput> {
    options.validate()?;

    if options.gen_hash {
        return Ok(RunOutput {
            hashes: gen_hashes(options)?,
            ..RunOutput::default()
        });
    }

    let module = compile(options)?;
    let mut output = RunOutput::default();
    if options.dump_ast {
        output.dump = Some(dump(options, &module)?);
    }
    if options.generates() {
        output.written = CodeGenerator::new(options, &module).generate()?;
        info!(files = output.written.len(), "generated");
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_is_sha256_hex() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(
            hash_file(file.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = hash_file(Path::new("/nonexistent/ISample.idl")).unwrap_err();
        assert!(matches!(err, HdiError::Read { .. }));
    }
}
