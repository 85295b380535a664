use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::{
    error::{HdiError, Result},
    package::{has_prefix, package_to_path, split_full_name},
    utils::quote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Language {
    C,
    Cpp,
    Java,
}

impl Language {
    /// Folds the three mutually exclusive `--gen-*` switches into one choice.
    pub fn from_flags(c: bool, cpp: bool, java: bool) -> Result<Option<Language>> {
        let chosen: Vec<Language> = [(c, Language::C), (cpp, Language::Cpp), (java, Language::Java)]
            .iter()
            .filter(|(set, _)| *set)
            .map(|&(_, language)| language)
            .collect();
        match chosen.as_slice() {
            [] => Ok(None),
            [language] => Ok(Some(*language)),
            _ => Err(HdiError::Options(
                "only one of --gen-c, --gen-cpp and --gen-java may be given".to_owned(),
            )),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Java => "Java",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BuildTarget {
    Client,
    Server,
    #[default]
    All,
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "client" => Ok(BuildTarget::Client),
            "server" => Ok(BuildTarget::Server),
            "all" => Ok(BuildTarget::All),
            other => Err(format!(
                "unknown build target {}, expected client, server or all",
                quote(other)
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DumpFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for DumpFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(DumpFormat::Text),
            "json" => Ok(DumpFormat::Json),
            other => Err(format!("unknown dump format {}, expected text or json", quote(other))),
        }
    }
}

/// A `-r <package>:<path>` mapping from a package prefix to a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRoot {
    pub package: String,
    pub path:    PathBuf,
}

impl FromStr for PackageRoot {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (package, path) = s
            .split_once(':')
            .ok_or_else(|| format!("root mapping {} must look like <package>:<path>", quote(s)))?;
        let valid_package = !package.is_empty()
            && package
                .split('.')
                .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        if !valid_package {
            return Err(format!("invalid package {} in root mapping", quote(package)));
        }
        if path.is_empty() {
            return Err(format!("root mapping {} has an empty path", quote(s)));
        }
        Ok(PackageRoot {
            package: package.to_owned(),
            path:    PathBuf::from(path),
        })
    }
}

/// Everything one compiler run needs to know, built once and passed by reference.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Options {
    pub sources:      Vec<PathBuf>,
    pub out_dir:      Option<PathBuf>,
    pub roots:        Vec<PackageRoot>,
    pub language:     Option<Language>,
    pub kernel:       bool,
    pub build_target: BuildTarget,
    pub module_name:  Option<String>,
    pub gen_hash:     bool,
    pub dump_ast:     bool,
    pub dump_format:  DumpFormat,
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(HdiError::Options("no source files given".to_owned()));
        }
        if self.gen_hash {
            return Ok(());
        }

        for (i, root) in self.roots.iter().enumerate() {
            if self.roots[..i].iter().any(|r| r.package == root.package) {
                return Err(HdiError::Options(format!(
                    "package {} is mapped more than once",
                    quote(&root.package)
                )));
            }
        }

        match self.language {
            None if self.out_dir.is_some() || !self.dump_ast => {
                return Err(HdiError::Options(
                    "one of --gen-c, --gen-cpp or --gen-java is required".to_owned(),
                ));
            }
            Some(language) if self.kernel && language != Language::C => {
                return Err(HdiError::Options(format!(
                    "--kernel is only supported for C, not {}",
                    language
                )));
            }
            Some(Language::Java) if self.build_target == BuildTarget::Server => {
                return Err(HdiError::Options(
                    "Java generation only supports the client build target".to_owned(),
                ));
            }
            _ => {}
        }

        if self.language.is_some() && self.out_dir.is_none() && !self.dump_ast {
            return Err(HdiError::Options("an output directory (-d) is required".to_owned()));
        }
        if let Some(name) = &self.module_name {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(HdiError::Options(format!("invalid module name {}", quote(name))));
            }
        }
        Ok(())
    }

    pub fn is_kernel_c(&self) -> bool {
        self.kernel && self.language == Some(Language::C)
    }

    /// Whether generation is requested at all (as opposed to a dump-only run).
    pub fn generates(&self) -> bool {
        self.language.is_some() && self.out_dir.is_some()
    }

    /// The mapping with the longest package prefix covering `package`.
    pub fn root_for(&self, package: &str) -> Option<&PackageRoot> {
        self.roots
            .iter()
            .filter(|root| has_prefix(package, &root.package))
            .max_by_key(|root| root.package.len())
    }

    /// Package segments below the mapped root, as a relative path.
    fn relative_dir(package: &str, root: &PackageRoot) -> PathBuf {
        let rest = package[root.package.len()..].trim_start_matches('.');
        package_to_path(rest)
    }

    pub fn package_dir(&self, package: &str) -> Option<PathBuf> {
        let root = self.root_for(package)?;
        Some(root.path.join(Self::relative_dir(package, root)))
    }

    /// File that holds the unit `a.b.v1_0.IFoo`.
    pub fn import_path(&self, full_name: &str) -> Result<PathBuf> {
        let (package, name) = split_full_name(full_name)
            .ok_or_else(|| HdiError::Resolve(format!("invalid import {}", quote(full_name))))?;
        let dir = self.package_dir(package).ok_or_else(|| {
            HdiError::Resolve(format!(
                "no root mapping (-r) covers package {} of import {}",
                quote(package),
                quote(full_name)
            ))
        })?;
        Ok(dir.join(format!("{}.idl", name)))
    }

    /// Checks that `file` sits in the directory its package maps to. Runs
    /// without any root mappings accept every location.
    pub fn check_package_path(&self, package: &str, file: &Path) -> std::result::Result<(), String> {
        if self.roots.is_empty() {
            return Ok(());
        }
        let root = self
            .root_for(package)
            .ok_or_else(|| format!("no root mapping (-r) covers package {}", quote(package)))?;
        let expected = Self::relative_dir(package, root);
        let parent = file.parent().unwrap_or_else(|| Path::new(""));
        if parent.ends_with(&expected) {
            Ok(())
        } else {
            Err(format!(
                "package {} does not match the file path {}, expected it under {}",
                quote(package),
                quote(&file.display().to_string()),
                quote(&root.path.join(&expected).display().to_string())
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with_roots(roots: &[&str]) -> Options {
        Options {
            sources: vec![PathBuf::from("ISample.idl")],
            roots: roots.iter().map(|r| r.parse().unwrap()).collect(),
            ..Options::default()
        }
    }

    #[test]
    fn parse_root_mapping() {
        let root: PackageRoot = "ohos.hdi:./idl".parse().unwrap();
        assert_eq!(root.package, "ohos.hdi");
        assert_eq!(root.path, PathBuf::from("./idl"));

        assert!("ohos.hdi".parse::<PackageRoot>().is_err());
        assert!("ohos..hdi:./idl".parse::<PackageRoot>().is_err());
        assert!("ohos.hdi:".parse::<PackageRoot>().is_err());
    }

    #[test]
    fn longest_prefix_wins() {
        let options = options_with_roots(&["ohos.hdi:/a", "ohos.hdi.foo:/b"]);
        assert_eq!(options.package_dir("ohos.hdi.bar.v1_0"), Some(PathBuf::from("/a/bar/v1_0")));
        assert_eq!(options.package_dir("ohos.hdi.foo.v1_0"), Some(PathBuf::from("/b/v1_0")));
        assert_eq!(options.package_dir("vendor.x.v1_0"), None);
        assert_eq!(
            options.import_path("ohos.hdi.foo.v1_0.IFoo").unwrap(),
            PathBuf::from("/b/v1_0/IFoo.idl")
        );
        assert!(options.import_path("vendor.x.v1_0.IFoo").is_err());
    }

    #[test]
    fn package_path_check() {
        let options = options_with_roots(&["ohos.hdi:/idl"]);
        assert!(options
            .check_package_path("ohos.hdi.sample.v1_0", Path::new("/idl/sample/v1_0/ISample.idl"))
            .is_ok());
        assert!(options
            .check_package_path("ohos.hdi.sample.v1_0", Path::new("/idl/other/v1_0/ISample.idl"))
            .is_err());
        assert!(Options::default()
            .check_package_path("ohos.hdi.sample.v1_0", Path::new("anywhere/ISample.idl"))
            .is_ok());
    }

    #[test]
    fn validation() {
        let mut options = options_with_roots(&["ohos.hdi:/idl"]);
        assert!(options.validate().is_err());

        options.language = Some(Language::C);
        options.out_dir = Some(PathBuf::from("out"));
        assert!(options.validate().is_ok());

        options.language = Some(Language::Cpp);
        options.kernel = true;
        assert!(options.validate().is_err());

        options.kernel = false;
        options.language = Some(Language::Java);
        options.build_target = BuildTarget::Server;
        assert!(options.validate().is_err());

        options.build_target = BuildTarget::Client;
        assert!(options.validate().is_ok());

        options.roots.push("ohos.hdi:/other".parse().unwrap());
        assert!(options.validate().is_err());
    }

    #[test]
    fn dump_only_needs_no_language() {
        let options = Options {
            sources: vec![PathBuf::from("ISample.idl")],
            dump_ast: true,
            ..Options::default()
        };
        assert!(options.validate().is_ok());
        assert!(!options.generates());
    }

    #[test]
    fn language_flags() {
        assert_eq!(Language::from_flags(false, true, false).unwrap(), Some(Language::Cpp));
        assert_eq!(Language::from_flags(false, false, false).unwrap(), None);
        assert!(Language::from_flags(true, false, true).is_err());
    }
}
