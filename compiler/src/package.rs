use std::fmt;
use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::utils::quote;

lazy_static! {
    static ref PACKAGE_NAME:    Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$").unwrap();
    static ref VERSION_SEGMENT: Regex = Regex::new(r"^[vV](\d+)_(\d+)$").unwrap();
}

/// Interface version carried by the last package segment (`v1_0`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Validates a package name and extracts its version.
pub fn parse_package(package: &str) -> Result<Version, String> {
    if !PACKAGE_NAME.is_match(package) {
        return Err(format!("invalid package name {}", quote(package)));
    }
    let last = package.rsplit('.').next().unwrap_or(package);
    let caps = VERSION_SEGMENT.captures(last).ok_or_else(|| {
        format!(
            "package {} must end with a version segment like \"v1_0\"",
            quote(package)
        )
    })?;
    let number = |index: usize| -> Result<u32, String> {
        caps[index]
            .parse::<u32>()
            .map_err(|_| format!("version number in {} is out of range", quote(package)))
    };
    Ok(Version {
        major: number(1)?,
        minor: number(2)?,
    })
}

/// Splits `a.b.v1_0.IFoo` into `("a.b.v1_0", "IFoo")`.
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (package, name) = full_name.rsplit_once('.')?;
    if package.is_empty() || name.is_empty() {
        return None;
    }
    Some((package, name))
}

/// `a.b.v1_0` -> `a/b/v1_0`.
pub fn package_to_path(package: &str) -> PathBuf {
    package.split('.').filter(|s| !s.is_empty()).collect()
}

/// True when `package` equals `prefix` or starts with `prefix` followed by a dot.
pub fn has_prefix(package: &str, prefix: &str) -> bool {
    package == prefix
        || (package.starts_with(prefix) && package.as_bytes().get(prefix.len()) == Some(&b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_versions() {
        assert_eq!(
            parse_package("ohos.hdi.sample.v1_0"),
            Ok(Version { major: 1, minor: 0 })
        );
        assert_eq!(
            parse_package("ohos.hdi.sample.V2_13"),
            Ok(Version { major: 2, minor: 13 })
        );
        assert!(parse_package("sample").is_err());
        assert!(parse_package("ohos.hdi.sample").is_err());
        assert!(parse_package("ohos..v1_0").is_err());
        assert!(parse_package("ohos.hdi.v1").is_err());
    }

    #[test]
    fn full_names() {
        assert_eq!(
            split_full_name("ohos.hdi.foo.v1_0.IFoo"),
            Some(("ohos.hdi.foo.v1_0", "IFoo"))
        );
        assert_eq!(split_full_name("IFoo"), None);
        assert_eq!(split_full_name("a."), None);
        assert_eq!(package_to_path("ohos.hdi.foo"), PathBuf::from("ohos/hdi/foo"));
    }

    #[test]
    fn prefixes_respect_segments() {
        assert!(has_prefix("ohos.hdi.foo", "ohos.hdi"));
        assert!(has_prefix("ohos.hdi", "ohos.hdi"));
        assert!(!has_prefix("ohos.hdifoo", "ohos.hdi"));
    }
}
