//! Schema Manifest
//!
//! This is a rust implementation of the `xsd-config.toml` manifest format.
//! The manifest declares all XML-Schema modules of a source tree, as well as
//! the toolchain used to compile them.

use serde;
use toml;

/// Manifest Errors
///
/// Errors raised while reading or parsing a manifest. Note that errors in
/// individual module declarations are not reported here, but only once the
/// module is turned into a descriptor (see `crate::descriptor`). This keeps
/// one broken module from hiding all its siblings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the manifest at the specified path failed.
    #[error("cannot read manifest {0:?}: {1}")]
    Read(std::ffi::OsString, std::io::Error),
    /// The manifest is not valid TOML or does not match the manifest types.
    #[error("cannot parse manifest: {0}")]
    Syntax(#[from] toml::de::Error),
    /// The manifest declares an unsupported format version.
    #[error("unsupported manifest version {0}")]
    Version(u32),
    /// The specified toolchain key has an invalid value.
    #[error("invalid toolchain key '{0}'")]
    Toolchain(&'static str),
}

/// Raw Manifest Toolchain Table
///
/// Sub-type of `Raw` representing the `toolchain` table. All keys are
/// optional and have defaults (see `ViewToolchain`).
#[derive(Default, serde::Deserialize)]
pub struct RawToolchain {
    /// Command used to invoke the schema compiler. Can contain arguments,
    /// separated by spaces.
    pub xsdc: Option<String>,
    /// Command used by generated build files to run `xsd-config compile`.
    pub driver: Option<String>,
    /// Root directory of all generated artifacts.
    pub gen_dir: Option<String>,
}

/// Raw Module Declaration
///
/// Sub-type of `Raw` representing a single `[[xsd_config]]` table. Field
/// names are the property names of the `xsd_config` module type. Nothing
/// beyond syntax is verified.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct RawXsdConfig {
    /// Name of the module. Must be unique in the manifest.
    pub name: String,
    /// Schema files of the module. Exactly one entry is required.
    #[serde(default)]
    pub srcs: Vec<String>,
    /// Auxiliary schema files included by the main schema.
    #[serde(default)]
    pub include_files: Vec<String>,
    /// Package name of the generated code.
    pub package_name: Option<String>,

    pub gen_writer: Option<bool>,
    pub enums_only: Option<bool>,
    pub parser_only: Option<bool>,
    pub boolean_getter: Option<bool>,
    pub tinyxml: Option<bool>,
    pub nullability: Option<bool>,
    pub gen_has: Option<bool>,

    /// Elements to restrict code generation to. Empty means all elements.
    #[serde(default)]
    pub root_elements: Vec<String>,
}

/// Raw Manifest Content
///
/// This type contains the raw manifest content as parsed by `toml` and
/// converted into rust types via `serde`.
///
/// Note that content of the type is not verified other than for syntactic
/// correctness required by the given types. Semantic correctness needs to
/// be verified by the caller.
#[derive(serde::Deserialize)]
pub struct Raw {
    /// Version of the manifest format. Only version `1` is currently
    /// supported.
    pub version: u32,

    /// Toolchain table specifying the commands and directories to use.
    pub toolchain: Option<RawToolchain>,
    /// Module declarations, in manifest order.
    #[serde(default)]
    pub xsd_config: Vec<RawXsdConfig>,
}

/// Toolchain View
///
/// A view of the toolchain table with all defaults applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewToolchain {
    pub xsdc: String,
    pub driver: String,
    pub gen_dir: Option<String>,
}

/// Manifest Abstraction
///
/// This type represents a valid and verified manifest. The manifest content
/// can be directly accessed via the `raw` field.
pub struct Manifest {
    /// Raw manifest content as parsed by the TOML module.
    pub raw: Raw,
}

// Check whether a string is a valid identifier
//
// This verifies that the given string consists of only alphanumeric
// characters plus `-`, `_`, `.`. Empty identifiers are rejected, and so are
// identifiers made of dots only, since they name relative directories.
pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|v| v != '.')
        && s.chars().all(
            |v| v.is_alphanumeric() || v == '-' || v == '_' || v == '.'
        )
}

// Check whether a string contains no quotes or escapes
//
// This verifies that a string does not contain quotes or backslashes, nor
// any control characters. Such strings can be put in quotes in generated
// build files without ambiguity.
pub(crate) fn is_quotable(s: &str) -> bool {
    s.chars().all(
        |v| !v.is_control()
            && v != '\\'
            && v != '\''
            && v != '"'
    )
}

// Check whether a string can be used verbatim as a path in shell commands
//
// On top of `is_quotable()` this rejects whitespace and `$`, which would
// split or expand the path in ninja and shell command lines.
pub(crate) fn is_plain_path(s: &str) -> bool {
    !s.is_empty() && is_quotable(s) && s.chars().all(
        |v| !v.is_whitespace() && v != '$'
    )
}

impl RawToolchain {
    /// Return the toolchain view
    ///
    /// Apply defaults to all missing keys. `xsdc` defaults to `xsdc`,
    /// `driver` defaults to `xsd-config`. `gen_dir` has no default here,
    /// since it depends on the output directory of the caller.
    pub fn view(&self) -> ViewToolchain {
        ViewToolchain {
            xsdc: self.xsdc.clone().unwrap_or_else(|| "xsdc".to_string()),
            driver: self.driver.clone().unwrap_or_else(|| "xsd-config".to_string()),
            gen_dir: self.gen_dir.clone(),
        }
    }
}

impl Raw {
    fn parse_toml(table: toml::Table) -> Result<Self, Error> {
        <Self as serde::Deserialize>::deserialize(table)
            .map_err(Error::Syntax)
    }

    fn parse_str(content: &str) -> Result<Self, Error> {
        content.parse::<toml::Table>()
            .map_err(Error::Syntax)
            .and_then(|v| Self::parse_toml(v))
    }

    /// Return the toolchain view
    ///
    /// Return the toolchain configuration with defaults applied, regardless
    /// of whether the manifest has a `toolchain` table.
    pub fn view_toolchain(&self) -> ViewToolchain {
        match self.toolchain.as_ref() {
            Some(v) => v.view(),
            None => RawToolchain::default().view(),
        }
    }

    /// Find matching module declaration
    ///
    /// Search the module declarations for the first entry with the
    /// specified name.
    pub fn module_by_name(&self, name: &str) -> Option<&RawXsdConfig> {
        self.xsd_config.iter().find(
            |v| v.name == name
        )
    }
}

impl Manifest {
    /// Parse manifest from raw
    ///
    /// Take a raw representation of the manifest and perform post-parsing
    /// validation of all manifest-global settings.
    fn parse_raw(raw: Raw) -> Result<Self, Error> {
        // We only support version '1'. Any other version number is explicitly
        // defined to be incompatible, so fail parsing.
        //
        // Note that we do support unknown-fields. Hence, it is valid to add
        // more fields to version '1' without breaking backwards compatibility.
        // However, they will be silently ignored by older implementations.
        if raw.version != 1 {
            return Err(Error::Version(raw.version));
        }

        if let Some(toolchain) = &raw.toolchain {
            // The compiler and driver commands are interpolated into quoted
            // shell arguments, so they must be non-empty and quotable.
            if let Some(v) = &toolchain.xsdc {
                if v.trim().is_empty() || !is_quotable(v) {
                    return Err(Error::Toolchain("xsdc"));
                }
            }
            if let Some(v) = &toolchain.driver {
                if v.trim().is_empty() || !is_quotable(v) {
                    return Err(Error::Toolchain("driver"));
                }
            }

            // The generation directory becomes a prefix of every output
            // path, so it must be a plain path.
            if let Some(v) = &toolchain.gen_dir {
                if !is_plain_path(v) {
                    return Err(Error::Toolchain("gen_dir"));
                }
            }
        }

        Ok(
            Self {
                raw: raw,
            }
        )
    }

    /// Parse manifest from string
    ///
    /// Parse the given string as a literal manifest in TOML representation.
    /// Content is verified and invalid manifests are refused.
    pub fn parse_str(content: &str) -> Result<Self, Error> {
        Raw::parse_str(content)
            .and_then(|v| Self::parse_raw(v))
    }

    /// Parse manifest from file-system
    ///
    /// Open the specified file and parse it as a manifest. The content is
    /// verified and invalid manifests are refused. The file is completely
    /// parsed into memory and then closed again before the function returns.
    pub fn parse_path(path: &std::path::Path) -> Result<Self, Error> {
        std::fs::read_to_string(path)
            .map_err(|v| Error::Read(path.as_os_str().to_os_string(), v))
            .and_then(|v| Self::parse_str(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify basic parsing of `Raw`
    //
    // Parse a minimal raw manifest into `Raw` to have a base-level test for
    // the parsing capabilities. Not complex content verification is done.
    #[test]
    fn raw_parse_minimal() {
        let s = "version = 1";

        let raw = Raw::parse_str(s).unwrap();
        assert!(raw.xsd_config.is_empty());
    }

    // Verify unknown versions in `Raw`
    //
    // Parse a high version number and verify that the raw content parser
    // does not care for its value other than syntactic correctness.
    #[test]
    fn raw_parse_unknown_version() {
        let s = "version = 12345678";

        Raw::parse_str(s).unwrap();
    }

    // Verify parsing of unknown manifest versions
    //
    // Parse an unknown manifest version and verify that the manifest correctly
    // refuses it as invalid.
    #[test]
    fn manifest_parse_unknown_version() {
        let s = "version = 2";

        assert!(matches!(Manifest::parse_str(s), Err(Error::Version(2))));
    }

    // Verify parsing of module declarations
    //
    // Parse two modules and verify all properties end up in the raw
    // declaration, and that missing properties stay unset.
    #[test]
    fn manifest_parse_modules() {
        let s = "
            version = 1
            [[xsd_config]]
            name = \"foo\"
            srcs = [\"foo.xsd\"]
            include_files = [\"foo.include.xsd\"]
            package_name = \"com.example.foo\"
            gen_writer = true
            tinyxml = false
            root_elements = [\"root_element\"]
            [[xsd_config]]
            name = \"bar\"
            srcs = [\"bar.xsd\", \"baz.xsd\"]
        ";

        let m = Manifest::parse_str(s).unwrap();

        assert_eq!(m.raw.xsd_config.len(), 2);

        let foo = m.raw.module_by_name("foo").unwrap();
        assert_eq!(foo.srcs, vec!["foo.xsd"]);
        assert_eq!(foo.include_files, vec!["foo.include.xsd"]);
        assert_eq!(foo.package_name.as_deref(), Some("com.example.foo"));
        assert_eq!(foo.gen_writer, Some(true));
        assert_eq!(foo.tinyxml, Some(false));
        assert_eq!(foo.nullability, None);
        assert_eq!(foo.root_elements, vec!["root_element"]);

        // Invalid module content is not refused at this level.
        let bar = m.raw.module_by_name("bar").unwrap();
        assert_eq!(bar.srcs.len(), 2);
        assert!(bar.package_name.is_none());
    }

    // Verify toolchain defaults and validation
    //
    // A missing toolchain table yields the default commands. Commands with
    // quotes are refused.
    #[test]
    fn manifest_parse_toolchain() {
        let m = Manifest::parse_str("version = 1").unwrap();
        let v = m.raw.view_toolchain();
        assert_eq!(v.xsdc, "xsdc");
        assert_eq!(v.driver, "xsd-config");
        assert_eq!(v.gen_dir, None);

        let s = "
            version = 1
            [toolchain]
            xsdc = \"java -jar xsdc.jar\"
            gen_dir = \"out/gen\"
        ";
        let v = Manifest::parse_str(s).unwrap().raw.view_toolchain();
        assert_eq!(v.xsdc, "java -jar xsdc.jar");
        assert_eq!(v.gen_dir.as_deref(), Some("out/gen"));

        let s = "
            version = 1
            [toolchain]
            xsdc = \"xs'dc\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Toolchain("xsdc"))));

        let s = "
            version = 1
            [toolchain]
            gen_dir = \"out dir\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Toolchain("gen_dir"))));
    }

    // Verify syntax errors are reported
    #[test]
    fn manifest_parse_syntax() {
        assert!(matches!(Manifest::parse_str("version = "), Err(Error::Syntax(_))));
        assert!(matches!(
            Manifest::parse_str("version = 1\n[[xsd_config]]\nsrcs = []\n"),
            Err(Error::Syntax(_)),
        ));
    }

    // Verify the string validators
    #[test]
    fn validators() {
        assert!(is_identifier("foo-bar_baz.1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("foo bar"));
        assert!(!is_identifier("."));
        assert!(!is_identifier(".."));
        assert!(is_identifier("..foo"));

        assert!(is_quotable("Foo Bar"));
        assert!(!is_quotable("Foo\"Bar"));
        assert!(!is_quotable("Foo\nBar"));

        assert!(is_plain_path("dir/foo.xsd"));
        assert!(!is_plain_path(""));
        assert!(!is_plain_path("dir/foo bar.xsd"));
        assert!(!is_plain_path("$dir/foo.xsd"));
    }
}
