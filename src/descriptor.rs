//! Schema Module Descriptor
//!
//! A descriptor is the validated, immutable form of a single `xsd_config`
//! module declaration. It is created once from the raw manifest content and
//! then handed to all consumers: the artifact expander, the doc-module
//! generator, and the declarative-target translator.
//!
//! All validation happens when the descriptor is created. Consumers can rely
//! on the descriptor being well-formed and never have to re-check it.

/// Configuration Errors
///
/// Errors in the configuration of a single module. Each error names the
/// module, the offending property and the value that was received, so it can
/// be reported without any further context.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The property `field` of module `module` has the invalid value `value`.
    #[error("module '{module}': property '{field}' {reason}, got {value}")]
    Property {
        module: String,
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Error {
    fn property(
        module: &str,
        field: &'static str,
        value: String,
        reason: &'static str,
    ) -> Self {
        Self::Property {
            module: module.to_string(),
            field: field,
            value: value,
            reason: reason,
        }
    }

    /// Return the name of the offending property.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Property { field, .. } => *field,
        }
    }
}

/// Generation Flags
///
/// The boolean switches of a module. Unset switches are `false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    /// Generate writer code in addition to the parser.
    pub gen_writer: bool,
    /// Generate enumerations only (C++).
    pub enums_only: bool,
    /// Generate the parser only, without enumerations (C++).
    pub parser_only: bool,
    /// Use `isFoo()` rather than `getFoo()` for boolean accessors.
    pub boolean_getter: bool,
    /// Parse with `tinyxml2` rather than `libxml2` (C++).
    pub tinyxml: bool,
    /// Annotate accessors with nullability annotations (Java).
    pub nullability: bool,
    /// Generate `hasFoo()` accessors (Java).
    pub gen_has: bool,
}

/// Schema Module Descriptor
///
/// See the module documentation for details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    src: String,
    include_files: Vec<String>,
    package_name: Option<String>,
    flags: Flags,
    root_elements: Vec<String>,
}

// Check whether a string is a dot-separated list of Java identifiers.
fn is_package_name(s: &str) -> bool {
    s.split('.').all(
        |segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(c) if c.is_alphabetic() || c == '_' => {
                    chars.all(|c| c.is_alphanumeric() || c == '_')
                },
                _ => false,
            }
        }
    )
}

impl Descriptor {
    /// Create descriptor from raw module declaration
    ///
    /// Validate the raw declaration and create a descriptor from it. Any
    /// violation is reported as `Error::Property`, naming the field and the
    /// value that was received.
    pub fn from_raw(raw: &crate::manifest::RawXsdConfig) -> Result<Self, Error> {
        let name = raw.name.as_str();

        if !crate::manifest::is_identifier(name) {
            return Err(Error::property(
                name, "name", format!("{:?}", name),
                "must be a non-empty identifier",
            ));
        }

        // The module type compiles a single schema. Additional schemas have
        // to go into `include_files`. Never pick one of several sources.
        if raw.srcs.len() != 1 {
            return Err(Error::property(
                name, "srcs", format!("{:?}", raw.srcs),
                "must have exactly one source",
            ));
        }

        // Paths end up verbatim in ninja and shell command lines.
        if let Some(v) = raw.srcs.iter().find(|v| !crate::manifest::is_plain_path(v)) {
            return Err(Error::property(
                name, "srcs", format!("{:?}", v),
                "must be a path without whitespace, quotes or '$'",
            ));
        }
        if let Some(v) = raw.include_files.iter().find(|v| !crate::manifest::is_plain_path(v)) {
            return Err(Error::property(
                name, "include_files", format!("{:?}", v),
                "must be a path without whitespace, quotes or '$'",
            ));
        }

        if let Some(v) = &raw.package_name {
            if !is_package_name(v) {
                return Err(Error::property(
                    name, "package_name", format!("{:?}", v),
                    "must be a dot-separated package name",
                ));
            }
        }

        if let Some(v) = raw.root_elements.iter().find(
            |v| v.is_empty() || !crate::manifest::is_quotable(v)
        ) {
            return Err(Error::property(
                name, "root_elements", format!("{:?}", v),
                "must be a non-empty element name without quotes",
            ));
        }

        let flags = Flags {
            gen_writer: raw.gen_writer.unwrap_or(false),
            enums_only: raw.enums_only.unwrap_or(false),
            parser_only: raw.parser_only.unwrap_or(false),
            boolean_getter: raw.boolean_getter.unwrap_or(false),
            tinyxml: raw.tinyxml.unwrap_or(false),
            nullability: raw.nullability.unwrap_or(false),
            gen_has: raw.gen_has.unwrap_or(false),
        };

        // Enums-only skips the parser, parser-only skips the enums. Together
        // they would generate nothing.
        if flags.enums_only && flags.parser_only {
            return Err(Error::property(
                name, "parser_only", "true".to_string(),
                "conflicts with 'enums_only'",
            ));
        }

        // Root elements form a set. Keep the first occurrence of each so
        // the generated output does not depend on anything but the input.
        let mut root_elements: Vec<String> = Vec::with_capacity(raw.root_elements.len());
        for v in raw.root_elements.iter() {
            if !root_elements.contains(v) {
                root_elements.push(v.clone());
            }
        }

        Ok(
            Self {
                name: raw.name.clone(),
                src: raw.srcs[0].clone(),
                include_files: raw.include_files.clone(),
                package_name: raw.package_name.clone(),
                flags: flags,
                root_elements: root_elements,
            }
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the schema file of the module.
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn include_files(&self) -> &[String] {
        &self.include_files
    }

    /// Return the package name, if set.
    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_deref()
    }

    /// Return the package name or an empty string
    ///
    /// Consumers that do not require a package name use this to propagate a
    /// missing package name as empty string.
    pub fn package_name_or_empty(&self) -> &str {
        self.package_name().unwrap_or("")
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn root_elements(&self) -> &[String] {
        &self.root_elements
    }

    /// Iterate over all schema files
    ///
    /// Yield the main schema followed by all include files, in declaration
    /// order.
    pub fn schema_files(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.src.as_str())
            .chain(self.include_files.iter().map(|v| v.as_str()))
    }
}
