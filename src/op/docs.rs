//! Documentation Module Derivation
//!
//! Every schema module gets a derived documentation module named
//! `<name>-docs`. It runs the documentation extractor on the Java sources of
//! the schema module and checks the extracted API surface against the
//! `api/` text files next to the schema.
//!
//! The derived module is documentation only. It is never installed and never
//! links the framework libraries.

/// Diagnostics hidden by the documentation extractor
///
/// Generated schema bindings trigger these diagnostics by construction. The
/// order is part of the generated arguments and must be kept stable.
pub const HIDDEN_DIAGNOSTICS: [&str; 9] = [
    "MissingPermission",
    "BroadcastBehavior",
    "HiddenSuperclass",
    "DeprecationMismatch",
    "UnavailableSymbol",
    "SdkConstant",
    "HiddenTypeParameter",
    "Todo",
    "Typo",
];

pub const API_FILE: &str = "api/current.txt";
pub const REMOVED_API_FILE: &str = "api/removed.txt";
pub const LAST_RELEASED_API_FILE: &str = "api/last_current.txt";
pub const LAST_RELEASED_REMOVED_API_FILE: &str = "api/last_removed.txt";

/// API Files
///
/// A pair of API surface files to check against.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ApiToCheck {
    pub api_file: String,
    pub removed_api_file: String,
}

/// API Checks
///
/// The API surfaces the extracted API is checked against: the current one,
/// and the last released one.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CheckApi {
    pub current: ApiToCheck,
    pub last_released: ApiToCheck,
}

/// Documentation Module
///
/// The configuration of a derived documentation module, in the form the
/// documentation extractor consumes it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct DocsModule {
    pub name: String,
    /// Input references. This is the Java output of the parent module.
    pub srcs: Vec<String>,
    /// Extra arguments for the documentation extractor.
    pub args: String,
    pub api_filename: String,
    pub removed_api_filename: String,
    pub check_api: CheckApi,
    pub installable: bool,
    pub no_framework_libs: bool,
}

/// Return the name of the documentation module of a schema module.
pub fn docs_module_name(name: &str) -> String {
    format!("{}-docs", name)
}

/// Return the name of the module a documentation module was derived from.
pub fn parent_name(docs: &DocsModule) -> Option<&str> {
    match docs.srcs.as_slice() {
        [v] => v.strip_prefix(':'),
        _ => None,
    }
}

/// Build the extractor arguments
///
/// Build `--stub-packages <package>` followed by one `--hide` per hidden
/// diagnostic. A missing package name is passed as empty string.
pub fn extractor_args(package_name: &str) -> String {
    let mut args = format!("--stub-packages {}", package_name);
    for v in HIDDEN_DIAGNOSTICS.iter() {
        args.push_str(" --hide ");
        args.push_str(v);
    }
    args
}

/// Derive the documentation module
///
/// Create the configuration of the documentation module of the given schema
/// module. This does not register the module anywhere (see
/// `crate::graph::Graph::derive_docs()`).
pub fn derive(descriptor: &crate::descriptor::Descriptor) -> DocsModule {
    DocsModule {
        name: docs_module_name(descriptor.name()),
        srcs: vec![format!(":{}", descriptor.name())],
        args: extractor_args(descriptor.package_name_or_empty()),
        api_filename: API_FILE.to_string(),
        removed_api_filename: REMOVED_API_FILE.to_string(),
        check_api: CheckApi {
            current: ApiToCheck {
                api_file: API_FILE.to_string(),
                removed_api_file: REMOVED_API_FILE.to_string(),
            },
            last_released: ApiToCheck {
                api_file: LAST_RELEASED_API_FILE.to_string(),
                removed_api_file: LAST_RELEASED_REMOVED_API_FILE.to_string(),
            },
        },
        installable: false,
        no_framework_libs: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;
    use crate::manifest::RawXsdConfig;

    fn descriptor(package_name: Option<&str>) -> Descriptor {
        Descriptor::from_raw(&RawXsdConfig {
            name: "foo".to_string(),
            srcs: vec!["foo.xsd".to_string()],
            package_name: package_name.map(|v| v.to_string()),
            ..Default::default()
        }).unwrap()
    }

    // Verify the derived module
    //
    // Name, inputs, API files and the fixed switches are derived from the
    // parent.
    #[test]
    fn derive_module() {
        let docs = derive(&descriptor(Some("com.example.foo")));

        assert_eq!(docs.name, "foo-docs");
        assert_eq!(docs.srcs, vec![":foo"]);
        assert_eq!(parent_name(&docs), Some("foo"));
        assert_eq!(docs.api_filename, "api/current.txt");
        assert_eq!(docs.removed_api_filename, "api/removed.txt");
        assert_eq!(docs.check_api.current.api_file, "api/current.txt");
        assert_eq!(docs.check_api.current.removed_api_file, "api/removed.txt");
        assert_eq!(docs.check_api.last_released.api_file, "api/last_current.txt");
        assert_eq!(docs.check_api.last_released.removed_api_file, "api/last_removed.txt");
        assert!(!docs.installable);
        assert!(docs.no_framework_libs);
    }

    // Verify the extractor arguments
    //
    // The package is followed by the hidden diagnostics in their fixed order.
    #[test]
    fn derive_args() {
        let docs = derive(&descriptor(Some("com.example.foo")));

        assert_eq!(
            docs.args,
            concat!(
                "--stub-packages com.example.foo",
                " --hide MissingPermission --hide BroadcastBehavior",
                " --hide HiddenSuperclass --hide DeprecationMismatch --hide UnavailableSymbol",
                " --hide SdkConstant --hide HiddenTypeParameter --hide Todo --hide Typo",
            ),
        );
        assert_eq!(docs.args.matches("--hide ").count(), 9);
    }

    // Verify missing package names
    //
    // A missing package name does not fail, but is passed as empty string.
    #[test]
    fn derive_without_package() {
        let docs = derive(&descriptor(None));

        assert!(docs.args.starts_with("--stub-packages  --hide MissingPermission"));
    }

    // Verify the JSON representation
    #[test]
    fn derive_serialize() {
        let docs = derive(&descriptor(Some("foo")));
        let v = serde_json::to_value(&docs).unwrap();

        assert_eq!(v["name"], "foo-docs");
        assert_eq!(v["installable"], false);
        assert_eq!(v["check_api"]["last_released"]["api_file"], "api/last_current.txt");
    }
}
