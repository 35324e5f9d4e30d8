//! XML-Schema Build Integration
//!
//! The xsd-config module integrates XML-Schema (`.xsd`) definitions into
//! multi-language builds. Schemas are compiled into Java and C++ sources by
//! the external schema compiler `xsdc`. This crate does not compile schemas
//! itself. It describes how a schema module is built, what it produces, and
//! how other modules can consume it.
//!
//! Model
//! -----
//!
//! Schema modules are declared in a TOML manifest, usually called
//! `xsd-config.toml`, as a list of `[[xsd_config]]` tables. Every declaration
//! is validated and turned into an immutable [descriptor](descriptor). The
//! descriptor is then handed to three independent consumers:
//!
//!  * The [artifact expander](op::expand) computes the generated artifacts
//!    (a Java source archive, C++ sources and headers) and the build actions
//!    that produce them.
//!
//!  * The [doc-module generator](op::docs) derives a documentation module
//!    that extracts the API surface of the generated Java code.
//!
//!  * The [target translator](op::translate) produces equivalent Bazel
//!    targets for the declarative build.
//!
//! The [module graph](graph) ties these together in two phases. First, all
//! primary modules are registered. Second, the derived documentation modules
//! are created, exactly once per primary module.
//!
//! Build Files
//! -----------
//!
//! The [generate](op::generate) operation writes three files into an output
//! directory:
//!
//!  * `build.ninja` with one build statement per action. The statements run
//!    `xsd-config compile` (see [compile](op::compile)), which stages the
//!    compiler output, packages it, and writes the dependency file.
//!
//!  * `modules.json` with all modules of the graph, including the derived
//!    documentation modules and the artifacts of every schema module.
//!
//!  * `BUILD.bazel` with the translated targets.
//!
//! The native files and the Bazel file are independent. A module that
//! cannot be expanded is still translated and still gets its documentation
//! module. Only invalid declarations are left out of all files.

pub mod descriptor;
pub mod graph;
pub mod manifest;
pub mod starlark;

/// Schema Operations
///
/// The `op` module is a collection of all operations that can be performed on
/// schema modules. Each operation is implemented in a submodule and can be
/// used independently.
pub mod op {
    pub mod compile;
    pub mod docs;
    pub mod expand;
    pub mod generate;
    pub mod translate;
}

/// Platform Conditions
///
/// The `platform` module defines the platforms that declarative targets can
/// select dependencies on.
pub mod platform {
    /// Condition matching all platforms not matched by any other branch.
    pub const DEFAULT_CONDITION: &str = "//conditions:default";

    /// Platform Identifier
    ///
    /// This enum is an enumeration of platforms that get dedicated branches
    /// in platform-dependent attributes. Use `as_str()` to get a static
    /// string-representation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Id {
        Android,
    }

    impl Id {
        /// Get string representation
        ///
        /// Return the string representation of the platform identifier.
        pub fn as_str(&self) -> &'static str {
            match self {
                Id::Android => "android",
            }
        }

        /// Get config setting
        ///
        /// Return the label of the Bazel config setting that matches the
        /// platform as operating system.
        pub fn config_setting(&self) -> String {
            format!("//build/bazel/platforms/os:{}", self.as_str())
        }
    }
}
