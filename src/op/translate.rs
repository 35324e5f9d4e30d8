//! Declarative Target Translation
//!
//! Translate a schema module into equivalent Bazel targets. Every module
//! yields three targets:
//!
//!  * `filegroup` named `<name>`, exporting the schema and its includes,
//!  * `cc_xsd_config_library` named `<name>-cpp`,
//!  * `java_xsd_config_library` named `<name>-java`.
//!
//! Translation is a pure function of the descriptor. Since the descriptor is
//! validated on creation, translation cannot fail and either yields all three
//! targets or is never run.

use crate::starlark::{Label, Rule, Value};

const CC_LOAD: &str = "//build/bazel/rules/cc:cc_xsd_config_library.bzl";
const JAVA_LOAD: &str = "//build/bazel/rules/java:java_xsd_config_library.bzl";

/// Support library linked into all generated C++ code.
pub const LIB_XSDC_UTILS: &str = "libxsdc-utils";
/// XML parser of generated C++ code, unless `tinyxml` is set.
pub const LIB_XML2: &str = "libxml2";
/// XML parser of generated C++ code if `tinyxml` is set.
pub const LIB_TINYXML2: &str = "libtinyxml2";
/// Nullability annotations referenced by generated Java code.
pub const LIB_STUB_ANNOTATIONS: &str = "stub-annotations";
/// `XmlPullParser` implementation for non-Android platforms.
pub const LIB_KXML2: &str = "kxml2-2.3.0";
/// SDK of the Java target. Public and system SDKs ship package-private
/// copies of the stub annotations, which clash with the real ones.
pub const SDK_VERSION: &str = "core_current";

/// Return the name of the C++ target of a module.
pub fn cpp_target_name(name: &str) -> String {
    format!("{}-cpp", name)
}

/// Return the name of the Java target of a module.
pub fn java_target_name(name: &str) -> String {
    format!("{}-java", name)
}

/// Filegroup Target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilegroupTarget {
    pub name: String,
    pub srcs: Vec<Label>,
}

/// C++ Schema Library Target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CcXsdConfigLibrary {
    pub name: String,
    pub src: Label,
    pub include_files: Vec<Label>,
    pub package_name: Option<String>,
    pub gen_writer: bool,
    pub enums_only: bool,
    pub parser_only: bool,
    pub boolean_getter: bool,
    pub tinyxml: bool,
    pub root_elements: Vec<String>,
    pub deps: Vec<Label>,
    pub implementation_dynamic_deps: Vec<Label>,
}

/// Platform-Dependent Dependencies
///
/// Dependencies selected on the target operating system. There is exactly
/// one branch for the primary platform and one default branch for all other
/// platforms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformDeps {
    pub primary: Vec<Label>,
    pub default: Vec<Label>,
}

/// Java Schema Library Target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JavaXsdConfigLibrary {
    pub name: String,
    pub src: Label,
    pub include_files: Vec<Label>,
    pub package_name: Option<String>,
    pub nullability: bool,
    pub gen_has: bool,
    pub gen_writer: bool,
    pub boolean_getter: bool,
    pub root_elements: Vec<String>,
    pub deps: Vec<Label>,
    pub platform_deps: PlatformDeps,
    pub sdk_version: &'static str,
}

/// Declarative Target
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Filegroup(FilegroupTarget),
    CcXsdConfigLibrary(CcXsdConfigLibrary),
    JavaXsdConfigLibrary(JavaXsdConfigLibrary),
}

/// Translated Targets
///
/// The complete set of targets of a single module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSet {
    pub filegroup: FilegroupTarget,
    pub cc: CcXsdConfigLibrary,
    pub java: JavaXsdConfigLibrary,
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Filegroup(v) => &v.name,
            Target::CcXsdConfigLibrary(v) => &v.name,
            Target::JavaXsdConfigLibrary(v) => &v.name,
        }
    }

    /// Return the Bazel rule class of the target.
    pub fn class(&self) -> &'static str {
        match self {
            Target::Filegroup(_) => "filegroup",
            Target::CcXsdConfigLibrary(_) => "cc_xsd_config_library",
            Target::JavaXsdConfigLibrary(_) => "java_xsd_config_library",
        }
    }

    /// Convert to a rule instance
    ///
    /// Create the Starlark rule instance of the target. Flags that are not
    /// set and empty lists are left out.
    pub fn to_rule(&self) -> Rule {
        match self {
            Target::Filegroup(v) => {
                Rule::new(self.class(), None, &v.name)
                    .attr("srcs", Value::LabelList(v.srcs.clone()))
            },
            Target::CcXsdConfigLibrary(v) => {
                Rule::new(self.class(), Some(CC_LOAD), &v.name)
                    .attr("src", Value::Label(v.src.clone()))
                    .attr("include_files", Value::LabelList(v.include_files.clone()))
                    .attr("package_name", Value::String(v.package_name.clone().unwrap_or_default()))
                    .attr("gen_writer", Value::Bool(v.gen_writer))
                    .attr("enums_only", Value::Bool(v.enums_only))
                    .attr("parser_only", Value::Bool(v.parser_only))
                    .attr("boolean_getter", Value::Bool(v.boolean_getter))
                    .attr("tinyxml", Value::Bool(v.tinyxml))
                    .attr("root_elements", Value::StringList(v.root_elements.clone()))
                    .attr("deps", Value::LabelList(v.deps.clone()))
                    .attr(
                        "implementation_dynamic_deps",
                        Value::LabelList(v.implementation_dynamic_deps.clone()),
                    )
            },
            Target::JavaXsdConfigLibrary(v) => {
                Rule::new(self.class(), Some(JAVA_LOAD), &v.name)
                    .attr("src", Value::Label(v.src.clone()))
                    .attr("include_files", Value::LabelList(v.include_files.clone()))
                    .attr("package_name", Value::String(v.package_name.clone().unwrap_or_default()))
                    .attr("nullability", Value::Bool(v.nullability))
                    .attr("gen_has", Value::Bool(v.gen_has))
                    .attr("gen_writer", Value::Bool(v.gen_writer))
                    .attr("boolean_getter", Value::Bool(v.boolean_getter))
                    .attr("root_elements", Value::StringList(v.root_elements.clone()))
                    .attr("deps", Value::LabelListSelect {
                        base: v.deps.clone(),
                        arms: vec![
                            (
                                crate::platform::Id::Android.config_setting(),
                                v.platform_deps.primary.clone(),
                            ),
                            (
                                crate::platform::DEFAULT_CONDITION.to_string(),
                                v.platform_deps.default.clone(),
                            ),
                        ],
                    })
                    .attr("sdk_version", Value::String(v.sdk_version.to_string()))
            },
        }
    }
}

impl TargetSet {
    /// Return the targets in emission order.
    pub fn targets(&self) -> [Target; 3] {
        [
            Target::Filegroup(self.filegroup.clone()),
            Target::CcXsdConfigLibrary(self.cc.clone()),
            Target::JavaXsdConfigLibrary(self.java.clone()),
        ]
    }

    /// Return the rule instances in emission order.
    pub fn rules(&self) -> Vec<Rule> {
        self.targets().iter().map(|v| v.to_rule()).collect()
    }
}

fn file_labels(paths: &[String]) -> Vec<Label> {
    paths.iter().map(|v| Label::file(v)).collect()
}

/// Translate a module
///
/// Produce the filegroup, C++ and Java targets of the given module.
pub fn translate(descriptor: &crate::descriptor::Descriptor) -> TargetSet {
    let name = descriptor.name();
    let flags = descriptor.flags();
    let src = Label::file(descriptor.src());
    let include_files = file_labels(descriptor.include_files());

    let filegroup = FilegroupTarget {
        name: name.to_string(),
        srcs: descriptor.schema_files().map(Label::file).collect(),
    };

    // The XML parser is an exclusive choice. Generated code always needs the
    // xsdc support headers, regardless of flags.
    let xml_lib = if flags.tinyxml { LIB_TINYXML2 } else { LIB_XML2 };
    let cc = CcXsdConfigLibrary {
        name: cpp_target_name(name),
        src: src.clone(),
        include_files: include_files.clone(),
        package_name: descriptor.package_name().map(|v| v.to_string()),
        gen_writer: flags.gen_writer,
        enums_only: flags.enums_only,
        parser_only: flags.parser_only,
        boolean_getter: flags.boolean_getter,
        tinyxml: flags.tinyxml,
        root_elements: descriptor.root_elements().to_vec(),
        deps: vec![Label::module(LIB_XSDC_UTILS)],
        implementation_dynamic_deps: vec![Label::module(xml_lib)],
    };

    // Whether generated code uses nullability annotations depends on the
    // schema content as well, which is not known here. Hence, always depend
    // on the annotations. `XmlPullParser` is part of the Android SDK, other
    // platforms get it from kxml2.
    let java = JavaXsdConfigLibrary {
        name: java_target_name(name),
        src: src,
        include_files: include_files,
        package_name: descriptor.package_name().map(|v| v.to_string()),
        nullability: flags.nullability,
        gen_has: flags.gen_has,
        gen_writer: flags.gen_writer,
        boolean_getter: flags.boolean_getter,
        root_elements: descriptor.root_elements().to_vec(),
        deps: vec![Label::module(LIB_STUB_ANNOTATIONS)],
        platform_deps: PlatformDeps {
            primary: Vec::new(),
            default: vec![Label::module(LIB_KXML2)],
        },
        sdk_version: SDK_VERSION,
    };

    tracing::debug!(module = name, "translated to bazel targets");

    TargetSet {
        filegroup: filegroup,
        cc: cc,
        java: java,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;
    use crate::manifest::RawXsdConfig;

    fn descriptor(raw: RawXsdConfig) -> Descriptor {
        Descriptor::from_raw(&raw).unwrap()
    }

    fn simple() -> RawXsdConfig {
        RawXsdConfig {
            name: "foo".to_string(),
            srcs: vec!["foo.xsd".to_string()],
            ..Default::default()
        }
    }

    fn full() -> RawXsdConfig {
        RawXsdConfig {
            name: "foo".to_string(),
            srcs: vec!["foo.xsd".to_string()],
            include_files: vec!["foo.include.xsd".to_string()],
            package_name: Some("foo".to_string()),
            gen_writer: Some(true),
            enums_only: Some(true),
            boolean_getter: Some(true),
            tinyxml: Some(true),
            root_elements: vec!["root_element".to_string()],
            ..Default::default()
        }
    }

    // Verify translation of a minimal module
    //
    // A module with only a source gets the fixed dependencies, libxml2 as
    // parser, and the platform-dependent kxml2 dependency.
    #[test]
    fn translate_simple() {
        let set = translate(&descriptor(simple()));
        let rules = set.rules();

        assert_eq!(
            rules[0].render(),
            concat!(
                "filegroup(\n",
                "    name = \"foo\",\n",
                "    srcs = [\"foo.xsd\"],\n",
                ")",
            ),
        );
        assert_eq!(
            rules[1].render(),
            concat!(
                "cc_xsd_config_library(\n",
                "    name = \"foo-cpp\",\n",
                "    deps = [\":libxsdc-utils\"],\n",
                "    implementation_dynamic_deps = [\":libxml2\"],\n",
                "    src = \"foo.xsd\",\n",
                ")",
            ),
        );
        assert_eq!(
            rules[2].render(),
            concat!(
                "java_xsd_config_library(\n",
                "    name = \"foo-java\",\n",
                "    deps = [\":stub-annotations\"] + select({\n",
                "        \"//build/bazel/platforms/os:android\": [],\n",
                "        \"//conditions:default\": [\":kxml2-2.3.0\"],\n",
                "    }),\n",
                "    sdk_version = \"core_current\",\n",
                "    src = \"foo.xsd\",\n",
                ")",
            ),
        );
    }

    // Verify translation of a module with all properties
    //
    // Flags propagate to the targets that know them. Java lacks the C++ only
    // flags, and tinyxml replaces libxml2.
    #[test]
    fn translate_full() {
        let set = translate(&descriptor(full()));
        let rules = set.rules();

        assert_eq!(
            rules[0].render(),
            concat!(
                "filegroup(\n",
                "    name = \"foo\",\n",
                "    srcs = [\n",
                "        \"foo.xsd\",\n",
                "        \"foo.include.xsd\",\n",
                "    ],\n",
                ")",
            ),
        );
        assert_eq!(
            rules[1].render(),
            concat!(
                "cc_xsd_config_library(\n",
                "    name = \"foo-cpp\",\n",
                "    boolean_getter = True,\n",
                "    deps = [\":libxsdc-utils\"],\n",
                "    enums_only = True,\n",
                "    gen_writer = True,\n",
                "    implementation_dynamic_deps = [\":libtinyxml2\"],\n",
                "    include_files = [\"foo.include.xsd\"],\n",
                "    package_name = \"foo\",\n",
                "    root_elements = [\"root_element\"],\n",
                "    src = \"foo.xsd\",\n",
                "    tinyxml = True,\n",
                ")",
            ),
        );
        assert_eq!(
            rules[2].render(),
            concat!(
                "java_xsd_config_library(\n",
                "    name = \"foo-java\",\n",
                "    boolean_getter = True,\n",
                "    deps = [\":stub-annotations\"] + select({\n",
                "        \"//build/bazel/platforms/os:android\": [],\n",
                "        \"//conditions:default\": [\":kxml2-2.3.0\"],\n",
                "    }),\n",
                "    gen_writer = True,\n",
                "    include_files = [\"foo.include.xsd\"],\n",
                "    package_name = \"foo\",\n",
                "    root_elements = [\"root_element\"],\n",
                "    sdk_version = \"core_current\",\n",
                "    src = \"foo.xsd\",\n",
                ")",
            ),
        );
    }

    // Verify the XML parser choice
    //
    // Exactly one of libxml2 and libtinyxml2 is used, depending on `tinyxml`.
    // The support library is present either way.
    #[test]
    fn translate_xml_parser() {
        for tinyxml in [None, Some(false), Some(true)] {
            let mut raw = simple();
            raw.tinyxml = tinyxml;
            let set = translate(&descriptor(raw));

            let expected = if tinyxml == Some(true) { LIB_TINYXML2 } else { LIB_XML2 };
            assert_eq!(set.cc.implementation_dynamic_deps, vec![Label::module(expected)]);
            assert_eq!(set.cc.deps, vec![Label::module(LIB_XSDC_UTILS)]);
        }
    }

    // Verify explicitly disabled flags
    //
    // Flags set to `false` render exactly like flags that are not set.
    #[test]
    fn translate_explicit_false() {
        let mut raw = simple();
        raw.gen_writer = Some(false);
        raw.enums_only = Some(false);
        raw.parser_only = Some(false);
        raw.boolean_getter = Some(false);
        raw.tinyxml = Some(false);
        raw.nullability = Some(false);
        raw.gen_has = Some(false);

        let explicit: Vec<String> = translate(&descriptor(raw)).rules().iter()
            .map(|v| v.render())
            .collect();
        let implicit: Vec<String> = translate(&descriptor(simple())).rules().iter()
            .map(|v| v.render())
            .collect();

        assert_eq!(explicit, implicit);
        assert!(explicit.iter().all(|v| !v.contains("False")));
    }

    // Verify the Java dependencies
    //
    // Stub annotations are always present, even without `nullability`. The
    // android branch is empty, the default branch is kxml2 only.
    #[test]
    fn translate_java_deps() {
        for nullability in [None, Some(true)] {
            let mut raw = full();
            raw.nullability = nullability;
            let set = translate(&descriptor(raw));

            assert_eq!(set.java.deps, vec![Label::module(LIB_STUB_ANNOTATIONS)]);
            assert!(set.java.platform_deps.primary.is_empty());
            assert_eq!(set.java.platform_deps.default, vec![Label::module(LIB_KXML2)]);
            assert_eq!(set.java.sdk_version, "core_current");
        }
    }

    // Verify Java-only flags
    //
    // `nullability` and `gen_has` only reach the Java target.
    #[test]
    fn translate_java_flags() {
        let mut raw = simple();
        raw.nullability = Some(true);
        raw.gen_has = Some(true);
        let rules = translate(&descriptor(raw)).rules();

        assert_eq!(rules[1].get("nullability"), None);
        assert_eq!(rules[1].get("gen_has"), None);
        assert_eq!(rules[2].get("nullability"), Some(&Value::Bool(true)));
        assert_eq!(rules[2].get("gen_has"), Some(&Value::Bool(true)));
        assert_eq!(rules[2].get("tinyxml"), None);
    }

    // Verify determinism and target names
    #[test]
    fn translate_deterministic() {
        let d = descriptor(full());
        let a = crate::starlark::render_file(&translate(&d).rules());
        let b = crate::starlark::render_file(&translate(&d).rules());
        assert_eq!(a, b);

        let names: Vec<String> = translate(&d).targets().iter()
            .map(|v| v.name().to_string())
            .collect();
        assert_eq!(names, vec!["foo", "foo-cpp", "foo-java"]);
    }
}
