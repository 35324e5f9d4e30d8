//! Artifact Expansion
//!
//! Expand a schema module into the artifacts it generates and the build
//! actions producing them. All paths are deterministic and derived from the
//! generation root, the module name and its package name. Nothing is executed
//! here. Actions are rendered into build files by `op::generate` and run by
//! `op::compile`.
//!
//! Every module generates:
//!
//!  * `<gen>/<name>/xsdcgen.srcjar`: An archive with the generated Java
//!    sources.
//!
//!  * `<gen>/<name>/cpp/<stem>.cpp`, `<gen>/<name>/cpp/include/<stem>.h`: The
//!    generated C++ parser, unless `enums_only` is set.
//!
//!  * `<gen>/<name>/cpp/<stem>_enums.cpp`,
//!    `<gen>/<name>/cpp/include/<stem>_enums.h`: The generated C++
//!    enumerations, unless `parser_only` is set.
//!
//! `<stem>` is the package name with `.` replaced by `_`.

use crate::descriptor;

/// File name of the generated Java source archive.
pub const JAVA_ARCHIVE: &str = "xsdcgen.srcjar";

/// Generated Artifacts
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactSet {
    pub java_sources: Vec<std::path::PathBuf>,
    pub cpp_sources: Vec<std::path::PathBuf>,
    pub cpp_headers: Vec<std::path::PathBuf>,
    /// Include directories of the C++ headers.
    pub header_dirs: Vec<std::path::PathBuf>,
}

/// Build Rule
///
/// The rules available to build actions. Both invoke the schema compiler,
/// `Java` packages its output into an archive, `Cpp` keeps the output as
/// directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Java,
    Cpp,
}

impl Rule {
    /// Return the name of the rule in generated build files.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Java => "xsdc_java",
            Rule::Cpp => "xsdc_cpp",
        }
    }

    // Compiler switch selecting the target language. Java is the default
    // mode of the compiler and has none.
    fn language_switch(&self) -> Option<&'static str> {
        match self {
            Rule::Java => None,
            Rule::Cpp => Some("-c"),
        }
    }
}

/// Build Action
///
/// A single invocation of the schema compiler. The compiler is run as
/// `xsdc <input> <package_name> <staging> <args...>`, its output is then
/// published at `output`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Action {
    pub rule: Rule,
    pub description: String,
    /// Schema passed to the compiler.
    pub input: std::path::PathBuf,
    /// Inputs read by the compiler on top of `input`.
    pub implicit_inputs: Vec<std::path::PathBuf>,
    /// All files produced by the action.
    pub outputs: Vec<std::path::PathBuf>,
    /// The archive (`Java`) or directory (`Cpp`) the output is published as.
    pub output: std::path::PathBuf,
    /// Temporary directory the compiler writes into.
    pub staging: std::path::PathBuf,
    /// Dependency file listing `implicit_inputs` for all `outputs`.
    pub depfile: std::path::PathBuf,
    pub package_name: String,
    /// Compiler arguments following the positional arguments.
    pub args: Vec<String>,
}

/// Expansion Result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expansion {
    pub artifacts: ArtifactSet,
    pub actions: Vec<Action>,
}

// Append a suffix to the final component of a path.
fn with_suffix(path: &std::path::Path, suffix: &str) -> std::path::PathBuf {
    let mut v = path.as_os_str().to_os_string();
    v.push(suffix);
    v.into()
}

/// Return the staging directory of an output
///
/// Staging directories are derived from the output path, so actions of
/// different modules never share them.
pub fn staging_path(output: &std::path::Path) -> std::path::PathBuf {
    with_suffix(output, ".temp")
}

/// Return the path an archive is written to before it is published.
pub fn partial_path(output: &std::path::Path) -> std::path::PathBuf {
    with_suffix(output, ".tmp")
}

/// Return the dependency file of an output.
pub fn depfile_path(output: &std::path::Path) -> std::path::PathBuf {
    with_suffix(output, ".d")
}

/// Build compiler arguments
///
/// Build the arguments following the positional compiler arguments: the
/// language switch for C++, then one switch per set flag, then one
/// `-r <element>` per root element. Flags that do not apply to the language
/// are ignored. A Java action without flags and root elements gets no
/// arguments, so the compiler runs with exactly its positional arguments.
pub fn compiler_args(
    rule: Rule,
    flags: &descriptor::Flags,
    root_elements: &[String],
) -> Vec<String> {
    let mut args: Vec<String> = rule.language_switch().into_iter()
        .map(|v| v.to_string())
        .collect();
    let switches: Vec<(bool, &str)> = match rule {
        Rule::Java => vec![
            (flags.gen_writer, "-w"),
            (flags.boolean_getter, "-b"),
            (flags.nullability, "-n"),
            (flags.gen_has, "-g"),
        ],
        Rule::Cpp => vec![
            (flags.gen_writer, "-w"),
            (flags.enums_only, "-e"),
            (flags.parser_only, "-x"),
            (flags.boolean_getter, "-b"),
            (flags.tinyxml, "-t"),
        ],
    };
    for (set, switch) in switches.iter() {
        if *set {
            args.push(switch.to_string());
        }
    }
    for v in root_elements.iter() {
        args.push("-r".to_string());
        args.push(v.clone());
    }
    args
}

/// Expand a module
///
/// Compute the artifacts and actions of the given module, placing all output
/// below `<gen_root>/<name>/`. Fails if the module has no package name, since
/// the compiler requires one for both languages.
pub fn expand(
    descriptor: &descriptor::Descriptor,
    gen_root: &std::path::Path,
) -> Result<Expansion, descriptor::Error> {
    let package_name = descriptor.package_name().ok_or_else(
        || descriptor::Error::Property {
            module: descriptor.name().to_string(),
            field: "package_name",
            value: "None".to_string(),
            reason: "is required to generate sources",
        }
    )?;
    let flags = descriptor.flags();

    let mut path = gen_root.join(descriptor.name());
    let input = std::path::PathBuf::from(descriptor.src());
    let implicit_inputs: Vec<std::path::PathBuf> = descriptor.include_files().iter()
        .map(std::path::PathBuf::from)
        .collect();

    let mut artifacts = ArtifactSet::default();
    let mut actions = Vec::with_capacity(2);

    // Java sources are packaged into a single archive.
    path.push(JAVA_ARCHIVE);
    artifacts.java_sources.push(path.clone());
    actions.push(Action {
        rule: Rule::Java,
        description: format!("xsdc Java {} => {}", input.display(), path.display()),
        input: input.clone(),
        implicit_inputs: implicit_inputs.clone(),
        outputs: vec![path.clone()],
        output: path.clone(),
        staging: staging_path(&path),
        depfile: depfile_path(&path),
        package_name: package_name.to_string(),
        args: compiler_args(Rule::Java, flags, descriptor.root_elements()),
    });
    path.pop();

    // C++ sources and headers are published as a directory.
    let stem = package_name.replace('.', "_");
    path.push("cpp");
    {
        let cpp_dir = path.clone();
        let include_dir = cpp_dir.join("include");

        let mut stems = Vec::with_capacity(2);
        if !flags.enums_only {
            stems.push(stem.clone());
        }
        if !flags.parser_only {
            stems.push(format!("{}_enums", stem));
        }
        for v in stems.iter() {
            artifacts.cpp_sources.push(cpp_dir.join(format!("{}.cpp", v)));
            artifacts.cpp_headers.push(include_dir.join(format!("{}.h", v)));
        }
        artifacts.header_dirs.push(include_dir);

        let mut outputs = artifacts.cpp_sources.clone();
        outputs.extend(artifacts.cpp_headers.iter().cloned());

        actions.push(Action {
            rule: Rule::Cpp,
            description: format!("xsdc C++ {} => {}", input.display(), cpp_dir.display()),
            input: input,
            implicit_inputs: implicit_inputs,
            outputs: outputs,
            output: cpp_dir.clone(),
            staging: staging_path(&cpp_dir),
            depfile: depfile_path(&cpp_dir),
            package_name: package_name.to_string(),
            args: compiler_args(Rule::Cpp, flags, descriptor.root_elements()),
        });
    }
    path.pop();

    tracing::debug!(
        module = descriptor.name(),
        actions = actions.len(),
        "expanded build actions",
    );

    Ok(
        Expansion {
            artifacts: artifacts,
            actions: actions,
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::RawXsdConfig;
    use std::path::{Path, PathBuf};

    fn descriptor(raw: RawXsdConfig) -> descriptor::Descriptor {
        descriptor::Descriptor::from_raw(&raw).unwrap()
    }

    fn raw() -> RawXsdConfig {
        RawXsdConfig {
            name: "foo".to_string(),
            srcs: vec!["foo.xsd".to_string()],
            include_files: vec!["foo.include.xsd".to_string()],
            package_name: Some("com.example.foo".to_string()),
            ..Default::default()
        }
    }

    // Verify the generated artifacts
    //
    // One Java archive, plus parser and enumeration sources and headers for
    // C++, all below the module directory.
    #[test]
    fn expand_artifacts() {
        let e = expand(&descriptor(raw()), Path::new("out/gen")).unwrap();

        assert_eq!(
            e.artifacts.java_sources,
            vec![PathBuf::from("out/gen/foo/xsdcgen.srcjar")],
        );
        assert_eq!(
            e.artifacts.cpp_sources,
            vec![
                PathBuf::from("out/gen/foo/cpp/com_example_foo.cpp"),
                PathBuf::from("out/gen/foo/cpp/com_example_foo_enums.cpp"),
            ],
        );
        assert_eq!(
            e.artifacts.cpp_headers,
            vec![
                PathBuf::from("out/gen/foo/cpp/include/com_example_foo.h"),
                PathBuf::from("out/gen/foo/cpp/include/com_example_foo_enums.h"),
            ],
        );
        assert_eq!(
            e.artifacts.header_dirs,
            vec![PathBuf::from("out/gen/foo/cpp/include")],
        );
    }

    // Verify the Java action
    //
    // Staging directory and dependency file are derived from the archive
    // path, and include files are implicit inputs.
    #[test]
    fn expand_java_action() {
        let e = expand(&descriptor(raw()), Path::new("out/gen")).unwrap();
        let a = &e.actions[0];

        assert_eq!(a.rule, Rule::Java);
        assert_eq!(a.input, PathBuf::from("foo.xsd"));
        assert_eq!(a.implicit_inputs, vec![PathBuf::from("foo.include.xsd")]);
        assert_eq!(a.output, PathBuf::from("out/gen/foo/xsdcgen.srcjar"));
        assert_eq!(a.outputs, vec![a.output.clone()]);
        assert_eq!(a.staging, PathBuf::from("out/gen/foo/xsdcgen.srcjar.temp"));
        assert_eq!(a.depfile, PathBuf::from("out/gen/foo/xsdcgen.srcjar.d"));
        assert_eq!(a.package_name, "com.example.foo");
        assert!(a.args.is_empty());
        assert_eq!(a.description, "xsdc Java foo.xsd => out/gen/foo/xsdcgen.srcjar");
    }

    // Verify the C++ action
    //
    // The action produces all C++ files and honors the generation flags.
    #[test]
    fn expand_cpp_action() {
        let mut r = raw();
        r.parser_only = Some(true);
        r.tinyxml = Some(true);
        r.gen_has = Some(true);
        r.root_elements = vec!["root".to_string()];
        let e = expand(&descriptor(r), Path::new("gen")).unwrap();
        let a = &e.actions[1];

        assert_eq!(a.rule, Rule::Cpp);
        assert_eq!(a.output, PathBuf::from("gen/foo/cpp"));
        assert_eq!(a.staging, PathBuf::from("gen/foo/cpp.temp"));
        assert_eq!(a.depfile, PathBuf::from("gen/foo/cpp.d"));
        assert_eq!(
            a.outputs,
            vec![
                PathBuf::from("gen/foo/cpp/com_example_foo.cpp"),
                PathBuf::from("gen/foo/cpp/include/com_example_foo.h"),
            ],
        );
        assert_eq!(a.args, vec!["-c", "-x", "-t", "-r", "root"]);

        // Java ignores C++ flags, but gets `gen_has`.
        assert_eq!(e.actions[0].args, vec!["-g", "-r", "root"]);
    }

    // Verify modules without package
    //
    // Expansion requires a package name and fails before any action exists.
    #[test]
    fn expand_without_package() {
        let mut r = raw();
        r.package_name = None;

        let err = expand(&descriptor(r), Path::new("gen")).unwrap_err();
        assert_eq!(err.field(), "package_name");
    }

    // Verify isolation between modules
    //
    // Different modules never share outputs or staging directories.
    #[test]
    fn expand_isolation() {
        let mut r = raw();
        r.name = "bar".to_string();

        let a = expand(&descriptor(raw()), Path::new("gen")).unwrap();
        let b = expand(&descriptor(r), Path::new("gen")).unwrap();

        for (x, y) in a.actions.iter().zip(b.actions.iter()) {
            assert_ne!(x.staging, y.staging);
            assert_ne!(x.output, y.output);
            assert_ne!(x.depfile, y.depfile);
        }
    }
}
