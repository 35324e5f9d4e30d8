//! Generate Build Files
//!
//! Process all modules of a manifest and write the resulting build files
//! into an output directory:
//!
//!  * `build.ninja`: The build actions of all schema modules, running
//!    `xsd-config compile` for each of them. Run it from the directory of the
//!    manifest, since schema paths are relative to it.
//!
//!  * `modules.json`: The module graph, including the derived documentation
//!    modules and the artifacts of every schema module.
//!
//!  * `BUILD.bazel`: The declarative targets of all schema modules.
//!
//! Module errors do not abort the operation. Every broken module is skipped
//! and reported, all other modules are processed normally. Files are only
//! written if their content changed.

use crate::{descriptor, graph, op};

pub const NINJA_FILE: &str = "build.ninja";
pub const MODULES_FILE: &str = "modules.json";
pub const BAZEL_FILE: &str = "BUILD.bazel";

/// Generate Errors
///
/// This is the exhaustive list of possible errors raised by the generate
/// operation. Module errors are not part of it, see `Report`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Creation of the directory at the specified path failed.
    #[error("cannot create directory {0:?}")]
    DirectoryCreation(std::ffi::OsString),
    /// Updating the file at the specified path failed with the given error.
    #[error("cannot update {0:?}: {1}")]
    FileUpdate(std::ffi::OsString, std::io::Error),
    /// Serializing the module graph failed.
    #[error("cannot serialize module graph: {0}")]
    Json(#[from] serde_json::Error),
    /// The directory for generated artifacts contains characters that cannot
    /// be used in build files, like whitespace or `$`.
    #[error("unsupported directory for generated files {0:?}")]
    GenRoot(std::ffi::OsString),
}

/// Module Errors
///
/// Errors of individual modules. The affected module is left out of the
/// generated files, other modules are not affected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error(transparent)]
    Configuration(#[from] descriptor::Error),
    #[error(transparent)]
    Graph(#[from] graph::Error),
}

/// Generate Report
#[derive(Debug, Default)]
pub struct Report {
    /// Schema modules with build actions.
    pub modules: usize,
    /// Documentation modules.
    pub docs: usize,
    /// Declarative targets.
    pub targets: usize,
    /// Files that were written because their content changed.
    pub updated: Vec<std::path::PathBuf>,
    /// Module errors, in manifest order.
    pub failures: Vec<ModuleError>,
}

#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonModule<'a> {
    XsdConfig {
        name: &'a str,
        srcs: Vec<&'a str>,
        include_files: &'a [String],
        package_name: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        artifacts: Option<&'a op::expand::ArtifactSet>,
        actions: &'a [op::expand::Action],
    },
    Droidstubs(&'a op::docs::DocsModule),
}

#[derive(serde::Serialize)]
struct JsonGraph<'a> {
    modules: Vec<JsonModule<'a>>,
}

// Ensure directory exists
//
// Make sure the directory at the given path exists. Create the directory and
// its parent directories if necessary.
fn ensure_dir(
    path: &std::path::Path,
) -> Result<(), Error> {
    std::fs::create_dir_all(path)
        .map_err(
            |_| Error::DirectoryCreation(path.as_os_str().to_os_string())
        )
}

// Update a file if required
//
// This writes the given content to the specified file, but only if the file
// content does not already match the new content. This avoids modifying a file
// unless necessary. Thus, the file timestamp is only modified if the content
// really changed, and the build system does not regenerate needlessly.
//
// Returns whether the file was written.
fn update_file(
    path: &std::path::Path,
    content: &str,
) -> Result<bool, Error> {
    // Open the file read+write and create it if it does not exist, yet.
    let mut f = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(
            |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
        )?;

    // Read the entire file content into memory.
    let mut old = String::new();
    <std::fs::File as std::io::Read>::read_to_string(&mut f, &mut old)
        .map_err(
            |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
        )?;

    if old == content {
        return Ok(false);
    }

    // Rewind the position, truncate the file and write the new contents.
    <std::fs::File as std::io::Seek>::rewind(&mut f)
        .map_err(
            |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
        )?;

    f.set_len(0).map_err(
        |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
    )?;

    <std::fs::File as std::io::Write>::write_all(&mut f, content.as_bytes())
        .map_err(
            |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
        )?;

    // Sync the file now to ensure errors are caught properly.
    f.sync_all().map_err(
        |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
    )?;

    Ok(true)
}

// Escape a value for ninja variable bindings.
fn ninja_value(s: &str) -> String {
    s.replace('$', "$$")
}

// Escape a path for ninja build lines. Paths are verified to not contain
// whitespace or `$`, but `:` separates outputs from the rule.
fn ninja_path(path: &std::path::Path) -> String {
    path.display().to_string().replace(':', "$:")
}

// Quote a compile argument for the shell. Arguments are verified to not
// contain single quotes.
fn shell_arg(s: &str) -> String {
    format!("'{}'", ninja_value(s))
}

/// Render the ninja file
///
/// Render the rules and the build statements of all actions. The rules run
/// `driver compile`, passing the compiler command via `xsdc`.
pub fn render_ninja(
    toolchain: &crate::manifest::ViewToolchain,
    actions: &[&op::expand::Action],
) -> String {
    let mut r = format!(
        concat!(
            "# Generated by xsd-config\n",
            "ninja_required_version = 1.10\n",
            "\n",
            "xsdc = {0}\n",
            "xsd_config = {1}\n",
            "\n",
            "rule xsdc_java\n",
            "  command = ${{xsd_config}} compile --xsdc '${{xsdc}}' --package ${{pkg_name}}",
            " --archive --depfile ${{out}}.d ${{compile_args}} ${{in}} ${{out}}\n",
            "  depfile = ${{out}}.d\n",
            "  deps = gcc\n",
            "  description = xsdc Java ${{in}} => ${{out}}\n",
            "\n",
            "rule xsdc_cpp\n",
            "  command = ${{xsd_config}} compile --xsdc '${{xsdc}}' --package ${{pkg_name}}",
            " --depfile ${{cpp_depfile}} ${{compile_args}} ${{in}} ${{out_dir}}\n",
            "  depfile = ${{cpp_depfile}}\n",
            "  deps = gcc\n",
            "  description = xsdc C++ ${{in}} => ${{out_dir}}\n",
        ),
        ninja_value(&toolchain.xsdc),
        ninja_value(&toolchain.driver),
    );

    for action in actions.iter() {
        let outputs: Vec<String> = action.outputs.iter().map(|v| ninja_path(v)).collect();

        r.push_str(&format!(
            "\nbuild {}: {} {}",
            outputs.join(" "),
            action.rule.name(),
            ninja_path(&action.input),
        ));
        if !action.implicit_inputs.is_empty() {
            r.push_str(" |");
            for v in action.implicit_inputs.iter() {
                r.push(' ');
                r.push_str(&ninja_path(v));
            }
        }
        r.push('\n');

        let mut args: Vec<String> = Vec::new();
        for v in action.implicit_inputs.iter() {
            args.push("--include".to_string());
            args.push(shell_arg(&v.display().to_string()));
        }
        for v in action.args.iter() {
            args.push(shell_arg(&format!("--xsdc-arg={}", v)));
        }

        r.push_str(&format!("  pkg_name = {}\n", ninja_value(&action.package_name)));
        if action.rule == op::expand::Rule::Cpp {
            for v in action.outputs.iter() {
                args.push("--depfile-target".to_string());
                args.push(shell_arg(&v.display().to_string()));
            }
            r.push_str(&format!("  out_dir = {}\n", ninja_value(&action.output.display().to_string())));
            r.push_str(&format!("  cpp_depfile = {}\n", ninja_value(&action.depfile.display().to_string())));
        }
        r.push_str(&format!("  compile_args = {}\n", args.join(" ")));
    }

    r
}

/// Generate build files
///
/// Process all modules of the manifest and write the build files into
/// `out_dir`. Artifacts are placed below the `gen_dir` of the toolchain, or
/// `<out_dir>/gen` if not configured.
pub fn generate(
    manifest: &crate::manifest::Manifest,
    out_dir: &std::path::Path,
) -> Result<Report, Error> {
    let toolchain = manifest.raw.view_toolchain();
    let gen_root = match toolchain.gen_dir.as_ref() {
        Some(v) => std::path::PathBuf::from(v),
        None => out_dir.join("gen"),
    };
    if !gen_root.to_str().is_some_and(crate::manifest::is_plain_path) {
        return Err(Error::GenRoot(gen_root.into_os_string()));
    }

    let mut report = Report::default();
    let mut graph = graph::Graph::new();
    let mut expansions: std::collections::BTreeMap<String, op::expand::Expansion> =
        std::collections::BTreeMap::new();
    let mut descriptors: Vec<descriptor::Descriptor> = Vec::new();
    // Declarative target names, mapped to the module declaring them.
    let mut targets: std::collections::BTreeMap<String, String> =
        std::collections::BTreeMap::new();

    // Phase 1: Validate and register all schema modules. Modules that cannot
    // be expanded get no build actions, but are still translated.
    for raw in manifest.raw.xsd_config.iter() {
        let descriptor = match descriptor::Descriptor::from_raw(raw) {
            Ok(v) => v,
            Err(v) => {
                tracing::error!("{}", v);
                report.failures.push(v.into());
                continue;
            },
        };

        let names = [
            descriptor.name().to_string(),
            op::translate::cpp_target_name(descriptor.name()),
            op::translate::java_target_name(descriptor.name()),
        ];
        let taken = names.iter().find_map(
            |v| targets.get(v).map(|owner| (v, owner))
        );
        if let Some((target, owner)) = taken {
            // Redeclarations of a module are reported as duplicates below.
            if owner != descriptor.name() {
                let v = graph::Error::TargetConflict {
                    module: descriptor.name().to_string(),
                    target: target.clone(),
                    owner: owner.clone(),
                };
                tracing::error!("{}", v);
                report.failures.push(v.into());
                continue;
            }
        }

        if let Err(v) = graph.register(descriptor.clone()) {
            tracing::error!("{}", v);
            report.failures.push(v.into());
            continue;
        }
        for v in names {
            targets.insert(v, descriptor.name().to_string());
        }

        match op::expand::expand(&descriptor, &gen_root) {
            Ok(v) => {
                expansions.insert(descriptor.name().to_string(), v);
            },
            Err(v) => {
                tracing::warn!("{}", v);
                report.failures.push(v.into());
            },
        }

        descriptors.push(descriptor);
    }

    // Phase 2: Derive the documentation modules.
    let (_, conflicts) = graph.derive_docs();
    for v in conflicts {
        tracing::error!("{}", v);
        report.failures.push(v.into());
    }

    report.modules = expansions.len();
    report.docs = graph.docs_modules().count();

    // Native build files.
    let actions: Vec<&op::expand::Action> = expansions.values()
        .flat_map(|v| v.actions.iter())
        .collect();
    let ninja = render_ninja(&toolchain, &actions);

    let json = JsonGraph {
        modules: graph.modules().map(|v| match v {
            graph::Module::XsdConfig(d) => {
                let expansion = expansions.get(d.name());
                JsonModule::XsdConfig {
                    name: d.name(),
                    srcs: vec![d.src()],
                    include_files: d.include_files(),
                    package_name: d.package_name(),
                    artifacts: expansion.map(|v| &v.artifacts),
                    actions: expansion.map(|v| v.actions.as_slice()).unwrap_or(&[]),
                }
            },
            graph::Module::Docs(docs) => JsonModule::Droidstubs(docs),
        }).collect(),
    };
    let mut modules = serde_json::to_string_pretty(&json)?;
    modules.push('\n');

    // Declarative build file.
    let mut rules = Vec::new();
    for d in descriptors.iter() {
        rules.extend(op::translate::translate(d).rules());
    }
    report.targets = rules.len();
    let bazel = crate::starlark::render_file(&rules);

    ensure_dir(out_dir)?;
    for (file, content) in [
        (NINJA_FILE, ninja),
        (MODULES_FILE, modules),
        (BAZEL_FILE, bazel),
    ] {
        let path = out_dir.join(file);
        if update_file(&path, &content)? {
            tracing::info!("updated {}", path.display());
            report.updated.push(path);
        } else {
            tracing::debug!("unchanged {}", path.display());
        }
    }

    Ok(report)
}
