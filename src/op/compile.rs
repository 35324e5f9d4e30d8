//! Compile Schema
//!
//! Run a single build action: invoke the schema compiler on a schema and
//! publish its output. This is the command behind the rules of the generated
//! build files.
//!
//! The compiler always writes into a staging directory next to the output.
//! Only once the compiler succeeded, the output is published:
//!
//!  * Archives are written to `<output>.tmp` and renamed to `<output>`.
//!
//!  * Directories replace `<output>` by renaming the staging directory.
//!
//! The staging directory is removed on all paths, including failures. Thus,
//! consumers never see partial output and failed runs leave nothing behind.
//! Finally, a dependency file is written listing all include files of the
//! schema, so the build system reruns the action if any of them changes.

/// Compile Errors
///
/// This is the exhaustive list of possible errors raised by the compile
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The compiler command is empty.
    #[error("empty compiler command")]
    Command,
    /// Creation of the staging directory at the specified path failed.
    #[error("cannot create staging directory {0:?}: {1}")]
    Staging(std::ffi::OsString, std::io::Error),
    /// The compiler could not be executed.
    #[error("cannot execute '{0}': {1}")]
    Exec(String, std::io::Error),
    /// The compiler ran but failed.
    #[error("schema compiler failed ({0})")]
    Compiler(std::process::ExitStatus),
    /// Writing the archive at the specified path failed.
    #[error("cannot write archive {0:?}: {1}")]
    Archive(std::ffi::OsString, zip::result::ZipError),
    /// Updating the file at the specified path failed with the given error.
    #[error("cannot update {0:?}: {1}")]
    FileUpdate(std::ffi::OsString, std::io::Error),
    /// Removing the file at the specified path failed with the given error.
    #[error("cannot remove {0:?}: {1}")]
    FileRemoval(std::ffi::OsString, std::io::Error),
    /// The compiler did not produce the declared output at this path.
    #[error("schema compiler did not produce {0:?}")]
    MissingOutput(std::ffi::OsString),
}

/// Action Output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Package the compiler output into a zip archive at this path.
    Archive(std::path::PathBuf),
    /// Publish the compiler output as directory at this path.
    Directory(std::path::PathBuf),
}

impl Output {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Output::Archive(v) => v,
            Output::Directory(v) => v,
        }
    }
}

/// Compile Request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Compiler command. Words are separated by whitespace.
    pub xsdc: String,
    pub schema: std::path::PathBuf,
    pub package_name: String,
    /// Compiler arguments following the positional arguments.
    pub args: Vec<String>,
    /// Include files of the schema, recorded in the dependency file.
    pub includes: Vec<std::path::PathBuf>,
    pub output: Output,
    pub depfile: std::path::PathBuf,
    /// Targets of the dependency file. Defaults to the output if empty.
    pub depfile_targets: Vec<std::path::PathBuf>,
}

impl Request {
    /// Create request from action
    ///
    /// Create the request running the given build action with the given
    /// compiler command.
    pub fn from_action(action: &crate::op::expand::Action, xsdc: &str) -> Self {
        let output = match action.rule {
            crate::op::expand::Rule::Java => Output::Archive(action.output.clone()),
            crate::op::expand::Rule::Cpp => Output::Directory(action.output.clone()),
        };

        Self {
            xsdc: xsdc.to_string(),
            schema: action.input.clone(),
            package_name: action.package_name.clone(),
            args: action.args.clone(),
            includes: action.implicit_inputs.clone(),
            output: output,
            depfile: action.depfile.clone(),
            depfile_targets: action.outputs.clone(),
        }
    }
}

// Staging Directory
//
// Owns the staging directory of a compile run. The directory is created
// empty and removed when the guard is dropped, if it still exists.
struct Staging {
    path: std::path::PathBuf,
}

impl Staging {
    fn create(path: std::path::PathBuf) -> Result<Self, Error> {
        // A previous run might have been killed before cleaning up.
        remove_dir(&path)?;
        std::fs::create_dir_all(&path).map_err(
            |v| Error::Staging(path.as_os_str().to_os_string(), v)
        )?;
        Ok(Self { path: path })
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if let Err(v) = remove_dir(&self.path) {
            tracing::warn!("cannot clean up staging directory: {}", v);
        }
    }
}

// Remove a directory tree if it exists.
fn remove_dir(path: &std::path::Path) -> Result<(), Error> {
    match std::fs::remove_dir_all(path) {
        Err(v) if v.kind() != std::io::ErrorKind::NotFound => {
            Err(Error::FileRemoval(path.as_os_str().to_os_string(), v))
        },
        _ => {
            Ok(())
        },
    }
}

// Unlink file if it exists
fn unlink_file(path: &std::path::Path) -> Result<(), Error> {
    match std::fs::remove_file(path) {
        Err(v) if v.kind() != std::io::ErrorKind::NotFound => {
            Err(Error::FileRemoval(path.as_os_str().to_os_string(), v))
        },
        _ => {
            Ok(())
        }
    }
}

// Ensure the parent directory of a path exists.
fn ensure_parent(path: &std::path::Path) -> Result<(), Error> {
    match path.parent() {
        Some(v) if !v.as_os_str().is_empty() => {
            std::fs::create_dir_all(v).map_err(
                |e| Error::FileUpdate(v.as_os_str().to_os_string(), e)
            )
        },
        _ => Ok(()),
    }
}

// Collect all files below `root`
//
// Return the paths of all regular files below `root`, relative to `root`,
// with `/` as separator, sorted.
fn collect_files(root: &std::path::Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut dirs = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = dirs.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };

            if entry.file_type()?.is_dir() {
                dirs.push((entry.path(), relative));
            } else {
                files.push(relative);
            }
        }
    }

    files.sort();
    Ok(files)
}

// Package a directory
//
// Write all files below `root` into a zip archive at `path`. Entries are
// sorted and carry fixed timestamps and permissions, so equal input yields
// an equal archive.
fn write_archive(
    root: &std::path::Path,
    path: &std::path::Path,
) -> Result<usize, zip::result::ZipError> {
    use std::io::Write;

    let files = collect_files(root)?;
    let file = std::fs::File::create(path)?;

    let mut zip = zip::ZipWriter::new(std::io::BufWriter::new(file));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    for relative in files.iter() {
        let contents = std::fs::read(root.join(relative))?;
        zip.start_file(relative.as_str(), options)?;
        zip.write_all(&contents)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(files.len())
}

// Escape a path for use in a dependency file.
fn escape_depfile(path: &std::path::Path) -> String {
    path.display().to_string().replace(' ', "\\ ")
}

/// Render a dependency file
///
/// Render a GCC-style dependency file declaring that all `targets` depend on
/// all `deps`.
pub fn render_depfile(
    targets: &[std::path::PathBuf],
    deps: &[std::path::PathBuf],
) -> String {
    let mut r = targets.iter()
        .map(|v| escape_depfile(v))
        .collect::<Vec<_>>()
        .join(" ");
    r.push(':');
    for v in deps.iter() {
        r.push(' ');
        r.push_str(&escape_depfile(v));
    }
    r.push('\n');
    r
}

// Publish the staged compiler output.
fn publish(
    staging: &Staging,
    output: &Output,
) -> Result<(), Error> {
    match output {
        Output::Archive(path) => {
            let partial = crate::op::expand::partial_path(path);

            match write_archive(&staging.path, &partial) {
                Ok(n) => {
                    tracing::debug!(entries = n, "packaged {}", path.display());
                },
                Err(v) => {
                    unlink_file(&partial)?;
                    return Err(Error::Archive(path.as_os_str().to_os_string(), v));
                },
            }

            std::fs::rename(&partial, path).map_err(
                |v| Error::FileUpdate(path.as_os_str().to_os_string(), v)
            )
        },
        Output::Directory(path) => {
            remove_dir(path)?;
            std::fs::rename(&staging.path, path).map_err(
                |v| Error::FileUpdate(path.as_os_str().to_os_string(), v)
            )
        },
    }
}

/// Compile a schema
///
/// Run the schema compiler as described by the request and publish its
/// output. Compiler failures are not retried; the compiler inherits stdout
/// and stderr, so its diagnostics reach the caller unchanged.
pub fn compile(request: &Request) -> Result<(), Error> {
    let mut words = request.xsdc.split_whitespace();
    let bin = words.next().ok_or(Error::Command)?;
    let output_path = request.output.path();

    ensure_parent(output_path)?;
    let staging = Staging::create(crate::op::expand::staging_path(output_path))?;

    let mut cmd = std::process::Command::new(bin);
    cmd.args(words);
    cmd.arg(&request.schema);
    cmd.arg(&request.package_name);
    cmd.arg(&staging.path);
    cmd.args(&request.args);

    cmd.stderr(std::process::Stdio::inherit());
    cmd.stdout(std::process::Stdio::inherit());

    tracing::debug!(
        schema = %request.schema.display(),
        staging = %staging.path.display(),
        "running {}",
        request.xsdc,
    );

    let status = cmd.status().map_err(|v| Error::Exec(bin.to_string(), v))?;
    if !status.success() {
        return Err(Error::Compiler(status));
    }

    publish(&staging, &request.output)?;
    drop(staging);

    let default_targets;
    let targets = if request.depfile_targets.is_empty() {
        default_targets = vec![output_path.to_path_buf()];
        &default_targets
    } else {
        &request.depfile_targets
    };

    // All declared outputs must exist.
    if let Some(v) = targets.iter().find(|v| !v.exists()) {
        return Err(Error::MissingOutput(v.as_os_str().to_os_string()));
    }

    // Write the dependency file last, so it never describes output that was
    // not published.
    ensure_parent(&request.depfile)?;
    std::fs::write(&request.depfile, render_depfile(targets, &request.includes))
        .map_err(|v| Error::FileUpdate(request.depfile.as_os_str().to_os_string(), v))?;

    tracing::info!("compiled {}", request.schema.display());
    Ok(())
}
