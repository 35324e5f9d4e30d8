//! XML-Schema Config Tooling
//!
//! This is the entry-point of `xsd-config`, a command-line tool to integrate
//! XML-Schema modules into a build. Its main input is the `xsd-config.toml`
//! manifest, which declares all schema modules of a source tree.
//!
//! The CLI provides two operations:
//!
//!  * `generate`: Read the manifest and write the build files for all
//!    modules (see `xsd_config::op::generate`).
//!
//!  * `compile`: Run the schema compiler for a single build action and
//!    publish its output (see `xsd_config::op::compile`). This is what the
//!    generated ninja file invokes, and it does not read the manifest.
//!
//! This CLI is mainly a dispatcher of the operations in `xsd_config::op::*`.
//! Logging goes to STDERR and is controlled via `RUST_LOG`.

use clap;
use xsd_config;

struct Cli {
    cmd: clap::Command,
}

impl Cli {
    fn new() -> Self {
        let mut cmd;

        cmd = clap::Command::new("xsd-config")
            .propagate_version(true)
            .subcommand_required(true)
            .about("XML-Schema Config Tooling")
            .long_about("Integrate XML-Schema modules into the build")
            .version(clap::crate_version!());

        cmd = cmd.arg(
            clap::Arg::new("manifest")
                .long("manifest")
                .value_name("PATH")
                .help("Path to the schema manifest relative to the working directory")
                .default_value("./xsd-config.toml")
                .value_parser(clap::builder::ValueParser::os_string())
        );

        cmd = cmd.subcommand(
            clap::Command::new("generate")
                .about("Generate build files for all schema modules")
                .arg(
                    clap::Arg::new("out-dir")
                        .long("out-dir")
                        .value_name("DIR")
                        .help("Directory to write the build files to")
                        .default_value("./out")
                        .value_parser(clap::builder::ValueParser::os_string())
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("compile")
                .about("Compile a schema and publish the generated sources")
                .arg(
                    clap::Arg::new("xsdc")
                        .long("xsdc")
                        .value_name("CMD")
                        .help("Schema compiler command, words separated by whitespace")
                        .required(true)
                )
                .arg(
                    clap::Arg::new("package")
                        .long("package")
                        .value_name("PKG")
                        .help("Package name of the generated code")
                        .required(true)
                )
                .arg(
                    clap::Arg::new("archive")
                        .long("archive")
                        .help("Package the generated sources into a zip archive")
                        .action(clap::ArgAction::SetTrue)
                )
                .arg(
                    clap::Arg::new("include")
                        .long("include")
                        .value_name("FILE")
                        .help("Include file of the schema, recorded as dependency")
                        .action(clap::ArgAction::Append)
                        .value_parser(clap::builder::ValueParser::os_string())
                )
                .arg(
                    clap::Arg::new("xsdc-arg")
                        .long("xsdc-arg")
                        .value_name("ARG")
                        .help("Argument passed to the schema compiler")
                        .action(clap::ArgAction::Append)
                        .allow_hyphen_values(true)
                )
                .arg(
                    clap::Arg::new("depfile")
                        .long("depfile")
                        .value_name("PATH")
                        .help("Dependency file to write")
                        .required(true)
                        .value_parser(clap::builder::ValueParser::os_string())
                )
                .arg(
                    clap::Arg::new("depfile-target")
                        .long("depfile-target")
                        .value_name("PATH")
                        .help("Target of the dependency file, defaults to the output")
                        .action(clap::ArgAction::Append)
                        .value_parser(clap::builder::ValueParser::os_string())
                )
                .arg(
                    clap::Arg::new("schema")
                        .value_name("SCHEMA")
                        .help("Schema file to compile")
                        .required(true)
                        .value_parser(clap::builder::ValueParser::os_string())
                )
                .arg(
                    clap::Arg::new("output")
                        .value_name("OUTPUT")
                        .help("Archive or directory to publish")
                        .required(true)
                        .value_parser(clap::builder::ValueParser::os_string())
                )
        );

        Self {
            cmd: cmd,
        }
    }

    fn manifest(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<xsd_config::manifest::Manifest, u8> {
        let manifest_path = m.get_one::<std::ffi::OsString>("manifest")
            .ok_or(2)?;

        xsd_config::manifest::Manifest::parse_path(
            std::path::Path::new(manifest_path)
        ).map_err(
            |v| {
                eprintln!("Cannot parse schema manifest: {}", v);
                1
            }
        )
    }

    fn op_generate(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;
        let out_dir = m_op.get_one::<std::ffi::OsString>("out-dir")
            .ok_or(2)?;

        match xsd_config::op::generate::generate(
            &manifest,
            std::path::Path::new(out_dir),
        ) {
            Err(v) => {
                eprintln!("Cannot generate build files: {}", v);
                Err(1)
            },
            Ok(report) => {
                for v in report.failures.iter() {
                    eprintln!("Skipped module: {}", v);
                }
                println!(
                    "{} schema modules, {} docs modules, {} targets, {} files updated",
                    report.modules,
                    report.docs,
                    report.targets,
                    report.updated.len(),
                );
                if report.failures.is_empty() {
                    Ok(())
                } else {
                    Err(1)
                }
            },
        }
    }

    fn op_compile(
        &self,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let paths = |id: &str| -> Vec<std::path::PathBuf> {
            m_op.get_many::<std::ffi::OsString>(id)
                .map(|v| v.map(std::path::PathBuf::from).collect())
                .unwrap_or_default()
        };
        let path = |id: &str| -> Result<std::path::PathBuf, u8> {
            m_op.get_one::<std::ffi::OsString>(id)
                .map(std::path::PathBuf::from)
                .ok_or(2)
        };

        let output = if m_op.get_flag("archive") {
            xsd_config::op::compile::Output::Archive(path("output")?)
        } else {
            xsd_config::op::compile::Output::Directory(path("output")?)
        };

        let request = xsd_config::op::compile::Request {
            xsdc: m_op.get_one::<String>("xsdc").cloned().ok_or(2)?,
            schema: path("schema")?,
            package_name: m_op.get_one::<String>("package").cloned().ok_or(2)?,
            args: m_op.get_many::<String>("xsdc-arg")
                .map(|v| v.cloned().collect())
                .unwrap_or_default(),
            includes: paths("include"),
            output: output,
            depfile: path("depfile")?,
            depfile_targets: paths("depfile-target"),
        };

        xsd_config::op::compile::compile(&request).map_err(
            |v| {
                eprintln!("Cannot compile {:?}: {}", request.schema, v);
                1
            }
        )
    }

    fn run(mut self) -> Result<(), u8> {
        let (m, r);

        r = self.cmd.try_get_matches_from_mut(
            std::env::args_os(),
        );

        match r {
            Ok(v) => m = v,
            Err(e) => {
                // Failing to print the usage leaves nothing to report to.
                let _ = e.print();
                return match e.kind() {
                    clap::error::ErrorKind::DisplayHelp |
                    clap::error::ErrorKind::DisplayVersion => Ok(()),
                    _ => Err(2),
                }
            }
        }

        match m.subcommand() {
            Some(("generate", m_op)) => self.op_generate(&m, m_op),
            Some(("compile", m_op)) => self.op_compile(m_op),
            _ => std::unreachable!(),
        }
    }
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::new().run() {
        Ok(()) => 0.into(),
        Err(v) => v.into(),
    }
}
