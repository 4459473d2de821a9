//! Command-line partitioning and packaging-argument inspection.
//!
//! The command line has up to three segments separated by a literal `--`:
//! packaging arguments, CMake arguments, build tool arguments.

use crate::core::errors::SetupError;

/// The separator token between argument segments.
pub const SEPARATOR: &str = "--";

/// Commands the packaging tool understands.
pub const KNOWN_COMMANDS: &[&str] = &[
    "alias",
    "bdist",
    "bdist_dumb",
    "bdist_egg",
    "bdist_rpm",
    "bdist_wheel",
    "build",
    "build_clib",
    "build_ext",
    "build_py",
    "build_scripts",
    "check",
    "clean",
    "develop",
    "dist_info",
    "easy_install",
    "editable_wheel",
    "egg_info",
    "install",
    "install_data",
    "install_egg_info",
    "install_headers",
    "install_lib",
    "install_scripts",
    "register",
    "rotate",
    "saveopts",
    "sdist",
    "setopt",
    "test",
    "upload",
    "upload_docs",
];

/// Flags that only print information and never build.
pub const DISPLAY_OPTIONS: &[&str] = &[
    "--help",
    "-h",
    "--help-commands",
    "--name",
    "--version",
    "-V",
    "--fullname",
    "--author",
    "--author-email",
    "--maintainer",
    "--maintainer-email",
    "--contact",
    "--contact-email",
    "--url",
    "--license",
    "--licence",
    "--description",
    "--long-description",
    "--platforms",
    "--classifiers",
    "--keywords",
    "--provides",
    "--requires",
    "--obsoletes",
];

/// Commands for which the native build is not needed.
pub const SKIP_BUILD_COMMANDS: &[&str] = &["clean", "egg_info", "sdist"];

/// The three argument segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgSets {
    pub setup: Vec<String>,
    pub cmake: Vec<String>,
    pub build_tool: Vec<String>,
}

/// Split `args` on [`SEPARATOR`]. More than two separators is a usage error.
pub fn split_arg_sets<I, S>(args: I) -> Result<ArgSets, SetupError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sets: [Vec<String>; 3] = Default::default();
    let mut index = 0;

    for arg in args {
        let arg = arg.into();
        if arg == SEPARATOR {
            index += 1;
            if index >= sets.len() {
                return Err(SetupError::usage(format!(
                    "Too many \"{}\" separators provided (expected at most {}).",
                    SEPARATOR,
                    sets.len() - 1
                )));
            }
        } else {
            sets[index].push(arg);
        }
    }

    let [setup, cmake, build_tool] = sets;
    Ok(ArgSets {
        setup,
        cmake,
        build_tool,
    })
}

/// cmpack's own options turned into CMake and build tool arguments.
///
/// Returns `(cmake_args, build_tool_args)`.
pub fn translate_options(
    build_type: &str,
    generator: Option<&str>,
    jobs: Option<usize>,
) -> (Vec<String>, Vec<String>) {
    let mut cmake = vec![format!("-DCMAKE_BUILD_TYPE:STRING={}", build_type)];
    if let Some(generator) = generator {
        cmake.push("-G".to_string());
        cmake.push(generator.to_string());
    }

    let mut build_tool = vec!["--config".to_string(), build_type.to_string()];
    if let Some(jobs) = jobs {
        build_tool.push("-j".to_string());
        build_tool.push(jobs.to_string());
    }

    (cmake, build_tool)
}

/// What the packaging arguments ask for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupCommandLine {
    /// Commands in order
    pub commands: Vec<String>,
    /// Some flag only displays information
    pub display_only: bool,
    /// `--help-commands` was given
    pub help_commands: bool,
    /// The arguments as given
    pub args: Vec<String>,
}

impl SetupCommandLine {
    /// Inspect packaging arguments.
    ///
    /// A word right after an option without `=` is taken as that option's
    /// value unless it names a command. Any other word must be a command.
    pub fn parse(args: &[String]) -> Result<Self, SetupError> {
        let mut line = SetupCommandLine {
            args: args.to_vec(),
            ..Default::default()
        };
        let mut after_option = false;

        for arg in args {
            if arg.starts_with('-') {
                if DISPLAY_OPTIONS.contains(&arg.as_str()) {
                    line.display_only = true;
                    line.help_commands |= arg == "--help-commands";
                    after_option = false;
                } else {
                    after_option = !arg.contains('=');
                }
                continue;
            }

            if KNOWN_COMMANDS.contains(&arg.as_str()) {
                line.commands.push(arg.clone());
            } else if !after_option {
                return Err(SetupError::usage(format!("invalid command '{}'", arg)));
            }
            after_option = false;
        }

        if line.commands.is_empty() && !line.display_only {
            return Err(SetupError::usage(
                "no commands supplied\n\
                 usage: cmpack [options] cmd1 [cmd1_opts] [cmd2 [cmd2_opts] ...]\n   \
                 or: cmpack --help [cmd1 cmd2 ...]\n   \
                 or: cmpack --help-commands\n   \
                 or: cmpack cmd --help",
            ));
        }

        Ok(line)
    }

    /// Whether `command` was requested.
    pub fn has_command(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
    }

    /// Why the native build should not run, if it shouldn't.
    pub fn skip_reason(&self) -> Option<String> {
        if self.display_only {
            return Some("display-only arguments".to_string());
        }
        SKIP_BUILD_COMMANDS
            .iter()
            .find(|c| self.has_command(c))
            .map(|c| format!("`{}` does not need the native build", c))
    }
}

/// Text printed ahead of the packaging tool's command list.
pub fn help_commands_text() -> String {
    [
        "cmpack options:",
        "  --build-type <TYPE>     specify the CMake build type (e.g. Debug or Release)",
        "  -G, --generator <NAME>  specify the CMake build system generator",
        "  -j <N>                  allow N build jobs at once",
        "",
        "Arguments following a \"--\" are passed directly to CMake (e.g. -DMY_VAR:BOOL=TRUE).",
        "Arguments following a second \"--\" are passed directly to the build tool.",
        "",
    ]
    .join("\n")
}
