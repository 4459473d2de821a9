//! The setup run: build the native project, fold its output into the
//! packaging configuration and hand that off.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::builder::cmake::{CMaker, ConfigureOptions};
use crate::builder::generator::CMakePlatform;
use crate::builder::python::{self, PythonInfo};
use crate::core::layout::ProjectLayout;
use crate::core::manifest::{CMakeParams, Manifest};
use crate::ops::args::{help_commands_text, translate_options, SetupCommandLine};
use crate::ops::classify::Classifier;
use crate::ops::consolidate::plan_consolidation;
use crate::ops::handoff::{CommandHandoff, FileHandoff, Handoff, SetupOutput, StdoutHandoff};
use crate::util::context::GlobalContext;
use crate::util::fs::{normalize_lexically, remove_dir_all_if_exists};
use crate::util::shell::{Shell, Status};

/// Build type used when neither the command line nor a config file sets one.
pub const DEFAULT_BUILD_TYPE: &str = "Release";

/// Options for a setup run.
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// CMake build type
    pub build_type: Option<String>,
    /// Generator given on the command line
    pub generator: Option<String>,
    /// Parallel build jobs
    pub jobs: Option<usize>,
    /// Explicit manifest location
    pub manifest_path: Option<PathBuf>,
    /// Write the hand-off document here instead of stdout
    pub emit: Option<PathBuf>,
    /// Packaging tool arguments
    pub setup_args: Vec<String>,
    /// Arguments after the first `--`
    pub cmake_args: Vec<String>,
    /// Arguments after the second `--`
    pub build_tool_args: Vec<String>,
}

/// Run the whole pipeline.
pub fn setup(ctx: &GlobalContext, shell: &Arc<Shell>, opts: &SetupOptions) -> Result<()> {
    // Argument errors come before anything touches the disk.
    let command_line = SetupCommandLine::parse(&opts.setup_args)?;

    let manifest_path = match &opts.manifest_path {
        Some(path) => normalize_lexically(&ctx.cwd().join(path)),
        None => ctx.find_manifest()?,
    };
    let manifest = Manifest::load(&manifest_path)?;
    let params = manifest.cmake_params()?;
    let layout = ProjectLayout::new(manifest.root());
    let handoff = select_handoff(ctx, &manifest, &layout, opts);

    if command_line.has_command("clean") {
        let cmpack_dir = layout.cmpack_dir();
        if cmpack_dir.exists() {
            remove_dir_all_if_exists(&cmpack_dir)?;
            shell.status(Status::Removed, cmpack_dir.display());
        }
    }

    let has_cmakelists = layout
        .source_dir(&params.source_dir)
        .join("CMakeLists.txt")
        .exists();
    if !has_cmakelists {
        shell.status(Status::Skipped, "cmpack (no CMakeLists.txt found)");
    }

    let skip_reason = command_line.skip_reason().or_else(|| {
        (!has_cmakelists).then(|| "no CMakeLists.txt".to_string())
    });
    if let Some(reason) = skip_reason {
        tracing::debug!("skipping the native build: {}", reason);
        if command_line.help_commands {
            eprint!("{}", help_commands_text());
        }
        let output = SetupOutput::declared(&manifest, &command_line.args);
        return deliver(shell, handoff.as_ref(), &output);
    }

    let output = build_and_collect(ctx, shell, opts, &manifest, &params, &layout, &command_line)?;
    deliver(shell, handoff.as_ref(), &output)
}

fn select_handoff(
    ctx: &GlobalContext,
    manifest: &Manifest,
    layout: &ProjectLayout,
    opts: &SetupOptions,
) -> Box<dyn Handoff> {
    if !manifest.setup.command.is_empty() {
        return Box::new(CommandHandoff::new(
            manifest.setup.command.clone(),
            layout.handoff_path(),
            layout.root(),
        ));
    }
    match &opts.emit {
        Some(path) => Box::new(FileHandoff::new(ctx.cwd().join(path))),
        None => Box::new(StdoutHandoff),
    }
}

fn deliver(shell: &Arc<Shell>, handoff: &dyn Handoff, output: &SetupOutput) -> Result<()> {
    handoff.deliver(output)?;
    shell.verbose(Status::Finished, format!("handed off to {}", handoff.describe()));
    Ok(())
}

fn build_and_collect(
    ctx: &GlobalContext,
    shell: &Arc<Shell>,
    opts: &SetupOptions,
    manifest: &Manifest,
    params: &CMakeParams,
    layout: &ProjectLayout,
    command_line: &SetupCommandLine,
) -> Result<SetupOutput> {
    let config = ctx.load_config(layout.root());
    let build_type = opts
        .build_type
        .clone()
        .or(config.build.build_type)
        .unwrap_or_else(|| DEFAULT_BUILD_TYPE.to_string());
    let jobs = opts.jobs.or(config.build.jobs);

    // Arguments given after `--` come last so they win over everything.
    let (option_cmake, option_build) = translate_options(&build_type, opts.generator.as_deref(), jobs);
    let mut cmake_args = manifest.cmake.args.clone();
    cmake_args.extend(option_cmake);
    cmake_args.extend(opts.cmake_args.iter().cloned());
    let mut build_tool_args = option_build;
    build_tool_args.extend(opts.build_tool_args.iter().cloned());

    let cmaker = CMaker::new(layout.clone())?;
    let platform = CMakePlatform::for_host(cmaker.executable()).verbose(shell.is_verbose());
    let cmaker = cmaker.with_platform(platform);
    shell.verbose(Status::Info, format!("cmake {}", cmaker.version()));

    let span = shell.span(Status::Configuring, layout.source_dir(&params.source_dir).display());
    let generator = cmaker.configure(&ConfigureOptions {
        clargs: cmake_args,
        generator: config.build.generator,
        source_dir: params.source_dir.clone(),
        install_dir: params.install_dir.clone(),
        languages: manifest.cmake.languages.clone(),
        python: python_info(shell),
    })?;
    span.finish_with_message(format!("configured with `{}`", generator));

    let span = shell.span(Status::Building, format!("install target ({})", build_type));
    cmaker.make(&build_tool_args, &build_type, &params.source_dir)?;
    span.finish_with_message("built");

    let install_paths = cmaker.install()?;
    shell.status(
        Status::Classifying,
        format!("{} installed files", install_paths.len()),
    );
    let classifier = Classifier::new(&manifest.setup, params.clone(), layout.root());
    let classification = classifier.classify(&install_paths)?;

    let plan = plan_consolidation(
        &manifest.setup,
        layout.root(),
        &params.source_dir,
        &classification.package_data,
    )?;
    if !plan.is_empty() {
        shell.status(
            Status::Consolidating,
            format!("{} modules into the install tree", plan.copies.len()),
        );
        let mut progress = shell.progress(plan.copies.len() as u64, "Copying modules");
        plan.apply(|copy, created_dir| {
            if created_dir {
                if let Some(parent) = copy.to.parent() {
                    shell.verbose(Status::Created, relative_display(layout.root(), parent));
                }
            }
            progress.inc(format!(
                "{} -> {}",
                copy.module.file,
                relative_display(layout.root(), &copy.to)
            ));
        })?;
        progress.finish();
    }

    Ok(SetupOutput::from_build(
        manifest,
        classifier.package_prefixes(),
        &classification,
        plan.package_data,
        &command_line.args,
    ))
}

fn python_info(shell: &Shell) -> Option<PythonInfo> {
    let Some(interpreter) = python::find_interpreter() else {
        shell.warn("no Python interpreter found; PYTHON_* variables are not passed to CMake");
        return None;
    };
    match python::discover(&interpreter) {
        Ok(info) => Some(info),
        Err(e) => {
            shell.warn(format!("could not inspect {}: {:#}", interpreter.display(), e));
            None
        }
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SetupError;
    use crate::test_support::ProjectFixture;
    use crate::util::shell::{ColorChoice, Verbosity};
    use tempfile::TempDir;

    fn quiet_shell() -> Arc<Shell> {
        Arc::new(Shell::new(Verbosity::Quiet, ColorChoice::Never))
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_usage_errors_leave_no_output_tree() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::python_package("hello").write_to(tmp.path()).unwrap();
        let ctx = GlobalContext::with_cwd(root.clone());

        for args in [Vec::new(), strings(&["biuld"])] {
            let opts = SetupOptions {
                setup_args: args,
                ..Default::default()
            };
            let err = setup(&ctx, &quiet_shell(), &opts).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<SetupError>(),
                Some(SetupError::Usage { .. })
            ));
        }
        assert!(!root.join("_cmpack").exists());
    }

    #[test]
    fn test_project_without_cmakelists_hands_off_declared_config() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::python_package("hello").write_to(tmp.path()).unwrap();
        let ctx = GlobalContext::with_cwd(root.clone());

        let opts = SetupOptions {
            setup_args: strings(&["build"]),
            emit: Some(PathBuf::from("out.json")),
            ..Default::default()
        };
        setup(&ctx, &quiet_shell(), &opts).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(root.join("out.json")).unwrap()).unwrap();
        assert_eq!(value["packages"][0], "hello");
        assert_eq!(value["has_ext_modules"], false);
        assert_eq!(value["argv"][0], "build");
        assert!(!root.join("_cmpack").exists());
    }

    #[test]
    fn test_clean_removes_output_tree() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::python_package("hello")
            .with_cmakelists()
            .write_to(tmp.path())
            .unwrap();
        std::fs::create_dir_all(root.join("_cmpack/cmake-build")).unwrap();
        let ctx = GlobalContext::with_cwd(root.clone());

        let opts = SetupOptions {
            setup_args: strings(&["clean"]),
            emit: Some(PathBuf::from("out.json")),
            ..Default::default()
        };
        setup(&ctx, &quiet_shell(), &opts).unwrap();

        assert!(!root.join("_cmpack").exists());
        assert!(root.join("out.json").is_file());
    }

    #[test]
    fn test_invalid_parameters_fail_before_building() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::python_package("hello")
            .with_manifest(
                "[setup]\npackages = [\"hello\"]\n\n[cmake]\nsource-dir = \"missing\"\n",
            )
            .write_to(tmp.path())
            .unwrap();
        let ctx = GlobalContext::with_cwd(root.clone());

        let opts = SetupOptions {
            setup_args: strings(&["build"]),
            ..Default::default()
        };
        let err = setup(&ctx, &quiet_shell(), &opts).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::Configuration { .. })
        ));
        assert!(!root.join("_cmpack").exists());
    }

    #[test]
    fn test_staged_install_is_collected() {
        use crate::builder::install_manifest::parse_manifests;

        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::python_package("hello")
            .with_installed("hello/_hello.so", "")
            .with_installed("share/hello/data.txt", "")
            .write_to(tmp.path())
            .unwrap();
        let manifest = Manifest::load(&root.join("Cmpack.toml")).unwrap();
        let params = manifest.cmake_params().unwrap();
        let layout = ProjectLayout::new(&root);

        let paths = parse_manifests(&layout.build_dir(), &root).unwrap();
        let classifier = Classifier::new(&manifest.setup, params, &root);
        let classification = classifier.classify(&paths).unwrap();
        let plan = plan_consolidation(&manifest.setup, &root, "", &classification.package_data).unwrap();
        plan.apply(|_, _| {}).unwrap();

        let output = SetupOutput::from_build(
            &manifest,
            classifier.package_prefixes(),
            &classification,
            plan.package_data,
            &strings(&["bdist_wheel"]),
        );

        assert_eq!(output.package_dir["hello"], "_cmpack/cmake-install/hello");
        assert_eq!(output.package_data["hello"], vec!["_hello.so", "__init__.py"]);
        assert_eq!(
            output.data_files,
            vec![(
                "share/hello".to_string(),
                vec!["_cmpack/cmake-install/share/hello/data.txt".to_string()]
            )]
        );
        assert!(root.join("_cmpack/cmake-install/hello/__init__.py").is_file());
        assert!(output.has_ext_modules);
    }
}
