//! The build command: turn arguments into [`BuildOptions`] and run the driver.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, warn};

use omwbuild_lib::catalog::{BuildType, Component, OpenMwTools};
use omwbuild_lib::consts::default_jobs;
use omwbuild_lib::driver::{self, Application, BuildOptions, BuildReport, RevisionSelector};
use omwbuild_lib::exec::SystemExecutor;

use crate::Cli;
use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success};

/// Resolve command-line arguments into driver options.
fn build_options(cli: &Cli) -> Result<BuildOptions> {
  let mut options = BuildOptions::new(&cli.install_prefix);
  if let Some(src_dir) = &cli.src_dir {
    options.src_dir = src_dir.clone();
  }
  options.jobs = cli.jobs.unwrap_or_else(default_jobs);
  if options.jobs == 0 {
    bail!("--jobs must be at least 1");
  }

  options.revision = match (&cli.branch, &cli.sha, &cli.tag) {
    (Some(branch), _, _) => Some(RevisionSelector::Branch(branch.clone())),
    (_, Some(sha), _) => Some(RevisionSelector::Sha(sha.clone())),
    (_, _, Some(tag)) => Some(RevisionSelector::Tag(tag.clone())),
    _ => None,
  };

  if cli.tes3mp_server_only {
    options.application = Application::Tes3mp { server_only: true };
  } else if cli.tes3mp {
    options.application = Application::Tes3mp { server_only: false };
  }

  let flags = [
    (cli.force_osg, Component::Osg),
    (cli.force_bullet, Component::Bullet),
    (cli.force_unshield, Component::Unshield),
    (cli.force_mygui, Component::MyGui),
    (cli.force_raknet, Component::RakNet),
    (cli.force_openmw, Component::OpenMw),
    (cli.force_tes3mp, Component::Tes3mp),
  ];
  options.force.extend(flags.iter().filter(|(on, _)| *on).map(|(_, c)| *c));
  if cli.force_all {
    options.force_all(&Component::OPENMW_SET);
  }
  if cli.force_all_tes3mp {
    options.force_all(&Component::TES3MP_SET);
  }

  if let Some(patch) = &cli.patch {
    if !patch.is_file() {
      bail!("the patch file '{}' does not exist", patch.display());
    }
    options.patch = Some(patch.clone());
  }

  options.system_osg = cli.system_osg;
  options.system_bullet = cli.system_bullet;
  options.build_mygui = cli.build_mygui;
  options.build_unshield = cli.build_unshield;
  options.make_install = cli.make_install;
  options.pull = !cli.no_pull;
  options.skip_install_pkgs = cli.skip_install_pkgs;
  options.packages = cli.packages.clone();
  options.with_corescripts = cli.with_corescripts;
  options.build_type = if cli.with_debug { BuildType::Debug } else { BuildType::Release };
  options.tools = OpenMwTools {
    cs: !cli.without_cs,
    essimporter: cli.with_essimporter,
    iniimporter: !cli.without_iniimporter,
    launcher: !cli.without_launcher,
    wizard: !cli.without_wizard,
  };

  Ok(options)
}

/// Run the whole build, racing it against Ctrl-C.
///
/// On interrupt the driver future is dropped before returning, which kills any running child.
pub fn cmd_build(cli: Cli) -> Result<()> {
  let options = build_options(&cli)?;
  let executor = SystemExecutor::new(cli.verbose);

  info!(
    app = options.application.name(),
    prefix = %options.install_prefix.display(),
    jobs = options.jobs,
    "starting build"
  );

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  let report = runtime.block_on(until_interrupted(
    async { driver::run(&options, &executor).await.map_err(anyhow::Error::from) },
    tokio::signal::ctrl_c(),
  ))?;

  print_report(&report, cli.output)
}

/// Drive `work` to completion unless `interrupt` fires first.
///
/// A listener that fails to register is not an interrupt; the work keeps running without one.
async fn until_interrupted<T>(
  work: impl Future<Output = Result<T>>,
  interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<T> {
  tokio::pin!(work);
  tokio::select! {
    result = &mut work => result,
    signal = interrupt => match signal {
      Ok(()) => Err(anyhow!("Ctrl-c received!")),
      Err(e) => {
        warn!(error = %e, "unable to listen for Ctrl-C, continuing without it");
        work.await
      }
    },
  }
}

fn print_report(report: &BuildReport, output: OutputFormat) -> Result<()> {
  if output.is_json() {
    return print_json(report);
  }

  let names = |components: Vec<Component>| {
    if components.is_empty() {
      "none".to_string()
    } else {
      components.iter().map(Component::name).collect::<Vec<_>>().join(", ")
    }
  };

  println!();
  print_success(&format!("{} {} built", report.application.name(), report.revision));
  print_stat("Built", &names(report.built().collect()));
  print_stat("Skipped", &names(report.skipped().collect()));
  print_stat("Install dir", &report.install_dir.display().to_string());
  if report.promoted {
    print_stat("Linked as", report.application.name());
  }
  if let Some(scripts) = &report.corescripts {
    print_stat("CoreScripts", &scripts.display().to_string());
  }
  if report.package_failures > 0 {
    print_stat("Package installs failed", &report.package_failures.to_string());
  }
  print_stat("Took", &format_duration(Duration::from_millis(report.elapsed_ms)));

  Ok(())
}
