mod cmd;
mod output;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omwbuild_lib::consts::DEFAULT_INSTALL_PREFIX;
use output::{OutputFormat, print_fatal};

/// Build OpenMW (or TES3MP) and its dependencies from source
#[derive(Parser)]
#[command(name = "build-openmw")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// The git branch to build (the tip of)
  #[arg(short, long, group = "revision")]
  branch: Option<String>,

  /// The git sha1sum to build
  #[arg(short, long, group = "revision")]
  sha: Option<String>,

  /// The git release tag to build
  #[arg(short, long, group = "revision")]
  tag: Option<String>,

  /// Don't try to build LibBullet
  #[arg(long)]
  system_bullet: bool,

  /// Use the system OSG instead of building OpenMW's fork
  #[arg(long)]
  system_osg: bool,

  /// Build MyGUI instead of using the system package
  #[arg(long)]
  build_mygui: bool,

  /// Build Unshield instead of using the system package
  #[arg(long)]
  build_unshield: bool,

  /// Force build LibBullet
  #[arg(long)]
  force_bullet: bool,

  /// Force build MyGUI
  #[arg(long)]
  force_mygui: bool,

  /// Force build OpenMW
  #[arg(long)]
  force_openmw: bool,

  /// Force build OSG
  #[arg(long)]
  force_osg: bool,

  /// Force build RakNet
  #[arg(long)]
  force_raknet: bool,

  /// Force build TES3MP
  #[arg(long)]
  force_tes3mp: bool,

  /// Force build Unshield
  #[arg(long)]
  force_unshield: bool,

  /// Force build all OpenMW dependencies and OpenMW
  #[arg(long)]
  force_all: bool,

  /// Force build all TES3MP dependencies and TES3MP
  #[arg(long)]
  force_all_tes3mp: bool,

  /// Where everything is installed
  #[arg(long, env = "BUILD_OPENMW_PREFIX", default_value = DEFAULT_INSTALL_PREFIX)]
  install_prefix: PathBuf,

  /// Where sources are cloned [default: <install-prefix>/src]
  #[arg(long, env = "BUILD_OPENMW_SRC_DIR")]
  src_dir: Option<PathBuf>,

  /// Parallel jobs for make [default: CPU count + 1]
  #[arg(short, long, env = "BUILD_OPENMW_JOBS")]
  jobs: Option<usize>,

  /// Install TES3MP into the prefix (OpenMW is always installed)
  #[arg(short = 'i', long)]
  make_install: bool,

  /// Don't fetch updates before building
  #[arg(short = 'N', long)]
  no_pull: bool,

  /// Path to a patch file that should be applied
  #[arg(short = 'P', long)]
  patch: Option<PathBuf>,

  /// Don't try to install dependency packages
  #[arg(short = 'S', long)]
  skip_install_pkgs: bool,

  /// Package table replacing the built-in one
  #[arg(long, value_name = "FILE")]
  packages: Option<PathBuf>,

  /// Build TES3MP
  #[arg(long)]
  tes3mp: bool,

  /// Build TES3MP (server only)
  #[arg(long)]
  tes3mp_server_only: bool,

  /// Also clone down the TES3MP CoreScripts repo
  #[arg(long)]
  with_corescripts: bool,

  /// Build OpenMW with debug symbols
  #[arg(long)]
  with_debug: bool,

  /// Build the save importer
  #[arg(long)]
  with_essimporter: bool,

  /// Don't build the construction set
  #[arg(long)]
  without_cs: bool,

  /// Don't build the ini importer
  #[arg(long)]
  without_iniimporter: bool,

  /// Don't build the launcher
  #[arg(long)]
  without_launcher: bool,

  /// Don't build the install wizard
  #[arg(long)]
  without_wizard: bool,

  /// Output format for the summary
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Enable verbose output
  #[arg(short, long, conflicts_with = "quiet")]
  verbose: bool,

  /// Only print warnings and errors
  #[arg(short, long)]
  quiet: bool,
}

fn main() {
  let cli = Cli::parse();

  let level = if cli.verbose {
    "debug"
  } else if cli.quiet {
    "warn"
  } else {
    "info"
  };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(err) = cmd::cmd_build(cli) {
    print_fatal(&err.to_string());
    std::process::exit(1);
  }
}
