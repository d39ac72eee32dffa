//! The components this tool knows how to build.
//!
//! Each constructor returns the [`DependencySpec`] for one component against a
//! [`Layout`]. Versions and URLs live in [`crate::consts`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::consts::{
  BULLET_URL, BULLET_VERSION, MYGUI_URL, MYGUI_VERSION, OPENMW_OSG_BRANCH, OPENMW_URL, OSG_URL, RAKNET_URL,
  RAKNET_VERSION, TES3MP_URL, UNSHIELD_URL, UNSHIELD_VERSION,
};
use crate::recipe::{DependencySpec, Layout};

/// Every buildable component, in build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
  Osg,
  Bullet,
  Unshield,
  MyGui,
  RakNet,
  OpenMw,
  Tes3mp,
}

impl Component {
  /// Components forced by `--force-all`.
  pub const OPENMW_SET: [Component; 5] = [
    Component::Osg,
    Component::Bullet,
    Component::Unshield,
    Component::MyGui,
    Component::OpenMw,
  ];

  /// Components forced by `--force-all-tes3mp`.
  pub const TES3MP_SET: [Component; 6] = [
    Component::Osg,
    Component::Bullet,
    Component::Unshield,
    Component::MyGui,
    Component::RakNet,
    Component::Tes3mp,
  ];

  /// Directory name under the source root, and recipe name.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Osg => "osg-openmw",
      Self::Bullet => "bullet",
      Self::Unshield => "unshield",
      Self::MyGui => "mygui",
      Self::RakNet => "raknet",
      Self::OpenMw => "openmw",
      Self::Tes3mp => "tes3mp",
    }
  }
}

impl fmt::Display for Component {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// OpenMW's OSG fork, cloned from its release branch and pinned to the remote tip.
pub fn osg(layout: &Layout) -> DependencySpec {
  let name = Component::Osg.name();
  DependencySpec::cmake(
    name,
    OSG_URL,
    &format!("origin/{OPENMW_OSG_BRANCH}"),
    layout.prefix_join(name).join("lib/libosg.so"),
  )
  .with_clone_branch(OPENMW_OSG_BRANCH)
  .with_cmake_args([
    "-DBUILD_OSG_PLUGINS_BY_DEFAULT=0",
    "-DBUILD_OSG_PLUGIN_OSG=1",
    "-DBUILD_OSG_PLUGIN_DDS=1",
    "-DBUILD_OSG_PLUGIN_TGA=1",
    "-DBUILD_OSG_PLUGIN_BMP=1",
    "-DBUILD_OSG_PLUGIN_JPEG=1",
    "-DBUILD_OSG_PLUGIN_PNG=1",
    "-DBUILD_OSG_DEPRECATED_SERIALIZERS=0",
  ])
}

pub fn bullet(layout: &Layout) -> DependencySpec {
  let name = Component::Bullet.name();
  DependencySpec::cmake(
    name,
    BULLET_URL,
    BULLET_VERSION,
    layout.prefix_join(name).join("lib/libLinearMath.so"),
  )
  .with_cmake_args([
    "-DINSTALL_LIBS=on",
    "-DBUILD_SHARED_LIBS=on",
    "-DBULLET2_MULTITHREADING=on",
    "-DUSE_DOUBLE_PRECISION=on",
  ])
}

pub fn unshield(layout: &Layout) -> DependencySpec {
  let name = Component::Unshield.name();
  DependencySpec::cmake(
    name,
    UNSHIELD_URL,
    UNSHIELD_VERSION,
    layout.prefix_join(name).join("bin/unshield"),
  )
}

pub fn mygui(layout: &Layout) -> DependencySpec {
  let name = Component::MyGui.name();
  DependencySpec::cmake(
    name,
    MYGUI_URL,
    MYGUI_VERSION,
    layout.prefix_join(name).join("lib/libMyGUIEngine.so"),
  )
  .with_cmake_args([
    "-DMYGUI_BUILD_TOOLS=OFF",
    "-DMYGUI_RENDERSYSTEM=1",
    "-DMYGUI_BUILD_DEMOS=OFF",
    "-DMYGUI_BUILD_PLUGINS=OFF",
  ])
}

/// RakNet is linked statically from its build tree and never installed.
pub fn raknet(layout: &Layout) -> DependencySpec {
  let name = Component::RakNet.name();
  DependencySpec::cmake(name, RAKNET_URL, RAKNET_VERSION, raknet_static_lib(layout))
    .with_install(false)
    .with_cmake_args([
      "-DRAKNET_ENABLE_DLL=OFF",
      "-DRAKNET_ENABLE_SAMPLES=OFF",
      "-DRAKNET_ENABLE_STATIC=ON",
      "-DRAKNET_GENERATE_INCLUDE_ONLY_DIR=ON",
    ])
}

/// `<src>/raknet/build/lib`
pub fn raknet_lib_dir(layout: &Layout) -> PathBuf {
  layout.src_root.join(Component::RakNet.name()).join("build/lib")
}

fn raknet_static_lib(layout: &Layout) -> PathBuf {
  raknet_lib_dir(layout).join("libRakNetLibStatic.a")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BuildType {
  #[default]
  Release,
  Debug,
}

impl BuildType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Release => "Release",
      Self::Debug => "Debug",
    }
  }
}

/// Optional OpenMW executables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMwTools {
  pub cs: bool,
  pub essimporter: bool,
  pub iniimporter: bool,
  pub launcher: bool,
  pub wizard: bool,
}

impl Default for OpenMwTools {
  fn default() -> Self {
    Self {
      cs: true,
      essimporter: false,
      iniimporter: true,
      launcher: true,
      wizard: true,
    }
  }
}

/// Explicit include and library paths for every OSG module OpenMW links.
pub fn osg_cmake_args(osg: &Path) -> Vec<String> {
  const MODULES: [(&str, &str); 9] = [
    ("OPENTHREADS", "OpenThreads"),
    ("OSG", "osg"),
    ("OSGDB", "osgDB"),
    ("OSGFX", "osgFX"),
    ("OSGGA", "osgGA"),
    ("OSGPARTICLE", "osgParticle"),
    ("OSGTEXT", "osgText"),
    ("OSGUTIL", "osgUtil"),
    ("OSGVIEWER", "osgViewer"),
  ];

  let include = osg.join("include");
  let lib = osg.join("lib");
  MODULES
    .iter()
    .flat_map(|(var, file)| {
      [
        format!("-D{var}_INCLUDE_DIR={}", include.display()),
        format!("-D{var}_LIBRARY={}", lib.join(format!("lib{file}.so")).display()),
      ]
    })
    .collect()
}

/// CMake arguments for OpenMW. `osg` is the fork's install dir, `None` for the system OSG.
pub fn openmw_cmake_args(build_type: BuildType, osg: Option<&Path>, tools: OpenMwTools) -> Vec<String> {
  let mut args = vec![
    "-DBOOST_ROOT=/usr/include/boost".to_string(),
    format!("-DCMAKE_BUILD_TYPE={}", build_type.as_str()),
  ];
  if let Some(osg) = osg {
    args.extend(osg_cmake_args(osg));
  }

  let disabled = [
    (!tools.essimporter, "BUILD_ESSIMPORTER"),
    (!tools.cs, "BUILD_OPENCS"),
    (!tools.iniimporter, "BUILD_MWINIIMPORTER"),
    (!tools.launcher, "BUILD_LAUNCHER"),
    (!tools.wizard, "BUILD_WIZARD"),
  ];
  args.extend(disabled.iter().filter(|(off, _)| *off).map(|(_, var)| format!("-D{var}=no")));

  let lto = if build_type == BuildType::Debug { "off" } else { "on" };
  args.push(format!("-DOPENMW_LTO_BUILD={lto}"));
  args
}

/// OpenMW, installed to `<prefix>/<install_name>`.
pub fn openmw(layout: &Layout, reference: &str, install_name: &str, args: Vec<String>) -> DependencySpec {
  let name = Component::OpenMw.name();
  DependencySpec::cmake(
    name,
    OPENMW_URL,
    reference,
    layout.prefix_join(install_name).join("bin/openmw"),
  )
  .with_install_subpath(install_name)
  .with_cmake_args(args)
}

/// Binary whose presence in the TES3MP build tree means it is built.
pub fn tes3mp_binary(server_only: bool) -> &'static str {
  if server_only { "tes3mp-server" } else { "tes3mp" }
}

pub fn tes3mp_cmake_args(layout: &Layout, server_only: bool) -> Vec<String> {
  let raknet_src = layout.src_root.join(Component::RakNet.name());
  let static_lib = raknet_static_lib(layout);

  let mut args: Vec<String> = [
    "-Wno-dev",
    "-DBUILD_OPENMW_MP=ON",
    "-DCMAKE_BUILD_TYPE=Release",
    "-DBUILD_OPENCS=OFF",
    "-DCMAKE_CXX_STANDARD=14",
    "-DCMAKE_CXX_FLAGS=\"-std=c++14\"",
    "-DDESIRED_QT_VERSION=5",
  ]
  .into_iter()
  .map(String::from)
  .collect();
  args.push(format!("-DRakNet_INCLUDES={}", raknet_src.join("include").display()));
  args.push(format!("-DRakNet_LIBRARY_DEBUG={}", static_lib.display()));
  args.push(format!("-DRakNet_LIBRARY_RELEASE={}", static_lib.display()));

  if server_only {
    args.extend(
      [
        "BUILD_BROWSER",
        "BUILD_BSATOOL",
        "BUILD_ESMTOOL",
        "BUILD_ESSIMPORTER",
        "BUILD_LAUNCHER",
        "BUILD_MWINIIMPORTER",
        "BUILD_MYGUI_PLUGIN",
        "BUILD_OPENMW",
        "BUILD_WIZARD",
      ]
      .iter()
      .map(|var| format!("-D{var}=OFF")),
    );
  }
  args
}

/// TES3MP. Its check-file lives in the build tree, so it is found whether or not it is installed.
pub fn tes3mp(layout: &Layout, reference: &str, install_name: &str, server_only: bool, install: bool) -> DependencySpec {
  let name = Component::Tes3mp.name();
  let check_file = layout.src_root.join(name).join("build").join(tes3mp_binary(server_only));
  DependencySpec::cmake(name, TES3MP_URL, reference, check_file)
    .with_install_subpath(install_name)
    .with_install(install)
    .with_cmake_args(tes3mp_cmake_args(layout, server_only))
}
