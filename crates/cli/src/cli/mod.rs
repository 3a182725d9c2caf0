
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Control adb-connected Android devices.
#[derive(Parser, Debug)]
#[command(name = "droidbridge")]
#[command(about = "Control adb-connected Android devices and bootstrap capture/input services")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// adb executable (defaults to $ANDROID_HOME/platform-tools/adb)
	#[arg(long, global = true, env = "DROIDBRIDGE_ADB", value_name = "PATH")]
	pub adb: Option<PathBuf>,

	/// Directory holding the prebuilt service binaries
	#[arg(long, global = true, env = "DROIDBRIDGE_ARTIFACTS", value_name = "DIR", default_value = "mini")]
	pub artifacts: PathBuf,

	/// Seconds to wait for pushed binaries to appear on the device
	#[arg(long, global = true, value_name = "SECS", default_value_t = 60)]
	pub deploy_timeout: u64,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List attached devices.
	Devices,
	/// Run a shell command on a device.
	Shell(ShellArgs),
	/// Create or remove a tcp to abstract-socket forward.
	Forward(ForwardArgs),
	/// Deploy and launch a device service, streaming its output until Ctrl-C.
	#[command(subcommand)]
	Start(StartAction),
	/// Print the installed version of a package.
	Version(VersionArgs),
	/// Reboot a device.
	Reboot(SerialArg),
	/// Send a key event.
	Key(KeyArgs),
}

impl Commands {
	/// Name reported in the result envelope.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Devices => "devices",
			Commands::Shell(_) => "shell",
			Commands::Forward(_) => "forward",
			Commands::Start(_) => "start",
			Commands::Version(_) => "version",
			Commands::Reboot(_) => "reboot",
			Commands::Key(_) => "key",
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct SerialArg {
	/// Device serial as listed by `droidbridge devices`
	#[arg(value_name = "SERIAL")]
	pub serial: String,
}

#[derive(Args, Debug, Clone)]
pub struct ShellArgs {
	#[arg(value_name = "SERIAL")]
	pub serial: String,

	/// Command and arguments, joined with spaces
	#[arg(value_name = "CMD", required = true, trailing_var_arg = true, allow_hyphen_values = true)]
	pub command: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ForwardArgs {
	#[arg(value_name = "SERIAL")]
	pub serial: String,

	/// Local TCP port
	#[arg(value_name = "PORT")]
	pub port: u16,

	/// Abstract socket name on the device (e.g. minicap)
	#[arg(value_name = "SERVICE")]
	pub service: String,

	/// Remove the forward instead of creating it
	#[arg(long)]
	pub remove: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum StartAction {
	/// Screen capture (minicap)
	Capture(CaptureArgs),
	/// Input injection (minitouch)
	Input(SerialArg),
}

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
	#[arg(value_name = "SERIAL")]
	pub serial: String,

	/// JPEG quality, 0 to 100
	#[arg(short, long, default_value_t = droidbridge::DEFAULT_QUALITY)]
	pub quality: u32,

	/// Display rotation in degrees
	#[arg(short, long, default_value_t = 0)]
	pub rotation: u32,
}

#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
	#[arg(value_name = "SERIAL")]
	pub serial: String,

	/// Package name (e.g. com.android.chrome)
	#[arg(value_name = "PACKAGE")]
	pub package: String,
}

#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
	#[arg(value_name = "SERIAL")]
	pub serial: String,

	/// Android key code (3 = HOME, 4 = BACK, 26 = POWER)
	#[arg(value_name = "CODE")]
	pub code: u32,
}
