use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter directives for a `-v` count.
///
/// Event targets are `droidbridge.<area>`, so a `droidbridge` directive covers
/// every crate in the workspace.
pub fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error",
		1 => "warn,droidbridge=info",
		_ => "info,droidbridge=debug",
	}
}

pub fn init_logging(verbosity: u8) {
	// RUST_LOG wins over the -v count
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quiet_by_default() {
		assert_eq!(default_filter(0), "error");
	}

	#[test]
	fn single_v_enables_info_for_droidbridge_targets() {
		assert_eq!(default_filter(1), "warn,droidbridge=info");
	}

	#[test]
	fn repeated_v_enables_debug() {
		assert_eq!(default_filter(2), "info,droidbridge=debug");
		assert_eq!(default_filter(5), default_filter(2));
	}

	#[test]
	fn every_level_parses_as_env_filter() {
		for verbosity in 0..=3 {
			assert!(EnvFilter::try_new(default_filter(verbosity)).is_ok());
		}
	}
}
