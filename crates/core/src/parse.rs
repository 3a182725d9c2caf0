//! Parsers for the textual output of device shell commands.

/// Sentinel returned when `wm size` output cannot be interpreted.
pub const UNKNOWN_SIZE: &str = "unknown";

const OVERRIDE_MARKER: &str = "Override size";
const MAX_SIZE_LEN: usize = 20;
const MAX_VERSION_LEN: usize = 50;

/// Extracts the resolution from `wm size` output.
///
/// Takes the first `:`-delimited field after the label. When an override is
/// active the next line's label runs into that field and is stripped, so the
/// physical size wins. Anything longer than a plausible `WxH` yields
/// [`UNKNOWN_SIZE`].
pub fn parse_screen_size(output: &str) -> String {
	let Some(field) = output.split(':').nth(1) else {
		return UNKNOWN_SIZE.to_string();
	};
	let size = field.trim().replace(['\r', '\n'], "").replace(OVERRIDE_MARKER, "");
	if size.is_empty() || size.len() > MAX_SIZE_LEN {
		UNKNOWN_SIZE.to_string()
	} else {
		size
	}
}

/// Extracts the value of the first `versionName=` line of `pm dump` output.
///
/// Values longer than 50 characters are cut at the first space, which drops
/// trailing fields some vendors append on the same line.
pub fn parse_app_version(output: &str) -> Option<String> {
	let line = output.lines().find(|line| line.contains('='))?;
	let (_, value) = line.split_once('=')?;
	let value = value.trim_end_matches(['\r', '\n']);
	let value = if value.chars().count() > MAX_VERSION_LEN {
		let value = value.trim_start_matches(' ');
		value.split(' ').next().unwrap_or(value)
	} else {
		value
	};
	Some(value.replace(['\r', '\n'], ""))
}

/// Parses `ro.build.version.sdk`.
pub fn parse_api_level(value: &str) -> Option<u32> {
	value.trim().parse().ok()
}
