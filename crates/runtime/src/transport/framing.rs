//! Framing for `adb track-devices` output.
//!
//! Each update is a 4-digit lowercase hex length followed by that many bytes
//! of device list text:
//!
//! ```text
//! 0017emulator-5554\tdevice\n
//! 0000
//! ```
//!
//! An empty payload means no devices are attached.

use droidbridge_protocol::{DeviceHandle, parse_device_list};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Reads successive device lists from a track-devices byte stream.
pub struct TrackDevicesReader<R> {
	reader: R,
}

impl<R> TrackDevicesReader<R>
where
	R: AsyncRead + Unpin,
{
	pub fn new(reader: R) -> Self {
		Self { reader }
	}

	/// Reads the next device list.
	///
	/// Returns `Ok(None)` on a clean end of stream between frames.
	pub async fn next_list(&mut self) -> Result<Option<Vec<DeviceHandle>>> {
		let mut len_buf = [0u8; 4];
		let mut filled = 0;
		while filled < len_buf.len() {
			let n = self.reader.read(&mut len_buf[filled..]).await?;
			if n == 0 {
				if filled == 0 {
					return Ok(None);
				}
				return Err(Error::Transport("Failed to read length prefix: truncated frame".to_string()));
			}
			filled += n;
		}

		let len = parse_hex_len(&len_buf)?;
		let mut payload = vec![0u8; len];
		self.reader
			.read_exact(&mut payload)
			.await
			.map_err(|e| Error::Transport(format!("Failed to read device list payload: {e}")))?;

		Ok(Some(parse_device_list(&String::from_utf8_lossy(&payload))))
	}
}

fn parse_hex_len(prefix: &[u8; 4]) -> Result<usize> {
	std::str::from_utf8(prefix)
		.ok()
		.and_then(|s| usize::from_str_radix(s, 16).ok())
		.ok_or_else(|| Error::Transport(format!("Failed to read length prefix: {:?}", String::from_utf8_lossy(prefix))))
}
