//! Readers of text headers describing a raw payload, and of TIFF image
//! stacks.
pub mod dat;
pub mod mhd;
pub mod tiff_stack;

pub use self::dat::{DatHeader, DatVolumeReader};
pub use self::mhd::{MhdHeader, MhdVolumeReader};
pub use self::tiff_stack::TiffStackReader;

use crate::error::{Result, VolumeError};
use crate::url::VolumeUrl;

/// The `timeframe` query parameter of a locator, `None` when absent or
/// negative.
pub(crate) fn requested_time_frame(url: &VolumeUrl) -> Result<Option<usize>> {
    frame_parameter(url, "timeframe")
}

/// A frame index query parameter, `None` when absent or negative.
pub(crate) fn frame_parameter(url: &VolumeUrl, key: &str) -> Result<Option<usize>> {
    match url.search_parameter(key) {
        None => Ok(None),
        Some(v) => {
            let t: i64 = v.trim().parse().map_err(|_| {
                VolumeError::InvalidParameters(format!("invalid time frame {:?}", v))
            })?;
            Ok(if t < 0 { None } else { Some(t as usize) })
        }
    }
}

/// The frames to decode out of `frames`, either all of them or the one
/// requested.
pub(crate) fn frame_range(requested: Option<usize>, frames: usize) -> Result<std::ops::Range<usize>> {
    match requested {
        None => Ok(0..frames),
        Some(t) if t >= frames => Err(VolumeError::TimeFrameNotInVolume(t, frames)),
        Some(t) => Ok(t..t + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::{frame_range, requested_time_frame};
    use crate::url::VolumeUrl;

    #[test]
    fn frames() {
        assert_eq!(frame_range(None, 3).unwrap(), 0..3);
        assert_eq!(frame_range(Some(2), 3).unwrap(), 2..3);
        assert!(frame_range(Some(3), 3).is_err());
        let url = VolumeUrl::parse("a.dat?timeframe=-1");
        assert_eq!(requested_time_frame(&url).unwrap(), None);
        let url = VolumeUrl::parse("a.dat?timeframe=x");
        assert!(requested_time_frame(&url).is_err());
    }
}
