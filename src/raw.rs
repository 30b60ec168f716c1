//! Decoding of raw voxel payloads described by [`DecodeHints`].
//!
//! The [`RawVoxelDecoder`] reads full volumes, slice ranges, bricks and
//! stacks of single-slice files. Every read opens the payload, seeks to the
//! offset derived from the hints, reads into a freshly allocated
//! [`VoxelBuffer`], then normalizes tensor element order, byte order and
//! slice order in place.
//!
//! [`DecodeHints`]: ../hints/struct.DecodeHints.html
//! [`RawVoxelDecoder`]: ./struct.RawVoxelDecoder.html
//! [`VoxelBuffer`]: ../volume/struct.VoxelBuffer.html
use crate::error::{Result, VolumeError};
use crate::hints::DecodeHints;
use crate::logging::Logger;
use crate::typedef::{ChannelLayout, TensorLayout, VoxelType};
use crate::url::VolumeUrl;
use crate::util::{native_endianness, open_file, ReadSeek};
use crate::volume::{DecodedVolume, VolumeBatch, VoxelBuffer};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Query keys of a brick read carried by a `raw://` locator.
pub const BRICK_KEYS: [&str; 4] = ["brick_x", "brick_y", "brick_z", "brick_size"];

/// Receiver of progress reports during long reads. Calls are made
/// synchronously from within the read loop.
pub trait ProgressSink {
    /// Report the completed fraction of the current read, in `[0, 1]`.
    fn set_progress(&mut self, progress: f32);

    /// Report what is being read.
    fn set_message(&mut self, _message: &str) {}
}

/// Decoder of raw voxel payloads.
///
/// The decoder holds the hints of the next read. A `raw://` locator whose
/// query carries hints replaces them before reading, so the origin locator
/// of any decoded volume can be fed back to reproduce the same bytes.
pub struct RawVoxelDecoder {
    hints: DecodeHints,
    logger: Logger,
    progress: Option<Box<dyn ProgressSink>>,
}

impl fmt::Debug for RawVoxelDecoder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RawVoxelDecoder")
            .field("hints", &self.hints)
            .field("logger", &self.logger)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for RawVoxelDecoder {
    fn default() -> Self {
        RawVoxelDecoder::new(DecodeHints::default())
    }
}

impl RawVoxelDecoder {
    /// Create a decoder with the given hints.
    pub fn new(hints: DecodeHints) -> Self {
        RawVoxelDecoder::with_logger(hints, Logger::new("volread.RawVoxelDecoder"))
    }

    /// Create a decoder with the given hints, logging under the given handle.
    pub fn with_logger(hints: DecodeHints, logger: Logger) -> Self {
        RawVoxelDecoder {
            hints,
            logger,
            progress: None,
        }
    }

    /// The hints used by the next read.
    pub fn hints(&self) -> &DecodeHints {
        &self.hints
    }

    /// Replace the hints used by the next read.
    pub fn set_hints(&mut self, hints: DecodeHints) {
        self.hints = hints;
    }

    /// Attach or detach a progress sink.
    pub fn set_progress_sink(&mut self, sink: Option<Box<dyn ProgressSink>>) {
        self.progress = sink;
    }

    /// Read the whole volume (one time frame) at the locator's path.
    ///
    /// A `raw://` locator with brick parameters repeats that brick read.
    ///
    /// # Errors
    ///
    /// - `VolumeError::NotFound` if the payload cannot be opened.
    /// - `VolumeError::Truncated` if the payload ends early.
    /// - `VolumeError::InvalidParameters` or `VolumeError::UnsupportedFormat`
    /// on invalid hints.
    pub fn read(&mut self, url: &VolumeUrl) -> Result<VolumeBatch> {
        self.take_url_hints(url)?;
        if let Some(size) = url.search_parameter(BRICK_KEYS[3]) {
            let mut start = [0usize; 3];
            for (s, key) in start.iter_mut().zip(BRICK_KEYS.iter()) {
                *s = parse_brick_param(key, url.search_parameter(key).unwrap_or("0"))?;
            }
            let size = parse_brick_param(BRICK_KEYS[3], size)?;
            return self.read_brick(url, start, size);
        }
        let hints = self.hints.clone();
        let volume = self.decode_file(&hints, &url.file_path(), 0, 0)?;
        Ok(std::iter::once(volume).collect())
    }

    /// Read the slices `first..last` of the volume. Both zero reads the
    /// whole volume. A payload ending within the range is tolerated; the
    /// missing voxels stay zero.
    ///
    /// # Errors
    ///
    /// As `read`, plus `VolumeError::InvalidParameters` if the range is
    /// empty or exceeds the volume.
    pub fn read_slices(&mut self, url: &VolumeUrl, first: usize, last: usize) -> Result<VolumeBatch> {
        self.take_url_hints(url)?;
        let hints = self.hints.clone();
        let volume = self.decode_file(&hints, &url.file_path(), first, last)?;
        Ok(std::iter::once(volume).collect())
    }

    /// Read a cube of `size` voxels per side starting at voxel `start`,
    /// without reading the rest of the volume.
    ///
    /// # Errors
    ///
    /// As `read`, plus `VolumeError::InvalidParameters` if the brick
    /// exceeds the volume, and `VolumeError::UnsupportedOperation` for
    /// planar tensor layouts.
    pub fn read_brick(&mut self, url: &VolumeUrl, start: [usize; 3], size: usize) -> Result<VolumeBatch> {
        self.take_url_hints(url)?;
        let hints = self.hints.clone();
        let voxel_type = hints.validate()?;
        if hints.layout.is_fused() {
            return Err(VolumeError::UnsupportedOperation(
                "brick reads of planar tensor layouts",
            ));
        }
        let dim = hints.dimensions;
        let outside = |i: usize| start[i].checked_add(size).map_or(true, |end| end > dim[i]);
        if size == 0 || (0..3).any(outside) {
            return Err(VolumeError::InvalidParameters(format!(
                "brick of size {} at {:?} exceeds volume of {:?} voxels",
                size, start, dim
            )));
        }
        // the brick is located in normalized coordinates, mirror it onto
        // the stored order along a reversed axis
        let mut stored = start;
        if let Some(axis) = hints.slice_order.reversal() {
            let a = axis as usize;
            stored[a] = dim[a] - start[a] - size;
        }

        let path = url.file_path();
        let mut buffer = VoxelBuffer::zeroed([size; 3], voxel_type)?;
        let bpv = voxel_type.bytes_per_voxel() as u64;
        let [nx, ny, nz] = [dim[0] as u64, dim[1] as u64, dim[2] as u64];
        let frame = hints.time_frame.unwrap_or(0);
        let [sx, sy, sz] = [stored[0] as u64, stored[1] as u64, stored[2] as u64];
        let size64 = size as u64;
        let offset = payload_offset(
            hints.header_skip,
            nx * ny * nz * bpv,
            frame,
            ((sz * ny + sy) * nx + sx) * bpv,
        )?;

        log_info!(
            self.logger,
            "Reading brick of {} voxels at {:?} from {}",
            size,
            start,
            path.display()
        );
        let mut file = open_file(&path)?;
        let _ = file.seek(SeekFrom::Start(offset))?;
        let row_len = size * voxel_type.bytes_per_voxel();
        let row_skip = ((nx - size64) * bpv) as i64;
        let plane_skip = ((ny - size64) * nx * bpv) as i64;
        let mut got = 0u64;
        {
            let data = buffer.raw_data_mut();
            let mut rows = data.chunks_exact_mut(row_len);
            for z in 0..size {
                for _ in 0..size {
                    if let Some(row) = rows.next() {
                        got += read_fully(&mut file, row)? as u64;
                    }
                    let _ = file.seek(SeekFrom::Current(row_skip))?;
                }
                let _ = file.seek(SeekFrom::Current(plane_skip))?;
                self.report((z + 1) as f32 / size as f32);
            }
        }
        let expected = buffer.raw_data().len() as u64;
        if got < expected {
            log_warn!(
                self.logger,
                "Brick read from {} ended early ({} of {} bytes)",
                path.display(),
                got,
                expected
            );
        }
        if let ChannelLayout::Tensor2(layout) = hints.layout {
            buffer = reorder_tensor(buffer, layout)?;
        }
        self.normalize(&hints, &mut buffer);

        let mut origin = hints.clone().with_time_frame(Some(frame)).to_url(&path);
        for (key, v) in BRICK_KEYS.iter().zip([start[0], start[1], start[2], size].iter()) {
            origin.add_search_parameter(key, v);
        }
        let volume = self.wrap(&hints, buffer, frame, origin);
        Ok(std::iter::once(volume).collect())
    }

    /// Read a list of single-slice files into one volume, in list order.
    /// The z dimension of the hints is taken as 1. Slices which fail to
    /// decode, or whose payload past the header skip is not exactly one
    /// slice long, are logged and left out. An empty batch is returned when
    /// no slice could be read.
    pub fn read_slice_stack<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<VolumeBatch> {
        let mut hints = self.hints.clone().with_time_frame(Some(0));
        hints.dimensions[2] = 1;
        let voxel_type = hints.validate()?;
        let slice_bytes = (hints.dimensions[0] * hints.dimensions[1] * voxel_type.bytes_per_voxel()) as u64;

        let mut slices: Vec<VoxelBuffer> = Vec::with_capacity(paths.len());
        let mut first_path = None;
        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            if let Some(sink) = self.progress.as_mut() {
                sink.set_message(&format!("Loading slice {}", path.display()));
            }
            let decoded = payload_len(path, hints.header_skip).and_then(|len| {
                if len != slice_bytes {
                    return Err(VolumeError::InvalidParameters(format!(
                        "{} bytes of payload instead of {}",
                        len, slice_bytes
                    )));
                }
                self.decode_file(&hints, path, 0, 0)
            });
            match decoded {
                Ok(v) => {
                    if first_path.is_none() {
                        first_path = Some(path.to_owned());
                    }
                    slices.push(v.into_buffer());
                }
                Err(e) => {
                    log_error!(self.logger, "Skipping slice {}: {}", path.display(), e);
                }
            }
            self.report((i + 1) as f32 / paths.len() as f32);
        }

        let first_path = match first_path {
            Some(p) => p,
            None => return Ok(VolumeBatch::new()),
        };
        let dim = [hints.dimensions[0], hints.dimensions[1], slices.len()];
        let mut buffer = VoxelBuffer::zeroed(dim, voxel_type)?;
        for (dst, src) in buffer
            .raw_data_mut()
            .chunks_exact_mut(slices[0].raw_data().len())
            .zip(&slices)
        {
            dst.copy_from_slice(src.raw_data());
        }
        let mut stack_hints = hints.clone();
        stack_hints.dimensions = dim;
        let origin = stack_hints.to_url(&first_path);
        let volume = self.wrap(&hints, buffer, 0, origin);
        Ok(std::iter::once(volume).collect())
    }

    /// Decode a whole frame from an already open source, using the current
    /// hints. `origin_path` names the payload in the origin locator.
    pub fn decode_source<R: ReadSeek>(&mut self, source: R, origin_path: &Path) -> Result<DecodedVolume> {
        self.decode_source_slices(source, origin_path, 0, 0)
    }

    /// Decode the slices `first..last` of a frame from an already open
    /// source, as `read_slices` does for a file.
    pub fn decode_source_slices<R: ReadSeek>(
        &mut self,
        source: R,
        origin_path: &Path,
        first: usize,
        last: usize,
    ) -> Result<DecodedVolume> {
        let hints = self.hints.clone();
        self.decode_from(&hints, source, origin_path, first, last)
    }

    fn take_url_hints(&mut self, url: &VolumeUrl) -> Result<()> {
        if url.protocol() == Some("raw") && !url.query().is_empty() {
            self.hints = DecodeHints::from_url(url)?;
        }
        Ok(())
    }

    fn decode_file(&mut self, hints: &DecodeHints, path: &Path, first: usize, last: usize) -> Result<DecodedVolume> {
        // validate before touching the file system
        let _ = hints.validate()?;
        let file = open_file(path)?;
        self.decode_from(hints, file, path, first, last)
    }

    fn decode_from<R: ReadSeek>(
        &mut self,
        hints: &DecodeHints,
        mut source: R,
        path: &Path,
        first: usize,
        last: usize,
    ) -> Result<DecodedVolume> {
        let voxel_type = hints.validate()?;
        let dim = hints.dimensions;
        let bounded = !(first == 0 && last == 0);
        if bounded {
            if last <= first || last > dim[2] {
                return Err(VolumeError::InvalidParameters(format!(
                    "slice range {}..{} outside of 0..{}",
                    first, last, dim[2]
                )));
            }
            if hints.layout.is_fused() {
                return Err(VolumeError::UnsupportedOperation(
                    "slice reads of planar tensor layouts",
                ));
            }
        }
        let effective = if bounded {
            [dim[0], dim[1], last - first]
        } else {
            dim
        };

        let mut buffer = VoxelBuffer::zeroed(effective, voxel_type)?;
        let bpv = voxel_type.bytes_per_voxel() as u64;
        let plane = dim[0] as u64 * dim[1] as u64 * bpv;
        let frame = hints.time_frame.unwrap_or(0);
        let offset = payload_offset(hints.header_skip, plane * dim[2] as u64, frame, plane * first as u64)?;

        log_info!(
            self.logger,
            "Reading {} ({:?} voxels of {}, offset {})",
            path.display(),
            effective,
            voxel_type,
            offset
        );
        let _ = source.seek(SeekFrom::Start(offset))?;
        let mut got = 0u64;
        let nz = effective[2];
        for (z, slice) in buffer.raw_data_mut().chunks_exact_mut(plane as usize).enumerate() {
            let n = read_fully(&mut source, slice)?;
            got += n as u64;
            self.report((z + 1) as f32 / nz as f32);
            if n < slice.len() {
                break;
            }
        }
        let expected = buffer.raw_data().len() as u64;
        if got < expected {
            if !bounded {
                return Err(VolumeError::Truncated(path.to_owned(), expected, got));
            }
            log_warn!(
                self.logger,
                "Unexpected end of file in {}: read {} of {} bytes",
                path.display(),
                got,
                expected
            );
        }

        if let ChannelLayout::Tensor2(layout) = hints.layout {
            buffer = reorder_tensor(buffer, layout)?;
        }
        self.normalize(hints, &mut buffer);

        let origin = if bounded {
            let mut h = hints.clone().with_header_skip(offset).with_time_frame(Some(0));
            h.dimensions = effective;
            h.to_url(path)
        } else {
            hints.clone().with_time_frame(Some(frame)).to_url(path)
        };
        Ok(self.wrap(hints, buffer, frame, origin))
    }

    /// Byte order and slice order correction.
    fn normalize(&mut self, hints: &DecodeHints, buffer: &mut VoxelBuffer) {
        if hints.endianness != native_endianness() {
            buffer.swap_endianness();
        }
        if let Some(axis) = hints.slice_order.reversal() {
            log_info!(self.logger, "Reversing {:?} axis (slice order {})", axis, hints.slice_order);
            buffer.reverse_axis(axis);
        }
    }

    fn wrap(&self, hints: &DecodeHints, buffer: VoxelBuffer, frame: usize, origin: VolumeUrl) -> DecodedVolume {
        let mut volume = DecodedVolume::new(buffer, origin)
            .with_spacing(hints.spacing)
            .with_transform(hints.transform)
            .with_modality(hints.modality)
            .with_hash(hints.hash.clone());
        volume.set_time_step(hints.time_step.unwrap_or(frame as f32));
        volume
    }

    fn report(&mut self, progress: f32) {
        if let Some(sink) = self.progress.as_mut() {
            sink.set_progress(progress);
        }
    }
}

/// Move the six tensor elements of every voxel into upper triangular
/// order, deinterleaving planar layouts first.
fn reorder_tensor(buffer: VoxelBuffer, layout: TensorLayout) -> Result<VoxelBuffer> {
    if !layout.fusion && layout.ordering.destinations() == [0, 1, 2, 3, 4, 5] {
        return Ok(buffer);
    }
    let voxel_type: VoxelType = buffer.voxel_type();
    let width = voxel_type.format().size_of();
    let count = buffer.voxel_count();
    let dest = layout.ordering.destinations();
    let mut out = VoxelBuffer::zeroed(buffer.dim(), voxel_type)?;
    {
        let src = buffer.raw_data();
        let dst = out.raw_data_mut();
        for i in 0..count {
            for (k, &d) in dest.iter().enumerate() {
                let from = if layout.fusion { k * count + i } else { i * 6 + k };
                let to = i * 6 + d;
                dst[to * width..(to + 1) * width]
                    .copy_from_slice(&src[from * width..(from + 1) * width]);
            }
        }
    }
    Ok(out)
}

/// Byte offset of a position within a frame of `frame_bytes` bytes.
fn payload_offset(header_skip: u64, frame_bytes: u64, frame: usize, within: u64) -> Result<u64> {
    frame_bytes
        .checked_mul(frame as u64)
        .and_then(|o| o.checked_add(within))
        .and_then(|o| o.checked_add(header_skip))
        .ok_or_else(|| {
            VolumeError::InvalidParameters(format!(
                "offset of frame {} past header skip {} is out of range",
                frame, header_skip
            ))
        })
}

/// Length of a file past the given header skip.
fn payload_len(path: &Path, header_skip: u64) -> Result<u64> {
    let len = open_file(path)?.metadata()?.len();
    Ok(len.saturating_sub(header_skip))
}

/// Read until the buffer is full or the source ends, returning the number
/// of bytes read.
fn read_fully<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        match source.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(n)
}

fn parse_brick_param(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        VolumeError::InvalidParameters(format!("invalid value {:?} for {}", value, key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::ScalarFormat;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn tensor_diag_reorder() {
        let hints = DecodeHints::new([2, 1, 1], ScalarFormat::Float32)
            .with_layout(ChannelLayout::from_token("TENSOR_DIAG").unwrap());
        // xx yy zz xy xz yz for two voxels
        let values: Vec<f32> = vec![1., 4., 6., 2., 3., 5., 11., 14., 16., 12., 13., 15.];
        let bytes: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
        let mut dec = RawVoxelDecoder::new(hints);
        let v = dec
            .decode_source(Cursor::new(bytes), Path::new("t.raw"))
            .unwrap();
        assert_eq!(
            v.buffer().to_vec::<f32>().unwrap(),
            vec![1., 2., 3., 4., 5., 6., 11., 12., 13., 14., 15., 16.]
        );
    }

    #[test]
    fn tensor_fusion_low_reorder() {
        let hints = DecodeHints::new([2, 1, 1], ScalarFormat::Float32)
            .with_layout(ChannelLayout::from_token("TENSOR_FUSION_LOW").unwrap());
        // planes: xx, yx, yy, zx, zy, zz; voxel values v0 then v1
        let values: Vec<f32> = vec![1., 11., 2., 12., 4., 14., 3., 13., 5., 15., 6., 16.];
        let bytes: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
        let mut dec = RawVoxelDecoder::new(hints);
        let v = dec
            .decode_source(Cursor::new(bytes), Path::new("t.raw"))
            .unwrap();
        assert_eq!(
            v.buffer().to_vec::<f32>().unwrap(),
            vec![1., 2., 3., 4., 5., 6., 11., 12., 13., 14., 15., 16.]
        );
    }

    #[test]
    fn truncated_source() {
        let hints = DecodeHints::new([4, 4, 4], ScalarFormat::Uint8);
        let mut dec = RawVoxelDecoder::new(hints);
        let e = dec
            .decode_source(Cursor::new(vec![0u8; 63]), Path::new("t.raw"))
            .unwrap_err();
        match e {
            VolumeError::Truncated(_, expected, got) => {
                assert_eq!(expected, 64);
                assert_eq!(got, 63);
            }
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn progress_reported() {
        use std::sync::{Arc, Mutex};

        struct Record(Arc<Mutex<Vec<f32>>>);
        impl ProgressSink for Record {
            fn set_progress(&mut self, p: f32) {
                self.0.lock().unwrap().push(p);
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dec = RawVoxelDecoder::new(DecodeHints::new([2, 2, 4], ScalarFormat::Uint8));
        dec.set_progress_sink(Some(Box::new(Record(seen.clone()))));
        let _ = dec
            .decode_source(Cursor::new(vec![7u8; 16]), Path::new("t.raw"))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0.25, 0.5, 0.75, 1.]);
    }

    #[test]
    fn fused_slices_rejected() {
        let hints = DecodeHints::new([2, 2, 2], ScalarFormat::Float32)
            .with_layout(ChannelLayout::from_token("TENSOR_FUSION_UP").unwrap());
        let mut dec = RawVoxelDecoder::new(hints.clone());
        let e = dec
            .decode_from(&hints, Cursor::new(vec![0u8; 192]), Path::new("t.raw"), 0, 1)
            .unwrap_err();
        assert_eq!(e.kind(), crate::error::ErrorKind::UnsupportedFormat);
    }
}
