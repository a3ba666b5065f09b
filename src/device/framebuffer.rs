use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::Device;
use crate::error::DeviceError;
use crate::media::{CanvasSize, RenderedFrame};

const SYSFS_GRAPHICS: &str = "/sys/class/graphics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit little-endian XRGB, stored as B, G, R, X.
    Bgra32,
    /// 24-bit B, G, R.
    Bgr24,
    /// 16-bit little-endian RGB565.
    Rgb565,
}

impl PixelFormat {
    fn from_depth(bits: u32) -> Result<Self, DeviceError> {
        match bits {
            32 => Ok(Self::Bgra32),
            24 => Ok(Self::Bgr24),
            16 => Ok(Self::Rgb565),
            other => Err(DeviceError::UnsupportedDepth(other)),
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra32 => 4,
            Self::Bgr24 => 3,
            Self::Rgb565 => 2,
        }
    }
}

/// Linux fbdev device (`/dev/fbN`) with a CPU-side back buffer.
#[derive(Debug)]
pub struct Framebuffer {
    path: PathBuf,
    sysfs: PathBuf,
    file: Option<File>,
    /// Visible resolution; frames are composed for this.
    size: CanvasSize,
    /// Whole addressable area, at least `size`. Panning moves the visible
    /// window inside it.
    virtual_size: CanvasSize,
    format: PixelFormat,
    stride: usize,
    back: Vec<u8>,
}

impl Framebuffer {
    /// Opens `device` and reads its geometry from sysfs.
    pub fn open(device: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let device = device.as_ref();
        let name = device.file_name().ok_or_else(|| {
            DeviceError::InvalidGeometry(format!("{} has no device name", device.display()))
        })?;
        let sysfs = Path::new(SYSFS_GRAPHICS).join(name);
        Self::open_with_sysfs(device, &sysfs)
    }

    /// Like [`Framebuffer::open`] but reads geometry from an explicit sysfs
    /// directory (the one holding `virtual_size` and `bits_per_pixel`).
    ///
    /// The visible resolution comes from `mode`, else the first entry of
    /// `modes`, else `virtual_size` for drivers that expose neither.
    pub fn open_with_sysfs(device: &Path, sysfs: &Path) -> Result<Self, DeviceError> {
        let raw_virtual = read_attr(sysfs, "virtual_size")?;
        let virtual_size = parse_pair(&raw_virtual, "virtual_size")?;
        if virtual_size.is_empty() {
            return Err(DeviceError::InvalidGeometry(format!(
                "virtual_size {raw_virtual:?} is empty"
            )));
        }
        let size = match visible_mode(sysfs) {
            Some(size) => size,
            None => {
                debug!("no current video mode in sysfs; using virtual_size");
                virtual_size
            }
        };
        if size.width > virtual_size.width || size.height > virtual_size.height {
            return Err(DeviceError::InvalidGeometry(format!(
                "visible mode {size} exceeds virtual size {virtual_size}"
            )));
        }
        let depth = read_attr(sysfs, "bits_per_pixel")?
            .parse::<u32>()
            .map_err(|err| DeviceError::InvalidGeometry(format!("bits_per_pixel: {err}")))?;
        let format = PixelFormat::from_depth(depth)?;
        let min_stride = virtual_size.width as usize * format.bytes_per_pixel();
        let stride = match read_attr(sysfs, "stride") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|err| DeviceError::InvalidGeometry(format!("stride: {err}")))?,
            Err(_) => min_stride,
        };
        if stride < min_stride {
            return Err(DeviceError::InvalidGeometry(format!(
                "stride {stride} is shorter than a {}px row",
                virtual_size.width
            )));
        }

        let file = OpenOptions::new().read(true).write(true).open(device)?;
        info!(
            device = %device.display(),
            size = %size,
            virtual_size = %virtual_size,
            depth,
            stride,
            "framebuffer opened"
        );

        Ok(Self {
            path: device.to_path_buf(),
            sysfs: sysfs.to_path_buf(),
            file: Some(file),
            size,
            virtual_size,
            format,
            stride,
            back: vec![0; stride * size.height as usize],
        })
    }

    /// Top-left corner of the visible window inside the virtual area.
    fn pan_offset(&self) -> (u32, u32) {
        let Ok(raw) = read_attr(&self.sysfs, "pan") else {
            return (0, 0);
        };
        match parse_pair(&raw, "pan") {
            Ok(pan)
                if pan.width + self.size.width <= self.virtual_size.width
                    && pan.height + self.size.height <= self.virtual_size.height =>
            {
                (pan.width, pan.height)
            }
            _ => {
                debug!(pan = %raw, "ignoring unusable pan offset");
                (0, 0)
            }
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn stride(&self) -> usize {
        self.stride
    }
}

impl Device for Framebuffer {
    fn bounds(&self) -> CanvasSize {
        self.size
    }

    fn push_frame(&mut self, frame: &RenderedFrame) -> Result<(), DeviceError> {
        if frame.size() != self.size {
            return Err(DeviceError::SizeMismatch {
                frame: frame.size().to_string(),
                device: self.size.to_string(),
            });
        }
        let bpp = self.format.bytes_per_pixel();
        let width = self.size.width as usize;
        let image = frame.image();
        for (y, row) in image.rows().enumerate() {
            let start = y * self.stride;
            let dst = &mut self.back[start..start + width * bpp];
            for (px, out) in row.zip(dst.chunks_exact_mut(bpp)) {
                let [r, g, b, _] = px.0;
                match self.format {
                    PixelFormat::Bgra32 => out.copy_from_slice(&[b, g, r, 255]),
                    PixelFormat::Bgr24 => out.copy_from_slice(&[b, g, r]),
                    PixelFormat::Rgb565 => out.copy_from_slice(&rgb565(r, g, b).to_le_bytes()),
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        let (pan_x, pan_y) = self.pan_offset();
        let file = self.file.as_mut().ok_or(DeviceError::Closed)?;
        let origin = pan_y as usize * self.stride + pan_x as usize * self.format.bytes_per_pixel();
        if pan_x == 0 {
            file.seek(SeekFrom::Start(origin as u64))?;
            file.write_all(&self.back)?;
        } else {
            let row_len = self.size.width as usize * self.format.bytes_per_pixel();
            for (y, row) in self.back.chunks_exact(self.stride).enumerate() {
                file.seek(SeekFrom::Start((origin + y * self.stride) as u64))?;
                file.write_all(&row[..row_len])?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        let file = self.file.take().ok_or(DeviceError::Closed)?;
        match file.sync_data() {
            Ok(()) => {}
            // Character devices without fsync support report EINVAL.
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
            Err(err) => return Err(err.into()),
        }
        debug!(device = %self.path.display(), "framebuffer closed");
        Ok(())
    }
}

fn read_attr(dir: &Path, name: &str) -> Result<String, DeviceError> {
    let raw = fs::read_to_string(dir.join(name))?;
    Ok(raw.trim().to_string())
}

/// Parses sysfs `"W,H"` pairs such as `virtual_size` and `pan`.
fn parse_pair(raw: &str, attr: &str) -> Result<CanvasSize, DeviceError> {
    let (w, h) = raw
        .split_once(',')
        .ok_or_else(|| DeviceError::InvalidGeometry(format!("{attr} {raw:?}")))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|err| DeviceError::InvalidGeometry(format!("{attr} {raw:?}: {err}")))
    };
    Ok(CanvasSize::new(parse(w)?, parse(h)?))
}

/// Current video mode, e.g. `U:1920x1080p-60`.
fn visible_mode(sysfs: &Path) -> Option<CanvasSize> {
    let current = read_attr(sysfs, "mode").ok().filter(|m| !m.is_empty());
    let raw = match current {
        Some(mode) => mode,
        None => read_attr(sysfs, "modes").ok()?.lines().next()?.to_string(),
    };
    parse_mode(&raw)
}

fn parse_mode(raw: &str) -> Option<CanvasSize> {
    let geometry = raw.split_once(':').map_or(raw, |(_, geometry)| geometry);
    let (w, rest) = geometry.split_once('x')?;
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let size = CanvasSize::new(w.trim().parse().ok()?, rest[..digits].parse().ok()?);
    (!size.is_empty()).then_some(size)
}

fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((u16::from(r) >> 3) << 11) | ((u16::from(g) >> 2) << 5) | (u16::from(b) >> 3)
}
