pub use calc::{init_pixel, Dispatch, GlobalId, RGBA, RGBAF, TILE_SIZE};
use std::fmt::{self, Display};
use std::io::Write;
use std::str::FromStr;

use log::info;

pub mod cpu;
mod error;
pub use error::{Error, ParseError, Result};

#[cfg(feature = "gpu")]
#[path = "compute.rs"]
pub mod compute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Gpu,
}
impl Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        })
    }
}
impl FromStr for Backend {
    type Err = ParseError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("cpu") {
            Self::Cpu
        } else if s.eq_ignore_ascii_case("gpu") {
            Self::Gpu
        } else {
            return Err(ParseError::Backend);
        })
    }
}

/// Output file format. The name doubles as the file extension and the cargo feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Avif,
    Png,
}
impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Png => "png",
        }
    }
}
impl Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
impl FromStr for Format {
    type Err = ParseError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("avif") {
            Self::Avif
        } else if s.eq_ignore_ascii_case("png") {
            Self::Png
        } else {
            return Err(ParseError::Format);
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub width: u32,
    pub height: u32,
    pub backend: Backend,
    pub format: Format,

    pub filename: String,
    pub open: bool,
}

#[cfg(feature = "bin")]
pub fn get_options() -> Options {
    use clap::Arg;

    let app = clap::Command::new("ramp-init")
        .about("Fills an image with a horizontal red ramp, one work-item per pixel.")
        .arg(
            Arg::new("width")
                .help("Width of the image in pixels.")
                .default_value("320"),
        )
        .arg(
            Arg::new("height")
                .help("Height of the image in pixels.")
                .default_value("180"),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .short('b')
                .help("Where to run the kernel. `gpu` requires the `gpu` cargo feature.")
                .takes_value(true)
                .possible_values(["cpu", "gpu"])
                .default_value("cpu"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .takes_value(true)
                .possible_values(["avif", "png"])
                .default_value("png"),
        )
        .arg(
            Arg::new("filename")
                .long("output")
                .short('o')
                .help("Output file name, without extension.")
                .takes_value(true)
                .default_value("output"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open the image after generation."),
        );

    let matches = app.get_matches();

    let format: Format = matches.value_of_t_or_exit("format");
    let filename = matches
        .value_of("filename")
        .map(|f| format!("{}.{}", f, format.extension()))
        .unwrap_or_else(|| format!("output.{}", format.extension()));

    Options {
        width: matches.value_of_t_or_exit("width"),
        height: matches.value_of_t_or_exit("height"),
        backend: matches.value_of_t_or_exit("backend"),
        format,
        filename,
        open: matches.is_present("open"),
    }
}

/// A row-major image which owns its pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<P = RGBAF> {
    contents: Vec<P>,
    width: u32,
    height: u32,
}
impl<P: Clone> Image<P> {
    pub fn new(fill: P, width: u32, height: u32) -> Self {
        Self {
            contents: vec![fill; width as usize * height as usize],
            width,
            height,
        }
    }
}
impl<P> Image<P> {
    /// Returns [`None`] if `contents` doesn't hold exactly `width * height` pixels.
    pub fn from_vec(contents: Vec<P>, width: u32, height: u32) -> Option<Self> {
        if contents.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            contents,
            width,
            height,
        })
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
    pub fn pixel(&self, x: u32, y: u32) -> Option<&P> {
        self.index(x, y).map(|index| &self.contents[index])
    }
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut P> {
        self.index(x, y).map(move |index| &mut self.contents[index])
    }
    pub fn contents(&self) -> &[P] {
        &self.contents
    }
    pub fn contents_mut(&mut self) -> &mut [P] {
        &mut self.contents
    }
}
impl Image<RGBAF> {
    /// Quantizes every pixel to 8 bits per channel.
    pub fn to_rgba8(&self) -> Image<RGBA> {
        Image {
            contents: self.contents.iter().copied().map(RGBA::from).collect(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Allocates a `width`×`height` image and runs the init kernel over it on `backend`.
pub fn render(backend: Backend, width: u32, height: u32) -> Result<Image> {
    info!("Rendering {}x{} on the {} backend.", width, height, backend);
    match backend {
        Backend::Cpu => {
            let mut image = Image::new(RGBAF::TRANSPARENT, width, height);
            cpu::init(&mut image);
            Ok(image)
        }
        Backend::Gpu => {
            #[cfg(feature = "gpu")]
            {
                compute::GpuContext::new()?.render(width, height)
            }
            #[cfg(not(feature = "gpu"))]
            {
                Err(Error::BackendUnavailable(backend))
            }
        }
    }
}

#[cfg(feature = "avif")]
fn encode_avif(image: &Image<RGBA>) -> Result<Vec<u8>> {
    let config = ravif::Config {
        speed: 8,
        quality: 100.0,
        threads: 0,
        color_space: ravif::ColorSpace::YCbCr,
        alpha_quality: 0.0,
        premultiplied_alpha: false,
    };
    // The kernel always writes an opaque alpha.
    let rgb: Vec<ravif::RGB8> = image
        .contents()
        .iter()
        .map(|p| ravif::RGB8::new(p.r, p.g, p.b))
        .collect();
    let img = ravif::Img::new(
        rgb.as_slice(),
        image.width() as usize,
        image.height() as usize,
    );
    let (data, _) = ravif::encode_rgb(img, &config).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(data)
}

#[cfg(feature = "png")]
fn encode_png(rgba: &Image<RGBA>) -> Result<Vec<u8>> {
    let bytes: Vec<u8> = rgba
        .contents()
        .iter()
        .flat_map(|p| [p.r, p.g, p.b, p.a])
        .collect();
    let buffer: image::RgbaImage = image::ImageBuffer::from_raw(rgba.width(), rgba.height(), bytes)
        .ok_or_else(|| Error::Encode("pixel buffer doesn't match the dimensions".into()))?;
    let mut data = Vec::new();
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(&mut data, image::ImageOutputFormat::Png)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(data)
}

/// Quantizes `image` and encodes it as `format`.
pub fn encode(image: &Image, format: Format) -> Result<Vec<u8>> {
    let image = image.to_rgba8();
    match format {
        #[cfg(feature = "avif")]
        Format::Avif => encode_avif(&image),
        #[cfg(feature = "png")]
        Format::Png => encode_png(&image),
        #[allow(unreachable_patterns)]
        _ => Err(Error::FormatUnavailable(format)),
    }
}

pub fn write_image(options: &Options, image: &Image) -> Result<()> {
    info!("Starting encode.");
    let data = encode(image, options.format)?;
    info!("Finished encode. Writing file {:?}.", options.filename);
    let mut file = std::fs::File::create(&options.filename)?;
    file.write_all(&data)?;
    file.flush()?;

    if options.open {
        open(&options.filename)?;
    }
    Ok(())
}

fn open(filename: &str) -> Result<()> {
    fn start_shell(cmd: &str, command_arg: &str, exec: &str) -> Result<()> {
        std::process::Command::new(cmd)
            .arg(command_arg)
            .arg(exec)
            .spawn()?;
        Ok(())
    }
    #[cfg(windows)]
    {
        start_shell("cmd", "/C", &format!("start {}", filename))
    }
    #[cfg(target_os = "macos")]
    {
        start_shell("sh", "-c", &format!("open {:?}", filename))
    }
    #[cfg(all(not(target_os = "macos"), unix))]
    {
        start_shell("sh", "-c", &format!("xdg-open {:?}", filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend() {
        assert_eq!("CPU".parse::<Backend>(), Ok(Backend::Cpu));
        assert_eq!("gpu".parse::<Backend>(), Ok(Backend::Gpu));
        assert_eq!("vulkan".parse::<Backend>(), Err(ParseError::Backend));
    }

    #[test]
    fn parse_format() {
        assert_eq!("Avif".parse::<Format>(), Ok(Format::Avif));
        assert_eq!("png".parse::<Format>(), Ok(Format::Png));
        assert_eq!("jpeg".parse::<Format>(), Err(ParseError::Format));
        assert_eq!(Format::Png.to_string(), "png");
    }

    #[test]
    fn image_indexing() {
        let mut image = Image::new(0u8, 3, 2);
        *image.pixel_mut(2, 1).unwrap() = 7;
        assert_eq!(image.contents()[5], 7);
        assert_eq!(image.pixel(3, 0), None);
        assert_eq!(image.pixel(0, 2), None);
        assert!(Image::from_vec(vec![0u8; 5], 3, 2).is_none());
        assert!(Image::<u8>::new(0, 0, 4).is_empty());
    }

    #[test]
    fn quantized_ramp() {
        let image = render(Backend::Cpu, 4, 1).unwrap().to_rgba8();
        let reds: Vec<u8> = image.contents().iter().map(|p| p.r).collect();
        assert_eq!(reds, [0, 64, 128, 191]);
        assert!(image.contents().iter().all(|p| p.a == 255 && p.g == 0));
    }

    #[cfg(feature = "png")]
    #[test]
    fn png_signature() {
        let image = render(Backend::Cpu, 16, 9).unwrap();
        let data = encode(&image, Format::Png).unwrap();
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn gpu_backend_disabled() {
        assert!(matches!(
            render(Backend::Gpu, 8, 8),
            Err(Error::BackendUnavailable(Backend::Gpu))
        ));
    }
}
