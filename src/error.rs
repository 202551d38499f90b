use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("the {0} backend isn't enabled, rebuild with the `gpu` feature")]
    BackendUnavailable(crate::Backend),

    #[error("the {0} format isn't enabled, rebuild with the `{0}` feature")]
    FormatUnavailable(crate::Format),

    #[error("failed to find an appropriate adapter")]
    NoAdapter,

    #[cfg(feature = "gpu")]
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[cfg(feature = "gpu")]
    #[error("failed to map readback buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("{width}x{height} exceeds the device's maximum texture dimension of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("readback returned {0} pixels, which doesn't match the image dimensions")]
    Readback(usize),
}

/// Returned when parsing a [`Backend`](crate::Backend) or [`Format`](crate::Format).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid backend name, use `cpu` or `gpu`")]
    Backend,
    #[error("invalid format name, use `avif` or `png`")]
    Format,
}
