pub mod clock;
pub mod device;
pub mod vision;

pub use clock::{Clock, MonotonicClock};
pub use device::{Command, DeviceId, Reply};
pub use vision::{BoundingBox, Detection, Frame, suppress_overlaps};

pub trait FrameSource {
    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>>;
}

pub trait Detector {
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>>;
}

/// One-shot request/response link to a lamp controller.
///
/// Every call opens its own connection, so implementations hold no
/// per-connection state and may be shared across threads.
pub trait DeviceChannel: Send + Sync {
    fn send(
        &self,
        device: DeviceId,
        command: Command,
    ) -> Result<Reply, Box<dyn std::error::Error + Send + Sync>>;
}
