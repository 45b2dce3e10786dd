//! Real-time monitoring: capture, bounded queueing, windowed detection

pub mod device;
pub mod dispatch;
pub mod pipeline;

pub use device::{list_input_devices, CaptureSource, CaptureSpec, ChunkSink, CpalSource, DeviceInfo};
pub use dispatch::{CallbackDispatcher, EventCallback};
pub use pipeline::{MonitorPipeline, MonitorSummary, PipelineState};
