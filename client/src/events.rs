use wire::object::{Buffer, Device, Queue, ShaderModule};
use wire::schema::{
    CompilationInfo, CompilationInfoRequestStatus, ErrorType, MapAsyncStatus, QueueWorkDoneStatus,
};

/// Something the server reported back.
///
/// Callbacks carry the object they were requested on, or `None` when that
/// object was released before the callback arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    BufferMapped {
        buffer: Option<Buffer>,
        request_serial: u64,
        status: MapAsyncStatus,
        data: Vec<u8>,
    },
    QueueWorkDone {
        queue: Option<Queue>,
        request_serial: u64,
        status: QueueWorkDoneStatus,
    },
    CompilationInfo {
        shader_module: Option<ShaderModule>,
        request_serial: u64,
        status: CompilationInfoRequestStatus,
        info: Option<CompilationInfo>,
    },
    UncapturedError {
        device: Option<Device>,
        error_type: ErrorType,
        message: String,
    },
}

impl ClientEvent {
    pub fn request_serial(&self) -> Option<u64> {
        match self {
            ClientEvent::BufferMapped { request_serial, .. }
            | ClientEvent::QueueWorkDone { request_serial, .. }
            | ClientEvent::CompilationInfo { request_serial, .. } => Some(*request_serial),
            ClientEvent::UncapturedError { .. } => None,
        }
    }
}
