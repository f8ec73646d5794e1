mod backend;
pub mod backends;
mod labels;
mod nms;
mod result;

pub use backend::DetectorBackend;
pub use backends::{build_backend, ReplayBackend};
pub use labels::{Category, LabelMap, DEFAULT_LABELS};
pub use nms::non_max_suppression;
pub use result::{BBox, Detection, RawDetection};
