//! Extractors whose rejections are converted into handler errors.

pub mod enhanced_json;
pub mod enhanced_multipart;
pub mod enhanced_path;
pub mod validated_json;

pub use self::enhanced_json::Json;
pub use self::enhanced_multipart::Multipart;
pub use self::enhanced_path::Path;
pub use self::validated_json::ValidateJson;
