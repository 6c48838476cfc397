pub mod blob_detector;
pub mod frame;
pub mod gray_field;
pub mod group;
pub mod marker;
pub mod morphology;
pub mod pixel;
pub mod smart_blob;
pub mod tracker;
pub mod utils;
