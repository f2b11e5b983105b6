pub mod image;
pub mod sample;

pub use image::{FileImageSource, ImageSource, SampleImage};
pub use sample::{BatchResult, SampleOutcome, SampleRecord, SampleRequest, SampleResult};
