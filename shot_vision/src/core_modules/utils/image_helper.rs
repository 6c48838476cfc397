pub mod image_helper {
    use crate::core_modules::frame::Frame;
    use crate::error::DetectError;
    use image::{ImageEncoder, ImageError};
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    /// Writes a frame to disk as an RGBA PNG.
    pub fn save(path: impl AsRef<Path>, frame: &Frame) -> Result<(), DetectError> {
        frame.validate()?;
        let output = File::create(path).map_err(ImageError::IoError)?;
        let encoder = image::codecs::png::PngEncoder::new(BufWriter::new(output));

        let color = image::ExtendedColorType::Rgba8;
        encoder.write_image(&frame.data, frame.width, frame.height, color)?;

        Ok(())
    }

    /// Reads any image format the `image` crate understands and converts it to RGBA.
    pub fn load(path: impl AsRef<Path>) -> Result<Frame, DetectError> {
        let rgba = image::open(path)?.to_rgba8();
        Ok(Frame::from(rgba))
    }
}
