use std::fmt;

use crate::{get_bit, packed_size, set_bit, slice_bits, BitWriter, Color, VecWriter};
use crate::{Error, Result};

/// Two byte tag at the start of every file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    /// `P1`, human readable grid of `0` and `1`.
    Text,
    /// `P4`, packed bits.
    Raw,
    /// `C4`, run tokens.
    Compressed,
}
impl Marker {
    pub fn from_bytes(bytes: [u8; 2]) -> Result<Marker> {
        match &bytes {
            b"P1" => Ok(Marker::Text),
            b"P4" => Ok(Marker::Raw),
            b"C4" => Ok(Marker::Compressed),
            _ => Err(Error::InvalidMarker(bytes)),
        }
    }
    pub fn bytes(self) -> [u8; 2] {
        match self {
            Marker::Text => *b"P1",
            Marker::Raw => *b"P4",
            Marker::Compressed => *b"C4",
        }
    }
    pub fn is_compressed(self) -> bool {
        self == Marker::Compressed
    }
    pub fn is_text(self) -> bool {
        self == Marker::Text
    }
}
impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b] = self.bytes();
        write!(f, "{}{}", a as char, b as char)
    }
}

/// A monochrome raster together with the format it came from.
///
/// For `Marker::Compressed` the buffer holds run tokens, otherwise
/// `packed_size(width, height)` bytes of packed pixels.
/// The constructors enforce the buffer length, so it never has to be
/// recomputed from the flags.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    marker: Marker,
    data: Vec<u8>,
}

fn checked_size(width: usize, height: usize) -> Result<usize> {
    packed_size(width, height).ok_or(Error::DimensionsTooLarge {
        width: width as u64,
        height: height as u64,
    })
}

impl Image {
    /// Wrap packed pixels. `data` must be exactly `packed_size(width, height)` long.
    pub fn packed(width: usize, height: usize, data: Vec<u8>) -> Result<Image> {
        let size = checked_size(width, height)?;
        if data.len() != size {
            return Err(Error::Format(format!(
                "{}x{} image needs {} bytes of pixels, got {}",
                width, height, size, data.len()
            )));
        }
        Ok(Image { width, height, marker: Marker::Raw, data })
    }

    /// Wrap a run token stream. It may not be longer than the packed pixels.
    pub fn compressed(width: usize, height: usize, tokens: Vec<u8>) -> Result<Image> {
        let size = checked_size(width, height)?;
        if tokens.len() > size {
            return Err(Error::Format(format!(
                "{} run tokens exceed the {} bytes of a {}x{} image",
                tokens.len(), size, width, height
            )));
        }
        Ok(Image { width, height, marker: Marker::Compressed, data: tokens })
    }

    /// An all white image.
    pub fn blank(width: usize, height: usize) -> Result<Image> {
        let size = checked_size(width, height)?;
        Ok(Image { width, height, marker: Marker::Raw, data: vec![0; size] })
    }

    /// Build an image from pixels in row-major order.
    ///
    /// Fails if the iterator yields fewer than `width * height` pixels.
    /// Anything beyond is ignored. Memory is only taken for pixels that
    /// actually arrive.
    pub fn from_pixels(width: usize, height: usize, pixels: impl IntoIterator<Item=Color>) -> Result<Image> {
        checked_size(width, height)?;
        let bits = width * height;
        let mut writer = VecWriter::with_capacity(bits);
        for color in pixels {
            if writer.write(color).is_err() {
                break;
            }
        }
        if !writer.is_full() {
            return Err(Error::Format(format!(
                "expected {} pixels, got {}",
                bits, writer.len()
            )));
        }
        Image::packed(width, height, writer.finish()?)
    }

    pub fn width(&self) -> usize {
        self.width
    }
    pub fn height(&self) -> usize {
        self.height
    }
    pub fn marker(&self) -> Marker {
        self.marker
    }
    pub fn is_compressed(&self) -> bool {
        self.marker.is_compressed()
    }
    pub fn is_text(&self) -> bool {
        self.marker.is_text()
    }

    /// Number of run tokens, or the packed size for uncompressed images.
    pub fn compressed_size(&self) -> usize {
        self.data.len()
    }

    /// Size of the pixel data once unpacked.
    pub fn packed_size(&self) -> usize {
        // dimensions were checked on construction
        self.width * self.height / 8 + (self.width * self.height % 8 != 0) as usize
    }

    pub fn bit_count(&self) -> usize {
        self.width * self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`.
    ///
    /// Panics if the image is compressed or the position is outside of it.
    pub fn pixel(&self, x: usize, y: usize) -> Color {
        assert!(!self.is_compressed(), "pixel access on compressed image");
        assert!(x < self.width && y < self.height);
        get_bit(&self.data, y * self.width + x).into()
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        assert!(!self.is_compressed(), "pixel access on compressed image");
        assert!(x < self.width && y < self.height);
        set_bit(&mut self.data, y * self.width + x, color.into());
    }

    /// All pixels in row-major order. Empty for compressed images.
    pub fn pixels(&self) -> impl Iterator<Item=Color> + '_ {
        let n = if self.is_compressed() { 0 } else { self.bit_count() };
        slice_bits(&self.data).take(n).map(Color::from)
    }

    /// Mark packed pixels for the text format.
    pub fn into_text(self) -> Result<Image> {
        self.retag(Marker::Text)
    }

    /// Mark packed pixels for the raw binary format.
    pub fn into_binary(self) -> Result<Image> {
        self.retag(Marker::Raw)
    }

    fn retag(self, marker: Marker) -> Result<Image> {
        if self.is_compressed() {
            return Err(Error::WrongFormat {
                expected: "uncompressed image",
                found: self.marker,
            });
        }
        Ok(Image { marker, ..self })
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Image({} {}x{}, {} bytes)", self.marker, self.width, self.height, self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_length_is_checked() {
        assert!(Image::packed(2, 2, vec![0]).is_ok());
        assert!(Image::packed(2, 2, vec![]).is_err());
        assert!(Image::packed(3, 3, vec![0]).is_err());
        assert!(matches!(
            Image::packed(usize::MAX, 3, vec![]),
            Err(Error::DimensionsTooLarge { .. })
        ));
    }

    #[test]
    fn pixels_are_row_major() {
        let mut image = Image::blank(3, 2).unwrap();
        image.set_pixel(2, 0, Color::Black);
        image.set_pixel(0, 1, Color::Black);
        assert_eq!(image.data(), &[0b0011_0000]);
        assert_eq!(image.pixel(2, 0), Color::Black);
        assert_eq!(image.pixel(1, 1), Color::White);

        let copy = Image::from_pixels(3, 2, image.pixels()).unwrap();
        assert_eq!(copy, image);
    }

    #[test]
    fn from_pixels_needs_every_pixel() {
        let pixels = vec![Color::Black; 5];
        assert!(Image::from_pixels(3, 2, pixels.iter().cloned()).is_err());
        assert!(Image::from_pixels(2, 2, pixels.iter().cloned()).is_ok());
    }

    #[test]
    fn retag() {
        let image = Image::blank(4, 4).unwrap().into_text().unwrap();
        assert!(image.is_text());
        assert!(!image.is_compressed());
        let image = image.into_binary().unwrap();
        assert_eq!(image.marker(), Marker::Raw);

        let tokens = Image::compressed(4, 4, vec![0x0F]).unwrap();
        assert!(tokens.into_text().is_err());
    }

    #[test]
    fn markers() {
        assert_eq!(Marker::from_bytes(*b"C4").unwrap(), Marker::Compressed);
        assert_eq!(Marker::Text.to_string(), "P1");
        assert!(matches!(Marker::from_bytes(*b"XX"), Err(Error::InvalidMarker(_))));
        assert!(Marker::from_bytes(*b"P2").is_err());
    }
}
