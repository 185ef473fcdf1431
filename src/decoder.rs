use std::iter::repeat;

use log::{debug, info};

use crate::{BitWriter, Color, Error, Image, Result, Run, VecWriter};

/// How `decompress` treats a token stream that does not cover the image exactly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    /// The runs must add up to `width * height` pixels.
    Strict,
    /// Surplus pixels are dropped, missing pixels stay white.
    Lenient,
}
impl Default for Validation {
    fn default() -> Self {
        Validation::Strict
    }
}

/// Turn a token stream into runs.
pub fn runs(tokens: &[u8]) -> impl Iterator<Item=Run> + '_ {
    tokens.iter().map(|&t| Run::from_token(t))
}

/// Turn a token stream into an iterator of pixel colors.
///
/// The iterator yields the sum of all run lengths, which need not match
/// any particular image size.
pub fn pels(tokens: &[u8]) -> impl Iterator<Item=Color> + '_ {
    runs(tokens).flat_map(|run| repeat(run.color).take(run.len()))
}

/// Expand a compressed (`C4`) image back into packed pixels.
pub fn decompress(image: &Image, validation: Validation) -> Result<Image> {
    if !image.is_compressed() {
        return Err(Error::WrongFormat {
            expected: "compressed image (C4)",
            found: image.marker(),
        });
    }
    let expected = image.bit_count();
    let actual = runs(image.data())
        .try_fold(0usize, |sum, run| sum.checked_add(run.len()))
        .ok_or_else(|| Error::Format("run lengths overflow".into()))?;

    if actual != expected {
        match validation {
            Validation::Strict => return Err(Error::RunLengthMismatch { expected, actual }),
            Validation::Lenient => info!("run tokens cover {} of {} pixels, ignoring", actual, expected),
        }
    }

    let mut writer = VecWriter::with_capacity(expected);
    for run in runs(image.data()) {
        debug!("token {:#04x}: {:?} x {}", run.token(), run.color, run.len());
        if writer.write_run(run).is_err() {
            // the remaining tokens lie beyond the last pixel
            break;
        }
    }
    info!(
        "decompressed {}x{} image from {} tokens",
        image.width(), image.height(), image.compressed_size()
    );
    Image::packed(image.width(), image.height(), writer.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token() {
        let image = Image::compressed(2, 2, vec![0x03]).unwrap();
        let raw = decompress(&image, Validation::Strict).unwrap();
        assert!(!raw.is_compressed());
        assert_eq!(raw.data(), &[0]);
    }

    #[test]
    fn pels_expand_runs() {
        let pels: Vec<_> = pels(&[0x81, 0x00, 0x80]).collect();
        assert_eq!(pels, vec![Color::Black, Color::Black, Color::White, Color::Black]);
    }

    #[test]
    fn long_runs() {
        // 3x100 pixels, first 150 black
        let image = Image::compressed(3, 100, vec![0xFF, 0x80 | 21, 127, 21]).unwrap();
        let raw = decompress(&image, Validation::Strict).unwrap();
        assert_eq!(raw.pixels().filter(|&c| c == Color::Black).count(), 150);
        assert_eq!(raw.pixel(2, 49), Color::Black);
        assert_eq!(raw.pixel(0, 50), Color::White);
    }

    #[test]
    fn mismatched_length() {
        let short = Image::compressed(4, 4, vec![0x82]).unwrap();
        match decompress(&short, Validation::Strict) {
            Err(Error::RunLengthMismatch { expected: 16, actual: 3 }) => {}
            r => panic!("{:?}", r),
        }
        let raw = decompress(&short, Validation::Lenient).unwrap();
        assert_eq!(raw.data(), &[0b1110_0000, 0]);

        let long = Image::compressed(2, 2, vec![0x85]).unwrap();
        assert!(decompress(&long, Validation::Strict).is_err());
        let raw = decompress(&long, Validation::Lenient).unwrap();
        assert_eq!(raw.data(), &[0b1111_0000]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn forged_dimensions() {
        let side = 1 << 31;
        let image = Image::compressed(side, side, vec![]).unwrap();
        match decompress(&image, Validation::Strict) {
            Err(Error::RunLengthMismatch { actual: 0, .. }) => {}
            r => panic!("{:?}", r),
        }
        let image = Image::compressed(side, side, vec![0xFF, 0x7F]).unwrap();
        assert!(matches!(
            decompress(&image, Validation::Strict),
            Err(Error::RunLengthMismatch { actual: 256, .. })
        ));
        // lenient decoding really needs the whole buffer
        assert!(matches!(
            decompress(&image, Validation::Lenient),
            Err(Error::Allocation(_))
        ));
    }

    #[test]
    fn rejects_raw() {
        let image = Image::blank(2, 2).unwrap();
        assert!(matches!(
            decompress(&image, Validation::Strict),
            Err(Error::WrongFormat { .. })
        ));
    }
}
