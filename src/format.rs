//! Readers and writers for the three envelopes.
//!
//! Binary files (`P4` and `C4`) are laid out as
//!
//! ```text
//! marker (2) | width (u64 LE) | height (u64 LE) | [token count (u64 LE), C4 only] | payload
//! ```
//!
//! Text files (`P1`) are `"P1\n<width> <height>"` followed by one line of
//! `0`/`1` per row and a trailing newline.
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::info;

use crate::{Color, Error, Image, Marker, Result};

fn read_marker(reader: &mut impl Read) -> Result<Marker> {
    let mut marker = [0; 2];
    reader.read_exact(&mut marker).map_err(Error::from_read)?;
    Marker::from_bytes(marker)
}

fn read_dimensions(reader: &mut impl Read) -> Result<(usize, usize)> {
    let width = reader.read_u64::<LittleEndian>().map_err(Error::from_read)?;
    let height = reader.read_u64::<LittleEndian>().map_err(Error::from_read)?;
    match (usize::try_from(width), usize::try_from(height)) {
        (Ok(w), Ok(h)) if crate::packed_size(w, h).is_some() => Ok((w, h)),
        _ => Err(Error::DimensionsTooLarge { width, height }),
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation.
fn read_payload(reader: &mut impl Read, len: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() < len {
        return Err(Error::Truncated);
    }
    let mut rest = [0; 1];
    if reader.read(&mut rest)? != 0 {
        return Err(Error::Format("trailing data after payload".into()));
    }
    Ok(data)
}

/// Read a raw (`P4`) or compressed (`C4`) image.
pub fn read_binary(mut reader: impl Read) -> Result<Image> {
    let marker = read_marker(&mut reader)?;
    if marker.is_text() {
        return Err(Error::WrongFormat {
            expected: "binary image (P4 or C4)",
            found: marker,
        });
    }
    let (width, height) = read_dimensions(&mut reader)?;
    let image = match marker {
        Marker::Compressed => {
            let count = reader.read_u64::<LittleEndian>().map_err(Error::from_read)?;
            let size = usize::try_from(count)
                .ok()
                .filter(|&n| Some(n) <= crate::packed_size(width, height))
                .ok_or_else(|| Error::Format(format!(
                    "{} run tokens for a {}x{} image", count, width, height
                )))?;
            Image::compressed(width, height, read_payload(&mut reader, size)?)?
        }
        _ => {
            // checked by read_dimensions
            let size = crate::packed_size(width, height).unwrap_or(0);
            Image::packed(width, height, read_payload(&mut reader, size)?)?
        }
    };
    info!("read {:?}", image);
    Ok(image)
}

/// Write a raw or compressed image. Text images have to be converted first.
pub fn write_binary(mut writer: impl Write, image: &Image) -> Result<()> {
    if image.is_text() {
        return Err(Error::WrongFormat {
            expected: "binary image (P4 or C4)",
            found: image.marker(),
        });
    }
    writer.write_all(&image.marker().bytes())?;
    writer.write_u64::<LittleEndian>(image.width() as u64)?;
    writer.write_u64::<LittleEndian>(image.height() as u64)?;
    if image.is_compressed() {
        writer.write_u64::<LittleEndian>(image.compressed_size() as u64)?;
    }
    writer.write_all(image.data())?;
    writer.flush()?;
    Ok(())
}

fn skip_whitespace(text: &[u8]) -> &[u8] {
    let n = text.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &text[n..]
}

fn parse_number<'a>(text: &'a [u8], what: &str) -> Result<(usize, &'a [u8])> {
    let text = skip_whitespace(text);
    let n = text.iter().take_while(|b| b.is_ascii_digit()).count();
    let value = std::str::from_utf8(&text[..n])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Format(format!("missing or invalid {}", what)))?;
    Ok((value, &text[n..]))
}

/// Read a text (`P1`) image.
///
/// Every character other than `0` and `1` after the header is skipped.
pub fn read_text(mut reader: impl Read) -> Result<Image> {
    let mut text = Vec::new();
    reader.read_to_end(&mut text)?;
    if text.len() < 2 {
        return Err(Error::Truncated);
    }
    match Marker::from_bytes([text[0], text[1]])? {
        Marker::Text => {}
        found @ Marker::Compressed => return Err(Error::WrongFormat {
            expected: "text image (P1), compressed files cannot be read as text",
            found,
        }),
        found @ Marker::Raw => return Err(Error::WrongFormat {
            expected: "text image (P1), the file is binary",
            found,
        }),
    }

    let (width, rest) = parse_number(&text[2..], "width")?;
    let (height, grid) = parse_number(rest, "height")?;
    let pixels = grid.iter().filter_map(|&b| match b {
        b'0' => Some(Color::White),
        b'1' => Some(Color::Black),
        _ => None,
    });
    let image = Image::from_pixels(width, height, pixels)?.into_text()?;
    info!("read {:?}", image);
    Ok(image)
}

/// Write an uncompressed image as text.
pub fn write_text(mut writer: impl Write, image: &Image) -> Result<()> {
    if image.is_compressed() {
        return Err(Error::WrongFormat {
            expected: "uncompressed image, compressed files cannot be written as text",
            found: image.marker(),
        });
    }
    write!(writer, "{}\n{} {}", Marker::Text, image.width(), image.height())?;
    let mut line = Vec::with_capacity(image.width() + 1);
    for (i, color) in image.pixels().enumerate() {
        if i % image.width() == 0 {
            writer.write_all(&line)?;
            line.clear();
            line.push(b'\n');
        }
        line.push(match color {
            Color::Black => b'1',
            Color::White => b'0',
        });
    }
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_square() {
        let image = read_text(&b"P1\n2 2\n01\n10\n"[..]).unwrap();
        assert!(image.is_text());
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.data(), &[0b0110_0000]);

        let mut out = vec![];
        write_text(&mut out, &image).unwrap();
        assert_eq!(out, b"P1\n2 2\n01\n10\n");
    }

    #[test]
    fn text_ignores_other_characters() {
        let image = read_text(&b"P1 3\t2\r\n1 0 1\r\n0x1y0 trailing 1111"[..]).unwrap();
        assert_eq!(image.data(), &[0b1010_1000]);
    }

    #[test]
    fn text_errors() {
        assert!(matches!(read_text(&b"XX\n1 1\n1\n"[..]), Err(Error::InvalidMarker(_))));
        assert!(matches!(read_text(&b"C4\n1 1\n1\n"[..]), Err(Error::WrongFormat { .. })));
        assert!(matches!(read_text(&b"P4\n1 1\n1\n"[..]), Err(Error::WrongFormat { .. })));
        assert!(matches!(read_text(&b"P1\n2 2\n011"[..]), Err(Error::Format(_))));
        assert!(matches!(read_text(&b"P1\nx 2\n0110"[..]), Err(Error::Format(_))));
        assert!(matches!(read_text(&b"P"[..]), Err(Error::Truncated)));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn text_with_forged_dimensions() {
        assert!(matches!(
            read_text(&b"P1\n3000000000 3000000000\n1"[..]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn binary_layout() {
        let image = Image::packed(2, 2, vec![0b0110_0000]).unwrap();
        let mut out = vec![];
        write_binary(&mut out, &image).unwrap();
        let mut expected = b"P4".to_vec();
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.push(0b0110_0000);
        assert_eq!(out, expected);
        assert_eq!(read_binary(&out[..]).unwrap(), image);

        let image = Image::compressed(2, 2, vec![0x03]).unwrap();
        let mut out = vec![];
        write_binary(&mut out, &image).unwrap();
        assert_eq!(&out[..2], b"C4");
        assert_eq!(&out[18..26], &1u64.to_le_bytes());
        assert_eq!(out[26], 0x03);
        assert_eq!(read_binary(&out[..]).unwrap(), image);
    }

    #[test]
    fn binary_errors() {
        assert!(matches!(read_binary(&b"XX"[..]), Err(Error::InvalidMarker(_))));
        assert!(matches!(read_binary(&b"P1\n1 1\n1\n"[..]), Err(Error::WrongFormat { .. })));

        let mut data = b"P4".to_vec();
        data.extend_from_slice(&16u64.to_le_bytes());
        data.extend_from_slice(&16u64.to_le_bytes());
        data.extend_from_slice(&[0; 31]);
        assert!(matches!(read_binary(&data[..]), Err(Error::Truncated)));
        data.extend_from_slice(&[0; 2]);
        assert!(matches!(read_binary(&data[..]), Err(Error::Format(_))));

        let mut data = b"P4".to_vec();
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(read_binary(&data[..]), Err(Error::DimensionsTooLarge { .. })));

        let mut data = b"C4".to_vec();
        data.extend_from_slice(&2u64.to_le_bytes());
        data.extend_from_slice(&2u64.to_le_bytes());
        data.extend_from_slice(&2u64.to_le_bytes());
        data.extend_from_slice(&[0x00, 0x02]);
        assert!(matches!(read_binary(&data[..]), Err(Error::Format(_))));
    }

    #[test]
    fn text_writer_refuses_tokens() {
        let image = Image::compressed(2, 2, vec![0x03]).unwrap();
        assert!(write_text(vec![], &image).is_err());
        let text = Image::blank(1, 1).unwrap().into_text().unwrap();
        assert!(write_binary(vec![], &text).is_err());
    }
}
