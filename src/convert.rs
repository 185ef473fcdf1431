//! The four conversions, each a straight read, transform, write pipeline.
//!
//! The output is serialized into memory first; the output file is only
//! created once the whole transform succeeded.
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use log::info;

use crate::decoder::{self, Validation};
use crate::{encoder, format, Error, Image, Marker, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `P4` to `C4`
    Compress,
    /// `C4` to `P4`
    Decompress,
    /// `P1` to `P4`
    TextToBin,
    /// `P4` to `P1`
    BinToText,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Options {
    pub validation: Validation,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::Open { path: path.to_owned(), source })
}

pub fn read_binary_file(path: &Path) -> Result<Image> {
    format::read_binary(open(path)?)
}

pub fn read_text_file(path: &Path) -> Result<Image> {
    format::read_text(open(path)?)
}

fn expect_marker(image: &Image, marker: Marker, expected: &'static str) -> Result<()> {
    if image.marker() != marker {
        return Err(Error::WrongFormat { expected, found: image.marker() });
    }
    Ok(())
}

impl Command {
    /// Apply the conversion to an in-memory image.
    pub fn transform(self, image: Image, options: &Options) -> Result<Image> {
        match self {
            Command::Compress => {
                expect_marker(&image, Marker::Raw, "raw binary image (P4)")?;
                encoder::compress(&image)
            }
            Command::Decompress => {
                expect_marker(&image, Marker::Compressed, "compressed image (C4)")?;
                decoder::decompress(&image, options.validation)
            }
            Command::TextToBin => {
                expect_marker(&image, Marker::Text, "text image (P1)")?;
                image.into_binary()
            }
            Command::BinToText => {
                expect_marker(&image, Marker::Raw, "raw binary image (P4)")?;
                image.into_text()
            }
        }
    }

    /// Serialize the transformed image in the format this command produces.
    pub fn serialize(self, image: &Image) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Command::BinToText => format::write_text(&mut out, image)?,
            _ => format::write_binary(&mut out, image)?,
        }
        Ok(out)
    }

    /// Convert bytes to bytes.
    pub fn convert(self, input: &[u8], options: &Options) -> Result<Vec<u8>> {
        let image = match self {
            Command::TextToBin => format::read_text(input)?,
            _ => format::read_binary(input)?,
        };
        let image = self.transform(image, options)?;
        self.serialize(&image)
    }

    /// Convert the file at `input`, writing the result to `output`.
    pub fn run(self, input: &Path, output: &Path, options: &Options) -> Result<()> {
        let image = match self {
            Command::TextToBin => read_text_file(input)?,
            _ => read_binary_file(input)?,
        };
        let image = self.transform(image, options)?;
        let data = self.serialize(&image)?;
        drop(image);

        fs::write(output, &data)
            .map_err(|source| Error::Create { path: output.to_owned(), source })?;
        info!("wrote {} bytes to {}", data.len(), output.display());
        Ok(())
    }
}
