use std::convert::Infallible;

use log::{debug, info};

use crate::{Color, Error, Image, Result, Run, MAX_RUN};

/// Receives the encoded run tokens.
pub trait TokenWriter {
    type Error;
    fn write(&mut self, token: u8) -> std::result::Result<(), Self::Error>;
}

impl TokenWriter for Vec<u8> {
    type Error = Infallible;
    fn write(&mut self, token: u8) -> std::result::Result<(), Infallible> {
        self.push(token);
        Ok(())
    }
}

/// Collects tokens, refusing to grow beyond `budget` bytes.
pub struct BudgetWriter {
    tokens: Vec<u8>,
    budget: usize,
}
impl BudgetWriter {
    pub fn new(budget: usize) -> Self {
        BudgetWriter {
            tokens: Vec::with_capacity(budget),
            budget,
        }
    }
    pub fn finish(self) -> Vec<u8> {
        self.tokens
    }
}
impl TokenWriter for BudgetWriter {
    type Error = Error;
    fn write(&mut self, token: u8) -> Result<()> {
        if self.tokens.len() >= self.budget {
            return Err(Error::CompressionOverflow { budget: self.budget });
        }
        self.tokens.push(token);
        Ok(())
    }
}

/// Run-length encoder.
///
/// Feed pixels with `encode`, then call `finish` to flush the last run.
pub struct Encoder<W> {
    writer: W,
    current: Option<(Color, usize)>,
}
impl<W: TokenWriter> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Encoder {
            writer,
            current: None,
        }
    }

    fn emit(&mut self, color: Color, len: usize) -> std::result::Result<(), W::Error> {
        // runs are split before they exceed MAX_RUN
        let run = match Run::new(color, len) {
            Some(run) => run,
            None => unreachable!("run of {} pixels", len),
        };
        let token = run.token();
        debug!("token {:#04x}: {:?} x {}", token, color, len);
        self.writer.write(token)
    }

    pub fn encode(&mut self, pels: impl Iterator<Item=Color>) -> std::result::Result<(), W::Error> {
        for color in pels {
            let current = self.current;
            self.current = match current {
                Some((c, n)) if c == color && n < MAX_RUN => Some((c, n + 1)),
                Some((c, n)) => {
                    self.emit(c, n)?;
                    Some((color, 1))
                }
                None => Some((color, 1)),
            };
        }
        Ok(())
    }

    pub fn finish(mut self) -> std::result::Result<W, W::Error> {
        if let Some((c, n)) = self.current.take() {
            self.emit(c, n)?;
        }
        Ok(self.writer)
    }
}

/// Run-length encode a raw (`P4`) image.
///
/// Aborts with `Error::CompressionOverflow` if the tokens would need more
/// bytes than the packed pixels.
pub fn compress(image: &Image) -> Result<Image> {
    if image.is_compressed() || image.is_text() {
        return Err(Error::WrongFormat {
            expected: "raw binary image (P4)",
            found: image.marker(),
        });
    }
    let budget = image.packed_size();
    let mut encoder = Encoder::new(BudgetWriter::new(budget));
    encoder.encode(image.pixels())?;
    let tokens = encoder.finish()?.finish();
    info!(
        "compressed {}x{} image from {} to {} bytes",
        image.width(), image.height(), budget, tokens.len()
    );
    Image::compressed(image.width(), image.height(), tokens)
}
