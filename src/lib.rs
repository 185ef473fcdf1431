//! Conversion between text (`P1`), raw (`P4`) and run-length compressed (`C4`)
//! monochrome bitmaps.
//!
//! Pixels are stored as a packed bit array: pixel `(x, y)` lives at bit
//! `y * width + x`, most significant bit first, rows are not padded.
use std::collections::TryReserveError;
use std::ops::Not;
use std::fmt;

mod error;

/// Image model
pub mod image;

/// Run-length encoder
pub mod encoder;

/// Run-length decoder
pub mod decoder;

/// On-disk envelopes
pub mod format;

/// Read, transform and write pipelines
pub mod convert;

pub use error::{Error, Result};
pub use image::{Image, Marker};

/// Longest run a single token can describe.
pub const MAX_RUN: usize = 128;

/// Read bit `i` of a packed buffer.
///
/// Bit 0 is the most significant bit of byte 0.
/// The caller guarantees `i < data.len() * 8`.
#[inline]
pub fn get_bit(data: &[u8], i: usize) -> bool {
    let shift = 7 - i % 8;
    (data[i / 8] >> shift) & 1 == 1
}

/// Write bit `i` of a packed buffer, leaving the other bits of the byte alone.
#[inline]
pub fn set_bit(data: &mut [u8], i: usize, bit: bool) {
    let mask = 1u8 << (7 - i % 8);
    if bit {
        data[i / 8] |= mask;
    } else {
        data[i / 8] &= !mask;
    }
}

/// Number of pixels of a `width` x `height` image, `None` on overflow.
pub fn bit_count(width: usize, height: usize) -> Option<usize> {
    width.checked_mul(height)
}

/// Bytes needed to store `width * height` bits, `None` on overflow.
pub fn packed_size(width: usize, height: usize) -> Option<usize> {
    let bits = bit_count(width, height)?;
    Some(bits / 8 + (bits % 8 != 0) as usize)
}

/// Iterate over the bits of a slice, MSB first.
///
/// Yields `data.len() * 8` items; use `take` to strip the padding.
pub fn slice_bits(data: &[u8]) -> impl Iterator<Item=bool> + '_ {
    (0 .. data.len() * 8).map(move |i| get_bit(data, i))
}

/// Pixel value. `Black` is a set bit, as in PBM.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Color {
    Black,
    White
}
impl Not for Color {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}
impl From<bool> for Color {
    fn from(bit: bool) -> Self {
        if bit { Color::Black } else { Color::White }
    }
}
impl From<Color> for bool {
    fn from(color: Color) -> bool {
        color == Color::Black
    }
}

/// One run of equal pixels, `1 ..= MAX_RUN` long.
///
/// Stored as a single token byte: the top bit is the pixel value,
/// the low seven bits are `len - 1`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Run {
    pub color: Color,
    len: u8,
}
impl Run {
    /// Returns `None` if `len` is zero or longer than `MAX_RUN`.
    pub fn new(color: Color, len: usize) -> Option<Run> {
        if len == 0 || len > MAX_RUN {
            return None;
        }
        Some(Run { color, len: (len - 1) as u8 })
    }
    pub fn from_token(token: u8) -> Run {
        Run {
            color: Color::from(token & 0x80 != 0),
            len: token & 0x7F,
        }
    }
    pub fn token(self) -> u8 {
        (bool::from(self.color) as u8) << 7 | self.len
    }
    pub fn len(self) -> usize {
        self.len as usize + 1
    }
}
impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}x{}", self.color, self.len())
    }
}

/// Trait to write pixels one after another.
///
/// `VecWriter` is provided for packing them into a bit array.
pub trait BitWriter {
    type Error;

    fn write(&mut self, color: Color) -> std::result::Result<(), Self::Error>;

    fn write_run(&mut self, run: Run) -> std::result::Result<(), Self::Error> {
        for _ in 0 .. run.len() {
            self.write(run.color)?;
        }
        Ok(())
    }
}

/// Pixels did not fit into the writer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Full;

/// Packs pixels MSB first, up to a fixed number of bits.
///
/// The buffer grows with the bits actually written, so the capacity may
/// come straight from an untrusted header.
pub struct VecWriter {
    data: Vec<u8>,
    capacity: usize,
    len: usize,
}
impl BitWriter for VecWriter {
    type Error = Full;
    fn write(&mut self, color: Color) -> std::result::Result<(), Full> {
        if self.len == self.capacity {
            return Err(Full);
        }
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        set_bit(&mut self.data, self.len, color.into());
        self.len += 1;
        Ok(())
    }
}
impl VecWriter {
    /// with capacity of `n` bits, all initially white.
    pub fn with_capacity(n: usize) -> Self {
        VecWriter {
            data: Vec::new(),
            capacity: n,
            len: 0
        }
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Return all `capacity` bits packed. Bits that were never written are `0`.
    ///
    /// Padding the unwritten tail is the only allocation not backed by
    /// written bits, so it is done fallibly.
    pub fn finish(mut self) -> std::result::Result<Vec<u8>, TryReserveError> {
        let size = self.capacity / 8 + (self.capacity % 8 != 0) as usize;
        self.data.try_reserve_exact(size - self.data.len())?;
        self.data.resize(size, 0);
        Ok(self.data)
    }
}

#[test]
fn test_bits() {
    let mut data = [0b1000_0001, 0];
    assert!(get_bit(&data, 0));
    assert!(!get_bit(&data, 1));
    assert!(get_bit(&data, 7));

    set_bit(&mut data, 9, true);
    assert_eq!(data, [0b1000_0001, 0b0100_0000]);
    set_bit(&mut data, 0, false);
    assert_eq!(data, [0b0000_0001, 0b0100_0000]);
    set_bit(&mut data, 7, true);
    assert_eq!(data, [0b0000_0001, 0b0100_0000]);
}

#[test]
fn test_packed_size() {
    assert_eq!(packed_size(2, 2), Some(1));
    assert_eq!(packed_size(3, 3), Some(2));
    assert_eq!(packed_size(8, 2), Some(2));
    assert_eq!(packed_size(0, 5), Some(0));
    assert_eq!(packed_size(usize::MAX, 2), None);
}

#[test]
fn test_run_token() {
    let run = Run::new(Color::White, 4).unwrap();
    assert_eq!(run.token(), 0x03);
    let run = Run::new(Color::Black, 128).unwrap();
    assert_eq!(run.token(), 0xFF);
    assert_eq!(Run::from_token(0x80), Run::new(Color::Black, 1).unwrap());
    assert_eq!(Run::new(Color::Black, 0), None);
    assert_eq!(Run::new(Color::Black, 129), None);
}

#[test]
fn test_vec_writer() {
    let mut writer = VecWriter::with_capacity(10);
    writer.write_run(Run::new(Color::Black, 3).unwrap()).unwrap();
    writer.write_run(Run::new(Color::White, 6).unwrap()).unwrap();
    writer.write(Color::Black).unwrap();
    assert!(writer.is_full());
    assert_eq!(writer.write(Color::Black), Err(Full));
    assert_eq!(writer.finish().unwrap(), vec![0b1110_0000, 0b0100_0000]);

    let mut writer = VecWriter::with_capacity(20);
    writer.write(Color::Black).unwrap();
    assert_eq!(writer.finish().unwrap(), vec![0b1000_0000, 0, 0]);
}
