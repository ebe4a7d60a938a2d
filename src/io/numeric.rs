//! Typed reading and writing of raw numeric binary streams.

use std::io::{self, BufRead, Read, Write};
use std::marker::PhantomData;

use anyhow;
use byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};

#[cfg(test)]
#[path = "numeric_tests.rs"]
mod numeric_tests;

/// Trait for numeric types that can be read from and written to raw binary streams in a given
/// byte order.
pub(crate) trait NumericValue: Sized {
    /// Reads one value from `reader`.
    fn read_value<B: ByteOrder, R: Read>(reader: &mut R) -> io::Result<Self>;

    /// Writes one value to `writer`.
    fn write_value<B: ByteOrder, W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

macro_rules! impl_numeric_value {
    ($($t:ty => $read:ident, $write:ident);+ $(;)?) => {$(
        impl NumericValue for $t {
            fn read_value<B: ByteOrder, R: Read>(reader: &mut R) -> io::Result<Self> {
                reader.$read::<B>()
            }

            fn write_value<B: ByteOrder, W: Write>(&self, writer: &mut W) -> io::Result<()> {
                writer.$write::<B>(*self)
            }
        }
    )+}
}

impl_numeric_value!(
    u32 => read_u32, write_u32;
    u64 => read_u64, write_u64;
    i32 => read_i32, write_i32;
    i64 => read_i64, write_i64;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
);

/// Iterable structure for reading values of one numeric type from a binary stream.
///
/// Iteration stops at the first value that cannot be read in full.
pub(crate) struct NumericReader<R: BufRead, B: ByteOrder, T> {
    /// The inner reader.
    inner: R,

    /// The byte order of the numeric values to be read.
    byte_order: PhantomData<B>,

    /// The type of the numeric values to be read.
    numeric_type: PhantomData<T>,
}

impl<R: BufRead, B: ByteOrder, T> NumericReader<R, B, T> {
    /// Constructs a numeric reader wrapping around a buffered reader.
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            byte_order: PhantomData,
            numeric_type: PhantomData,
        }
    }

    /// Continues reading the same stream as values of a different numeric type.
    pub(crate) fn retype<U>(self) -> NumericReader<R, B, U> {
        NumericReader::new(self.inner)
    }

    /// Returns `true` if the stream has no bytes left.
    pub(crate) fn is_exhausted(&mut self) -> Result<bool, anyhow::Error> {
        Ok(self.inner.fill_buf()?.is_empty())
    }
}

impl<R: BufRead, B: ByteOrder, T: NumericValue> Iterator for NumericReader<R, B, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        T::read_value::<B, _>(&mut self.inner).ok()
    }
}

/// Writes a sequence of numeric values to a binary stream.
///
/// # Arguments
///
/// * `writer` - The stream to be written to.
/// * `values` - The values to be written, in order.
pub(crate) fn write_numeric<'v, B, W, T, I>(writer: &mut W, values: I) -> io::Result<()>
where
    B: ByteOrder,
    W: Write,
    T: NumericValue + 'v,
    I: IntoIterator<Item = &'v T>,
{
    values
        .into_iter()
        .try_for_each(|value| value.write_value::<B, _>(writer))
}
