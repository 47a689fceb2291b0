//! NPY v1.0 array encoding
//!
//! Layout: magic `\x93NUMPY`, version `1.0`, little-endian `u16` header length,
//! a Python dict literal padded with spaces so the data starts on a 64-byte
//! boundary, then the raw C-order element bytes in native byte order.

use std::io::{self, Write};

use bytemuck::Pod;
use ndarray::{ArrayBase, Data, Dimension};

const MAGIC: &[u8] = b"\x93NUMPY";
const VERSION: [u8; 2] = [1, 0];
const ALIGNMENT: usize = 64;
const PREAMBLE_LEN: usize = MAGIC.len() + VERSION.len() + 2;

/// Element types that map to a NumPy dtype
pub trait NpyElement: Pod {
    /// dtype kind and size, e.g. `f8`
    const KIND: &'static str;
}

impl NpyElement for u8 {
    const KIND: &'static str = "u1";
}

impl NpyElement for i64 {
    const KIND: &'static str = "i8";
}

impl NpyElement for f32 {
    const KIND: &'static str = "f4";
}

impl NpyElement for f64 {
    const KIND: &'static str = "f8";
}

fn byte_order() -> char {
    if cfg!(target_endian = "little") {
        '<'
    } else {
        '>'
    }
}

/// dtype descriptor string of `T`
pub fn descr<T: NpyElement>() -> String {
    if std::mem::size_of::<T>() == 1 {
        format!("|{}", T::KIND)
    } else {
        format!("{}{}", byte_order(), T::KIND)
    }
}

/// Encode the preamble and header dict for an array of `shape`
pub fn header(descr: &str, shape: &[usize]) -> Vec<u8> {
    let shape = match shape {
        [] => "()".to_string(),
        [len] => format!("({len},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut dict = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
    let unpadded = PREAMBLE_LEN + dict.len() + 1;
    dict.push_str(&" ".repeat((ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT));
    dict.push('\n');

    let mut out = Vec::with_capacity(PREAMBLE_LEN + dict.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out
}

/// Write an n-dimensional array
pub fn write_array<W, S, D, T>(writer: &mut W, array: &ArrayBase<S, D>) -> io::Result<()>
where
    W: Write,
    S: Data<Elem = T>,
    D: Dimension,
    T: NpyElement,
{
    writer.write_all(&header(&descr::<T>(), array.shape()))?;
    let contiguous = array.as_standard_layout();
    let values = contiguous
        .as_slice()
        .ok_or_else(|| io::Error::other("array is not in standard layout"))?;
    writer.write_all(bytemuck::cast_slice(values))
}

/// Write a 0-d array
pub fn write_scalar<W: Write, T: NpyElement>(writer: &mut W, value: T) -> io::Result<()> {
    writer.write_all(&header(&descr::<T>(), &[]))?;
    writer.write_all(bytemuck::bytes_of(&value))
}

/// Write a 0-d unicode string (`U{n}`, UTF-32 code points)
pub fn write_str<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let mut code_points: Vec<u32> = value.chars().map(u32::from).collect();
    if code_points.is_empty() {
        code_points.push(0);
    }
    let descr = format!("{}U{}", byte_order(), code_points.len());
    writer.write_all(&header(&descr, &[]))?;
    writer.write_all(bytemuck::cast_slice(&code_points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    fn split(bytes: &[u8]) -> (String, &[u8]) {
        assert_eq!(&bytes[..6], MAGIC);
        assert_eq!(&bytes[6..8], &VERSION);
        let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let dict = std::str::from_utf8(&bytes[PREAMBLE_LEN..PREAMBLE_LEN + len]).unwrap();
        (dict.to_string(), &bytes[PREAMBLE_LEN + len..])
    }

    #[test]
    fn test_header_alignment() {
        for shape in [&[][..], &[2][..], &[4, 4][..], &[1208, 1920][..]] {
            let bytes = header("<f8", shape);
            assert_eq!(bytes.len() % ALIGNMENT, 0, "shape {shape:?}");
            assert_eq!(*bytes.last().unwrap(), b'\n');
        }
    }

    #[test]
    fn test_shape_literals() {
        let (dict, _) = split(&header("<f8", &[]));
        assert!(dict.contains("'shape': ()"), "{dict}");
        let (dict, _) = split(&header("<f8", &[2]));
        assert!(dict.contains("'shape': (2,)"), "{dict}");
        let (dict, _) = split(&header("|u1", &[3, 5]));
        assert!(dict.starts_with("{'descr': '|u1', 'fortran_order': False, 'shape': (3, 5), }"));
    }

    #[test]
    fn test_descr() {
        assert_eq!(descr::<u8>(), "|u1");
        assert_eq!(descr::<f32>(), format!("{}f4", byte_order()));
        assert_eq!(descr::<i64>(), format!("{}i8", byte_order()));
    }

    #[test]
    fn test_write_array_payload() {
        let mut out = Vec::new();
        let array = Array2::from_shape_vec((2, 2), vec![1.5f32, -2.0, 0.0, 8.25]).unwrap();
        write_array(&mut out, &array).unwrap();

        let (dict, data) = split(&out);
        assert!(dict.contains("(2, 2)"));
        let values: Vec<f32> = data
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, vec![1.5, -2.0, 0.0, 8.25]);
    }

    #[test]
    fn test_write_array_transposed_is_c_order() {
        let mut out = Vec::new();
        let array = Array2::from_shape_vec((2, 3), vec![0u8, 1, 2, 3, 4, 5]).unwrap();
        write_array(&mut out, &array.t()).unwrap();

        let (dict, data) = split(&out);
        assert!(dict.contains("(3, 2)"));
        assert_eq!(data, &[0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_write_scalar_and_vector() {
        let mut out = Vec::new();
        write_scalar(&mut out, 42i64).unwrap();
        let (_, data) = split(&out);
        assert_eq!(data, 42i64.to_ne_bytes());

        let mut out = Vec::new();
        write_array(&mut out, &arr1(&[960.0f64, 604.0])).unwrap();
        let (dict, data) = split(&out);
        assert!(dict.contains("(2,)"));
        assert_eq!(data.len(), 16);
    }

    #[test]
    fn test_write_str() {
        let mut out = Vec::new();
        write_str(&mut out, "Town01_7").unwrap();
        let (dict, data) = split(&out);
        assert!(dict.contains("U8'"), "{dict}");
        assert_eq!(data.len(), 8 * 4);
        assert_eq!(u32::from_ne_bytes([data[0], data[1], data[2], data[3]]), 'T' as u32);

        let mut out = Vec::new();
        write_str(&mut out, "").unwrap();
        let (dict, data) = split(&out);
        assert!(dict.contains("U1'"));
        assert_eq!(data, &[0, 0, 0, 0]);
    }
}
