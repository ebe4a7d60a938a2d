use std::io::{BufReader, Cursor};

use byteorder::{BigEndian, LittleEndian};
use ndarray::{array, Array2};

use crate::io::numeric::{write_numeric, NumericReader};

#[test]
fn test_io_numeric_reader_f64_little_endian() {
    let bytes = (0..9)
        .flat_map(|i| (i as f64).to_le_bytes())
        .collect::<Vec<_>>();
    let v = NumericReader::<_, LittleEndian, f64>::new(BufReader::new(Cursor::new(bytes)))
        .collect::<Vec<_>>();
    let a = Array2::from_shape_vec((3, 3), v).unwrap();
    let a_ref = array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, 8.0]];
    assert_eq!(a, a_ref);
}

#[test]
fn test_io_numeric_reader_i32_big_endian() {
    let bytes = (0..15_i32)
        .flat_map(|i| i.to_be_bytes())
        .collect::<Vec<_>>();
    let v = NumericReader::<_, BigEndian, i32>::new(BufReader::new(Cursor::new(bytes)))
        .collect::<Vec<_>>();
    assert_eq!(v, (0..15).collect::<Vec<_>>());
}

#[test]
fn test_io_numeric_reader_incomplete_trailing_value() {
    let mut bytes = 7_u64.to_le_bytes().to_vec();
    bytes.extend_from_slice(&[1, 2, 3]);
    let v = NumericReader::<_, LittleEndian, u64>::new(BufReader::new(Cursor::new(bytes)))
        .collect::<Vec<_>>();
    assert_eq!(v, vec![7]);
}

#[test]
fn test_io_numeric_reader_retype() {
    let mut buf = vec![];
    write_numeric::<LittleEndian, _, _, _>(&mut buf, &[3_u64]).unwrap();
    write_numeric::<LittleEndian, _, _, _>(&mut buf, &[0.5_f64, -1.25, 2.0]).unwrap();
    let mut reader = NumericReader::<_, LittleEndian, u64>::new(BufReader::new(Cursor::new(buf)));
    let n = reader.next().unwrap() as usize;
    assert_eq!(n, 3);
    let mut reader = reader.retype::<f64>();
    let values = reader.by_ref().take(n).collect::<Vec<_>>();
    assert_eq!(values, vec![0.5, -1.25, 2.0]);
    assert!(reader.is_exhausted().unwrap());
}
