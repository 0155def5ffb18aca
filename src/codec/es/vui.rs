use crate::error::Result;
use crate::utils::BitReader;

/// Sample aspect ratios for aspect_ratio_idc 1-16 (table E-1, same in both codecs).
const SAR_TABLE: [(u32, u32); 17] = [
    (0, 1),
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
    (4, 3),
    (3, 2),
    (2, 1),
];

const EXTENDED_SAR: u32 = 255;

/// Reads aspect_ratio_idc (and sar_width/sar_height for Extended_SAR).
///
/// Unspecified, reserved or zero ratios yield `None`.
pub fn read_aspect_ratio(reader: &mut BitReader) -> Result<Option<(u32, u32)>> {
    let aspect_ratio_idc = reader.read_bits(8)?;
    if aspect_ratio_idc == EXTENDED_SAR {
        let width = reader.read_bits(16)?;
        let height = reader.read_bits(16)?;
        return Ok((width > 0 && height > 0).then_some((width, height)));
    }
    Ok(SAR_TABLE
        .get(aspect_ratio_idc as usize)
        .copied()
        .filter(|&(w, _)| w > 0))
}
