//! Tables shared by the VUI syntax of every codec in the family.

/// `aspect_ratio_idc` value signalling an explicit `sar_width`/`sar_height`.
pub const EXTENDED_SAR: u8 = 255;

/// Sample aspect ratios for `aspect_ratio_idc` 0..=16 (Table E-1 in both
/// H.264 and H.265). Index 0 is "unspecified".
const ASPECT_RATIOS: [(u16, u16); 17] = [
    (0, 0),
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

/// Sample aspect ratio for a table-coded `aspect_ratio_idc`.
///
/// Returns `None` for [`EXTENDED_SAR`] (the ratio follows in the bitstream)
/// and for reserved values.
pub fn sample_aspect_ratio(aspect_ratio_idc: u8) -> Option<(u16, u16)> {
    ASPECT_RATIOS.get(usize::from(aspect_ratio_idc)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_aspect_ratio() {
        assert_eq!(sample_aspect_ratio(1), Some((1, 1)));
        assert_eq!(sample_aspect_ratio(14), Some((4, 3)));
        assert_eq!(sample_aspect_ratio(16), Some((2, 1)));
        assert_eq!(sample_aspect_ratio(17), None);
        assert_eq!(sample_aspect_ratio(EXTENDED_SAR), None);
    }
}
