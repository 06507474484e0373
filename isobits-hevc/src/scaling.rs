//! `scaling_list_data()` with prediction and default lists resolved.

use isobits_core::{Error, ExpGolombRead, ReadBits, Result, ResultExt};

const STRUCTURE: &str = "scaling_list_data";

/// Default 8x8 intra list (Table 7-6), up-right diagonal order.
const DEFAULT_INTRA_8X8: [u8; 64] = [
    16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 17, 16, 17, 16, 17, 18, 17, 18, 18, 17, 18, 21, 19, 20,
    21, 20, 19, 21, 24, 22, 22, 24, 24, 22, 22, 24, 25, 25, 27, 30, 27, 25, 25, 29, 31, 35, 35, 31,
    29, 36, 41, 44, 41, 36, 47, 54, 54, 47, 65, 70, 65, 88, 88, 115,
];

/// Default 8x8 inter list (Table 7-6), up-right diagonal order.
const DEFAULT_INTER_8X8: [u8; 64] = [
    16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 17, 18, 18, 18, 18, 18, 18, 20, 20, 20,
    20, 20, 20, 20, 24, 24, 24, 24, 24, 24, 24, 24, 25, 25, 25, 25, 25, 25, 25, 28, 28, 28, 28, 28,
    28, 33, 33, 33, 33, 33, 41, 41, 41, 41, 54, 54, 54, 71, 71, 91,
];

/// Value of the DC entry when none is coded.
const DEFAULT_DC: u8 = 16;

/// One coded scaling list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalingList {
    /// sizeId: 0 = 4x4, 1 = 8x8, 2 = 16x16, 3 = 32x32.
    pub size_id: u8,
    /// matrixId: 0-2 intra Y/Cb/Cr, 3-5 inter Y/Cb/Cr.
    pub matrix_id: u8,
    /// `scaling_list_pred_mode_flag`.
    pub explicit: bool,
    /// Resolved coefficients in up-right diagonal order (16 or 64).
    pub coefficients: Vec<u8>,
    /// Resolved DC coefficient for 16x16 and 32x32 lists.
    pub dc_coef: Option<u8>,
}

/// Every list coded in one `scaling_list_data()`, in coding order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalingListData {
    pub lists: Vec<ScalingList>,
}

fn default_list(size_id: u8, matrix_id: u8) -> Vec<u8> {
    match (size_id, matrix_id) {
        (0, _) => vec![16; 16],
        (_, 0..=2) => DEFAULT_INTRA_8X8.to_vec(),
        _ => DEFAULT_INTER_8X8.to_vec(),
    }
}

impl ScalingListData {
    /// Parse `scaling_list_data()`.
    pub fn parse<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::parse_fields(reader).within(STRUCTURE, reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut data = Self::default();
        for size_id in 0..4u8 {
            let step = if size_id == 3 { 3 } else { 1 };
            let coef_num = if size_id == 0 { 16 } else { 64 };
            for matrix_id in (0..6u8).step_by(step) {
                let list = if reader.read_flag()? {
                    read_explicit(reader, size_id, matrix_id, coef_num)?
                } else {
                    let delta = reader.read_ue()?;
                    data.predicted(size_id, matrix_id, delta)?
                };
                data.lists.push(list);
            }
        }
        Ok(data)
    }

    /// Resolve a list copied from `scaling_list_pred_matrix_id_delta`.
    fn predicted(&self, size_id: u8, matrix_id: u8, delta: u32) -> Result<ScalingList> {
        let (coefficients, dc_coef) = if delta == 0 {
            (default_list(size_id, matrix_id), (size_id > 1).then_some(DEFAULT_DC))
        } else {
            let step = if size_id == 3 { 3 } else { 1 };
            let ref_matrix_id = delta
                .checked_mul(step)
                .and_then(|d| u32::from(matrix_id).checked_sub(d))
                .ok_or_else(|| {
                    Error::format(
                        STRUCTURE,
                        format!("scaling_list_pred_matrix_id_delta {delta} out of range"),
                    )
                })?;
            let reference = self
                .get(size_id, ref_matrix_id as u8)
                .ok_or_else(|| Error::format(STRUCTURE, "reference scaling list not coded"))?;
            (reference.coefficients.clone(), reference.dc_coef)
        };
        Ok(ScalingList {
            size_id,
            matrix_id,
            explicit: false,
            coefficients,
            dc_coef,
        })
    }

    /// The list coded for `(size_id, matrix_id)`.
    pub fn get(&self, size_id: u8, matrix_id: u8) -> Option<&ScalingList> {
        self.lists
            .iter()
            .find(|l| l.size_id == size_id && l.matrix_id == matrix_id)
    }
}

fn read_explicit<R: ReadBits + ?Sized>(
    reader: &mut R,
    size_id: u8,
    matrix_id: u8,
    coef_num: usize,
) -> Result<ScalingList> {
    let mut next_coef = 8i32;
    let mut dc_coef = None;
    if size_id > 1 {
        let dc_minus8 = reader.read_se()?;
        if !(-7..=247).contains(&dc_minus8) {
            return Err(Error::format(
                STRUCTURE,
                format!("scaling_list_dc_coef_minus8 {dc_minus8} out of range"),
            ));
        }
        next_coef = dc_minus8 + 8;
        dc_coef = Some(next_coef as u8);
    }

    let mut coefficients = Vec::with_capacity(coef_num);
    for _ in 0..coef_num {
        let delta = reader.read_se()?;
        if !(-128..=127).contains(&delta) {
            return Err(Error::format(
                STRUCTURE,
                format!("scaling_list_delta_coef {delta} out of range"),
            ));
        }
        next_coef = (next_coef + delta).rem_euclid(256);
        coefficients.push(next_coef as u8);
    }

    Ok(ScalingList {
        size_id,
        matrix_id,
        explicit: true,
        coefficients,
        dc_coef,
    })
}
