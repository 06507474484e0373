//! Short-term reference picture sets (`st_ref_pic_set()`).
//!
//! Inter-predicted sets are expanded into explicit delta POC lists when
//! parsed, so every set can serve as a prediction source for later ones.

use isobits_core::{Error, ExpGolombRead, ReadBits, Result, ResultExt};

const STRUCTURE: &str = "st_ref_pic_set";

/// Largest DPB size, bounding the pictures one set can list.
const MAX_DPB_SIZE: u32 = 16;

/// Largest `delta_poc_s*_minus1` and `abs_delta_rps_minus1`.
const MAX_DELTA_MINUS1: u32 = (1 << 15) - 1;

/// A short-term reference picture set with derived delta POCs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortTermRefPicSet {
    pub inter_ref_pic_set_prediction_flag: bool,
    /// Only coded for a set in a slice header.
    pub delta_idx_minus1: u32,
    /// Signed `deltaRps` of a predicted set.
    pub delta_rps: i32,
    /// DeltaPocS0, closest picture first (all negative).
    pub delta_poc_s0: Vec<i32>,
    /// UsedByCurrPicS0.
    pub used_by_curr_pic_s0: Vec<bool>,
    /// DeltaPocS1, closest picture first (all positive).
    pub delta_poc_s1: Vec<i32>,
    /// UsedByCurrPicS1.
    pub used_by_curr_pic_s1: Vec<bool>,
}

impl ShortTermRefPicSet {
    /// Parse `st_ref_pic_set(stRpsIdx)`.
    ///
    /// `sets` holds the sets parsed before this one. `num_short_term_ref_pic_sets`
    /// is the SPS count; the slice header codes its own set with
    /// `st_rps_idx == num_short_term_ref_pic_sets`.
    pub fn parse<R: ReadBits + ?Sized>(
        reader: &mut R,
        st_rps_idx: usize,
        num_short_term_ref_pic_sets: usize,
        sets: &[ShortTermRefPicSet],
    ) -> Result<Self> {
        Self::parse_fields(reader, st_rps_idx, num_short_term_ref_pic_sets, sets)
            .within(STRUCTURE, reader.bit_position())
    }

    fn parse_fields<R: ReadBits + ?Sized>(
        reader: &mut R,
        st_rps_idx: usize,
        num_short_term_ref_pic_sets: usize,
        sets: &[ShortTermRefPicSet],
    ) -> Result<Self> {
        let inter = st_rps_idx != 0 && reader.read_flag()?;
        if inter {
            Self::parse_predicted(reader, st_rps_idx, num_short_term_ref_pic_sets, sets)
        } else {
            Self::parse_explicit(reader)
        }
    }

    fn parse_explicit<R: ReadBits + ?Sized>(reader: &mut R) -> Result<Self> {
        let num_negative_pics = reader.read_ue()?;
        let num_positive_pics = reader.read_ue()?;
        if num_negative_pics > MAX_DPB_SIZE || num_positive_pics > MAX_DPB_SIZE - num_negative_pics
        {
            return Err(Error::format(
                STRUCTURE,
                format!("{num_negative_pics} negative and {num_positive_pics} positive pictures"),
            ));
        }

        let mut set = Self::default();
        let mut poc = 0i32;
        for _ in 0..num_negative_pics {
            poc -= read_delta(reader)?;
            set.delta_poc_s0.push(poc);
            set.used_by_curr_pic_s0.push(reader.read_flag()?);
        }
        poc = 0;
        for _ in 0..num_positive_pics {
            poc += read_delta(reader)?;
            set.delta_poc_s1.push(poc);
            set.used_by_curr_pic_s1.push(reader.read_flag()?);
        }
        Ok(set)
    }

    fn parse_predicted<R: ReadBits + ?Sized>(
        reader: &mut R,
        st_rps_idx: usize,
        num_short_term_ref_pic_sets: usize,
        sets: &[ShortTermRefPicSet],
    ) -> Result<Self> {
        let delta_idx_minus1 = if st_rps_idx == num_short_term_ref_pic_sets {
            reader.read_ue()?
        } else {
            0
        };
        let r = st_rps_idx
            .checked_sub(delta_idx_minus1 as usize + 1)
            .and_then(|i| sets.get(i))
            .ok_or_else(|| {
                Error::format(
                    STRUCTURE,
                    format!("delta_idx_minus1 {delta_idx_minus1} out of range"),
                )
            })?;

        let delta_rps_sign = reader.read_flag()?;
        let abs_delta_rps = read_delta(reader)?;
        let delta_rps = if delta_rps_sign { -abs_delta_rps } else { abs_delta_rps };

        // One used/use_delta pair per reference picture, plus one for the
        // reference set's own picture.
        let num_delta_pocs = r.num_delta_pocs();
        let mut used_by_curr_pic = Vec::with_capacity(num_delta_pocs + 1);
        let mut use_delta = Vec::with_capacity(num_delta_pocs + 1);
        for _ in 0..=num_delta_pocs {
            let used = reader.read_flag()?;
            used_by_curr_pic.push(used);
            use_delta.push(used || reader.read_flag()?);
        }

        let neg = r.delta_poc_s0.len();
        let mut set = Self {
            inter_ref_pic_set_prediction_flag: true,
            delta_idx_minus1,
            delta_rps,
            ..Self::default()
        };

        for j in (0..r.delta_poc_s1.len()).rev() {
            let d_poc = r.delta_poc_s1[j] + delta_rps;
            if d_poc < 0 && use_delta[neg + j] {
                set.delta_poc_s0.push(d_poc);
                set.used_by_curr_pic_s0.push(used_by_curr_pic[neg + j]);
            }
        }
        if delta_rps < 0 && use_delta[num_delta_pocs] {
            set.delta_poc_s0.push(delta_rps);
            set.used_by_curr_pic_s0.push(used_by_curr_pic[num_delta_pocs]);
        }
        for j in 0..neg {
            let d_poc = r.delta_poc_s0[j] + delta_rps;
            if d_poc < 0 && use_delta[j] {
                set.delta_poc_s0.push(d_poc);
                set.used_by_curr_pic_s0.push(used_by_curr_pic[j]);
            }
        }

        for j in (0..neg).rev() {
            let d_poc = r.delta_poc_s0[j] + delta_rps;
            if d_poc > 0 && use_delta[j] {
                set.delta_poc_s1.push(d_poc);
                set.used_by_curr_pic_s1.push(used_by_curr_pic[j]);
            }
        }
        if delta_rps > 0 && use_delta[num_delta_pocs] {
            set.delta_poc_s1.push(delta_rps);
            set.used_by_curr_pic_s1.push(used_by_curr_pic[num_delta_pocs]);
        }
        for j in 0..r.delta_poc_s1.len() {
            let d_poc = r.delta_poc_s1[j] + delta_rps;
            if d_poc > 0 && use_delta[neg + j] {
                set.delta_poc_s1.push(d_poc);
                set.used_by_curr_pic_s1.push(used_by_curr_pic[neg + j]);
            }
        }

        if set.num_delta_pocs() > MAX_DPB_SIZE as usize {
            return Err(Error::format(STRUCTURE, "predicted set lists too many pictures"));
        }
        Ok(set)
    }

    /// NumNegativePics.
    pub fn num_negative_pics(&self) -> usize {
        self.delta_poc_s0.len()
    }

    /// NumPositivePics.
    pub fn num_positive_pics(&self) -> usize {
        self.delta_poc_s1.len()
    }

    /// NumDeltaPocs.
    pub fn num_delta_pocs(&self) -> usize {
        self.delta_poc_s0.len() + self.delta_poc_s1.len()
    }

    /// Pictures of this set that the current picture may reference.
    pub fn num_used_by_curr_pic(&self) -> usize {
        self.used_by_curr_pic_s0
            .iter()
            .chain(&self.used_by_curr_pic_s1)
            .filter(|&&used| used)
            .count()
    }
}

/// A `*_minus1` POC distance, returned plus one.
fn read_delta<R: ReadBits + ?Sized>(reader: &mut R) -> Result<i32> {
    let minus1 = reader.read_ue()?;
    if minus1 > MAX_DELTA_MINUS1 {
        return Err(Error::format(STRUCTURE, format!("POC delta {minus1} out of range")));
    }
    Ok(minus1 as i32 + 1)
}
