use crate::processing::bits::{remove_emulation_prevention, BitReader};
use crate::{ByteReader, Error, Result};

/// Profiles whose SPS carries chroma format and scaling list fields
const HIGH_PROFILES: [u8; 12] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134];

/// AVCDecoderConfigurationRecord carried by an AVC sequence header
#[derive(Debug, Clone, PartialEq)]
pub struct AvcDecoderConfig {
    pub version: u8,
    pub profile: u8,
    pub profile_compat: u8,
    pub level: u8,
    /// Size in bytes of the NALU length prefix
    pub nal_length_size: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl AvcDecoderConfig {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let short = |_| Error::protocol("AVC decoder configuration record too short");

        let version = reader.read_u8().map_err(short)?;
        let profile = reader.read_u8().map_err(short)?;
        let profile_compat = reader.read_u8().map_err(short)?;
        let level = reader.read_u8().map_err(short)?;
        let nal_length_size = (reader.read_u8().map_err(short)? & 0x03) + 1;

        let sps_count = reader.read_u8().map_err(short)? & 0x1F;
        let mut sps = Vec::with_capacity(sps_count as usize);
        for _ in 0..sps_count {
            let len = reader.read_u16_be().map_err(short)? as usize;
            sps.push(reader.read_bytes(len).map_err(short)?.to_vec());
        }

        // Some encoders stop after the SPS list
        let mut pps = Vec::new();
        if let Ok(pps_count) = reader.read_u8() {
            for _ in 0..pps_count {
                let len = reader.read_u16_be().map_err(short)? as usize;
                pps.push(reader.read_bytes(len).map_err(short)?.to_vec());
            }
        }

        Ok(AvcDecoderConfig {
            version,
            profile,
            profile_compat,
            level,
            nal_length_size,
            sps,
            pps,
        })
    }

    /// Parse the first SPS of the record
    pub fn sequence_parameters(&self) -> Result<SequenceParameterSet> {
        let sps = self
            .sps
            .first()
            .ok_or_else(|| Error::protocol("AVC decoder configuration has no SPS"))?;
        SequenceParameterSet::parse(sps)
    }
}

/// Fields of an H.264 sequence parameter set needed for stream info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceParameterSet {
    pub profile_idc: u8,
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub chroma_format_idc: u32,
    pub width: u32,
    pub height: u32,
}

impl SequenceParameterSet {
    /// Parse an SPS NAL unit, header byte included
    pub fn parse(nal: &[u8]) -> Result<Self> {
        let rbsp = remove_emulation_prevention(nal);
        let mut bits = BitReader::new(&rbsp);

        bits.skip_bits(8)?; // NAL header
        let profile_idc = bits.read_bits(8)? as u8;
        let constraint_flags = bits.read_bits(8)? as u8;
        let level_idc = bits.read_bits(8)? as u8;
        bits.read_ue()?; // seq_parameter_set_id

        let mut chroma_format_idc = 1;
        if HIGH_PROFILES.contains(&profile_idc) {
            chroma_format_idc = bits.read_ue()?;
            if chroma_format_idc == 3 {
                bits.skip_bits(1)?; // separate_colour_plane_flag
            }
            bits.read_ue()?; // bit_depth_luma_minus8
            bits.read_ue()?; // bit_depth_chroma_minus8
            bits.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag
            if bits.read_bool()? {
                let lists = if chroma_format_idc == 3 { 12 } else { 8 };
                for i in 0..lists {
                    if bits.read_bool()? {
                        skip_scaling_list(&mut bits, if i < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        bits.read_ue()?; // log2_max_frame_num_minus4
        match bits.read_ue()? {
            0 => {
                bits.read_ue()?; // log2_max_pic_order_cnt_lsb_minus4
            }
            1 => {
                bits.skip_bits(1)?; // delta_pic_order_always_zero_flag
                bits.read_se()?; // offset_for_non_ref_pic
                bits.read_se()?; // offset_for_top_to_bottom_field
                let cycle = bits.read_ue()?;
                for _ in 0..cycle {
                    bits.read_se()?;
                }
            }
            _ => {}
        }

        bits.read_ue()?; // max_num_ref_frames
        bits.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag
        let width_in_mbs = bits.read_ue()?.saturating_add(1);
        let height_in_map_units = bits.read_ue()?.saturating_add(1);
        let frame_mbs_only = bits.read_bit()? as u32;
        if frame_mbs_only == 0 {
            bits.skip_bits(1)?; // mb_adaptive_frame_field_flag
        }
        bits.skip_bits(1)?; // direct_8x8_inference_flag

        let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0, 0, 0, 0);
        if bits.read_bool()? {
            crop_left = bits.read_ue()?;
            crop_right = bits.read_ue()?;
            crop_top = bits.read_ue()?;
            crop_bottom = bits.read_ue()?;
        }

        let crop_unit_y = if frame_mbs_only == 1 { 2 } else { 4 };
        let width = cropped_size(width_in_mbs, 16, crop_left, crop_right, 2)?;
        let height = cropped_size(height_in_map_units, (2 - frame_mbs_only) * 16, crop_top, crop_bottom, crop_unit_y)?;

        Ok(SequenceParameterSet {
            profile_idc,
            constraint_flags,
            level_idc,
            chroma_format_idc,
            width,
            height,
        })
    }

    pub fn profile_name(&self) -> &'static str {
        avc_profile_name(self.profile_idc)
    }

    /// Level as a decimal, e.g. 3.1 for level_idc 31
    pub fn level(&self) -> f64 {
        self.level_idc as f64 / 10.0
    }
}

pub fn avc_profile_name(profile_idc: u8) -> &'static str {
    match profile_idc {
        66 => "Baseline",
        77 => "Main",
        88 => "Extended",
        100 => "High",
        110 => "High 10",
        122 => "High 4:2:2",
        244 => "High 4:4:4",
        _ => "Unknown",
    }
}

/// Luma samples left of `units * unit_size` after cropping. Sizes that do
/// not fit in 32 bits come from a corrupt parameter set.
fn cropped_size(units: u32, unit_size: u32, crop_a: u32, crop_b: u32, crop_unit: u32) -> Result<u32> {
    let full = units
        .checked_mul(unit_size)
        .ok_or_else(|| Error::protocol("SPS picture size out of range"))?;
    let crop = crop_a
        .checked_add(crop_b)
        .and_then(|c| c.checked_mul(crop_unit))
        .ok_or_else(|| Error::protocol("SPS cropping out of range"))?;
    Ok(full.saturating_sub(crop))
}

fn skip_scaling_list(bits: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;
    for _ in 0..size {
        if next_scale != 0 {
            let delta = bits.read_se()? as i64;
            next_scale = (last_scale + delta).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}
