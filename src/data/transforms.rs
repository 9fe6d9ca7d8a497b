//! 半精度量化
//!
//! 低精度存储只影响数据供应侧：图像张量在产出前经过一次
//! f32 → f16 → f32 的往返，网络内部自始至终按 f32 运算。

use crate::nn::FeatureMap;

/// 对整个图像张量做 f16 往返量化（就地）
pub fn quantize_images(images: &mut FeatureMap) {
    images.mapv_inplace(f16_round_trip);
}

/// 单个标量的 f16 往返：编码为 IEEE 754 binary16 再解码回 f32
pub fn f16_round_trip(v: f32) -> f32 {
    f16_bits_to_f32(f32_to_f16_bits(v))
}

/// f32 → binary16 位模式，舍入采用就近偶数
fn f32_to_f16_bits(v: f32) -> u16 {
    let bits = v.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exp == 0xff {
        // Inf 或 NaN（NaN 保留 quiet 位）
        if mantissa != 0 {
            return sign | 0x7e00;
        }
        return sign | 0x7c00;
    }

    let unbiased = exp - 127;
    if unbiased > 15 {
        // 上溢出为无穷
        return sign | 0x7c00;
    }
    if unbiased >= -14 {
        // 规格数
        let mut half_exp = (unbiased + 15) as u32;
        let mut half_man = mantissa >> 13;
        let dropped = mantissa & 0x1fff;
        if dropped > 0x1000 || (dropped == 0x1000 && half_man & 1 == 1) {
            half_man += 1;
            if half_man == 0x400 {
                half_man = 0;
                half_exp += 1;
                if half_exp >= 31 {
                    return sign | 0x7c00;
                }
            }
        }
        return sign | ((half_exp as u16) << 10) | half_man as u16;
    }
    if unbiased >= -24 {
        // 次规格数：补上隐含位后右移
        let full_man = mantissa | 0x0080_0000;
        let shift = (-unbiased - 1) as u32;
        let mut half_man = full_man >> shift;
        let dropped = full_man & ((1 << shift) - 1);
        let half_point = 1u32 << (shift - 1);
        if dropped > half_point || (dropped == half_point && half_man & 1 == 1) {
            half_man += 1;
        }
        // 进位恰好落到最小规格数的编码上
        return sign | half_man as u16;
    }
    // 低于次规格数下界，冲刷为零
    sign
}

/// binary16 位模式 → f32（精确，无舍入）
fn f16_bits_to_f32(h: u16) -> f32 {
    let sign = ((h & 0x8000) as u32) << 16;
    let exp = ((h >> 10) & 0x1f) as u32;
    let man = (h & 0x3ff) as u32;

    let bits = match (exp, man) {
        (0, 0) => sign,
        (0, _) => {
            // 次规格数：左移归一化
            let mut exp32 = 113u32;
            let mut m = man << 13;
            while m & 0x0080_0000 == 0 {
                m <<= 1;
                exp32 -= 1;
            }
            sign | (exp32 << 23) | (m & 0x007f_ffff)
        }
        (31, 0) => sign | 0x7f80_0000,
        (31, _) => sign | 0x7fc0_0000,
        _ => sign | ((exp + 112) << 23) | (man << 13),
    };
    f32::from_bits(bits)
}
