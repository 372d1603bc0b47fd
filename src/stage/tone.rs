//! Purple-black tone mapping.
//!
//! The stage runs in two passes over every pixel: a contrast ramp around
//! mid-gray, then a per-channel remap that pulls the image toward purple
//! while crushing shadows toward black. Both passes are pure per-pixel
//! arithmetic, so rendering the same source with the same settings always
//! produces the identical buffer.

use image::RgbImage;

use crate::settings::FilterSettings;

/// Per-channel weights for the purple push and the shadow crush.
struct ChannelFactors {
    purple: f32,
    black: f32,
}

const RED: ChannelFactors = ChannelFactors {
    purple: 0.3,
    black: 0.2,
};
const GREEN: ChannelFactors = ChannelFactors {
    purple: -0.3,
    black: 0.3,
};
const BLUE: ChannelFactors = ChannelFactors {
    purple: 0.3,
    black: 0.3,
};

/// Fixed point of the contrast ramp.
const CONTRAST_MIDPOINT: f32 = 128.0;

/// Channel values below this count as shadows for the black crush.
const SHADOW_THRESHOLD: u8 = 128;

/// Renders the purple-black tone curve into a new buffer.
///
/// The source is left untouched so a stored session can re-render it under
/// different settings. Out-of-range settings are clamped before use.
///
/// # Example
///
/// ```
/// use image::{Rgb, RgbImage};
/// use plum_engine::{apply_tone, FilterSettings};
///
/// let source = RgbImage::from_pixel(1, 1, Rgb([100, 100, 100]));
/// let toned = apply_tone(&source, FilterSettings::default());
/// assert_eq!(toned.get_pixel(0, 0).0, [80, 70, 70]);
/// ```
pub fn apply_tone(source: &RgbImage, settings: FilterSettings) -> RgbImage {
    let settings = settings.clamped();
    let mut output = RgbImage::new(source.width(), source.height());
    for (dst, src) in output.pixels_mut().zip(source.pixels()) {
        let [r, g, b] = src.0;
        dst.0 = [
            remap(adjust_contrast(r, settings.contrast), &RED, &settings),
            remap(adjust_contrast(g, settings.contrast), &GREEN, &settings),
            remap(adjust_contrast(b, settings.contrast), &BLUE, &settings),
        ];
    }
    output
}

/// Scales the distance from mid-gray by `factor`.
///
/// A factor of 1.0 is the identity, 0.0 flattens the channel to mid-gray,
/// and values above 1.0 spread shadows and highlights apart.
fn adjust_contrast(value: u8, factor: f32) -> u8 {
    let scaled = (f32::from(value) - CONTRAST_MIDPOINT) * factor + CONTRAST_MIDPOINT;
    scaled.round().clamp(0.0, 255.0) as u8
}

/// Applies the purple push and shadow crush to one channel value.
///
/// The purple term scales the channel by its weighted intensity; the black
/// term darkens shadow values and leaves highlights alone. The darker of the
/// two wins. The black term stays unclamped below zero, so a strong crush
/// saturates at black in the final clamp.
fn remap(value: u8, factors: &ChannelFactors, settings: &FilterSettings) -> u8 {
    let base = f32::from(value);

    let purple = (base * (1.0 + settings.purple * factors.purple))
        .round()
        .clamp(0.0, 255.0);

    let darkened = if value < SHADOW_THRESHOLD {
        (base * (1.0 - settings.black * factors.black)).round()
    } else {
        base
    };

    purple.min(darkened).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn uniform(value: u8) -> RgbImage {
        RgbImage::from_pixel(2, 2, Rgb([value, value, value]))
    }

    #[test]
    fn neutral_settings_are_identity() {
        let source = RgbImage::from_fn(4, 4, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 200]));
        let toned = apply_tone(&source, FilterSettings::new(0.0, 0.0, 1.0));
        assert_eq!(toned, source, "zero intensity at unit contrast must be a no-op");
    }

    #[test]
    fn default_settings_match_known_values() {
        // red: min(round(100 * 1.3), round(100 * 0.8)) = 80
        let toned = apply_tone(&uniform(100), FilterSettings::default());
        assert_eq!(toned.get_pixel(0, 0).0, [80, 70, 70]);

        // green highlight: purple factor is negative, shadow crush skipped
        let toned = apply_tone(&uniform(200), FilterSettings::default());
        assert_eq!(toned.get_pixel(0, 0)[1], 140);

        // blue shadow: round(64 * 0.7) = 45 beats round(64 * 1.3) = 83
        let toned = apply_tone(&uniform(64), FilterSettings::default());
        assert_eq!(toned.get_pixel(0, 0)[2], 45);
    }

    #[test]
    fn zero_contrast_flattens_to_mid_gray() {
        let source = RgbImage::from_fn(3, 1, |x, _| Rgb([x as u8 * 100, 20, 240]));
        let toned = apply_tone(&source, FilterSettings::new(0.0, 0.0, 0.0));
        for pixel in toned.pixels() {
            assert_eq!(pixel.0, [128, 128, 128]);
        }
    }

    #[test]
    fn strong_crush_saturates_at_black() {
        // blue at 100 with black 4.0: round(100 * (1 - 1.2)) < 0, clamps to 0
        let toned = apply_tone(&uniform(100), FilterSettings::new(0.0, 4.0, 1.0));
        assert_eq!(toned.get_pixel(0, 0)[2], 0);
        // red weight is weaker: round(100 * (1 - 0.8)) = 20
        assert_eq!(toned.get_pixel(0, 0)[0], 20);
    }

    #[test]
    fn crush_leaves_highlights_alone() {
        let toned = apply_tone(&uniform(200), FilterSettings::new(0.0, 4.0, 1.0));
        assert_eq!(toned.get_pixel(0, 0).0, [200, 200, 200]);
    }

    #[test]
    fn out_of_range_settings_are_clamped_before_use() {
        let wild = FilterSettings {
            purple: 100.0,
            black: -5.0,
            contrast: 1.0,
        };
        let tamed = FilterSettings::new(100.0, -5.0, 1.0);
        assert_eq!(apply_tone(&uniform(90), wild), apply_tone(&uniform(90), tamed));
    }

    #[test]
    fn rendering_is_deterministic() {
        let source = RgbImage::from_fn(8, 8, |x, y| {
            Rgb([(x * 31) as u8, (y * 17) as u8, ((x + y) * 13) as u8])
        });
        let settings = FilterSettings::new(2.5, 1.5, 2.0);
        assert_eq!(apply_tone(&source, settings), apply_tone(&source, settings));
    }

    #[test]
    fn source_buffer_is_untouched() {
        let source = uniform(100);
        let before = source.clone();
        let _ = apply_tone(&source, FilterSettings::default());
        assert_eq!(source, before);
    }
}
