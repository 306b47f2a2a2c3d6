//! Simulcast bitrate allocation and rate-control buffer sizing.

use crate::settings::LayerConfig;

/// Split a total allocation across simulcast layers.
///
/// Enabled layers are filled lowest resolution first, each up to its
/// configured ceiling; whatever remains after every layer is satisfied
/// flows to the highest enabled layer (still capped at its ceiling).
/// Disabled layers always receive zero.
pub fn allocate_layer_bitrates(total_bps: u32, layers: &[LayerConfig]) -> Vec<u32> {
    let mut shares = vec![0u32; layers.len()];

    let mut order: Vec<usize> = (0..layers.len()).filter(|&i| layers[i].enabled).collect();
    order.sort_by_key(|&i| layers[i].size().pixel_count());

    let mut remaining = total_bps;
    for &i in &order {
        let grant = remaining.min(layers[i].max_bitrate_bps);
        shares[i] = grant;
        remaining -= grant;
    }

    if remaining > 0 {
        if let Some(&top) = order.last() {
            shares[top] = layers[top]
                .max_bitrate_bps
                .min(shares[top].saturating_add(remaining));
        }
    }

    shares
}

/// Rate-control buffer size for a layer.
///
/// `vbv = average_bitrate * frame_interval * 5`, expressed with the
/// framerate as a rational so fractional rates keep exact arithmetic.
pub fn vbv_buffer_size(average_bitrate_bps: u32, framerate_num: u32, framerate_den: u32) -> u32 {
    if framerate_num == 0 {
        return 0;
    }
    (average_bitrate_bps as u64 * framerate_den as u64 / framerate_num as u64 * 5) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(index: usize, width: u32, height: u32, max_bps: u32, enabled: bool) -> LayerConfig {
        LayerConfig {
            width,
            height,
            target_bitrate_bps: 0,
            max_bitrate_bps: max_bps,
            max_framerate_fps: 30,
            enabled,
            sending: enabled,
            key_frame_request: false,
            simulcast_index: index,
        }
    }

    #[test]
    fn test_allocation_fills_lowest_layer_first() {
        let layers = vec![
            layer(0, 1280, 720, 2_000_000, true),
            layer(1, 640, 360, 800_000, true),
        ];

        let shares = allocate_layer_bitrates(1_000_000, &layers);
        assert_eq!(shares[1], 800_000);
        assert_eq!(shares[0], 200_000);
    }

    #[test]
    fn test_allocation_leftover_flows_to_top_layer() {
        let layers = vec![
            layer(0, 1280, 720, 2_000_000, true),
            layer(1, 640, 360, 500_000, true),
        ];

        let shares = allocate_layer_bitrates(4_000_000, &layers);
        assert_eq!(shares[1], 500_000);
        // Top layer takes its fill and is then capped at its ceiling.
        assert_eq!(shares[0], 2_000_000);
    }

    #[test]
    fn test_disabled_layer_gets_nothing() {
        let layers = vec![
            layer(0, 1280, 720, 2_000_000, true),
            layer(1, 640, 360, 500_000, false),
        ];

        let shares = allocate_layer_bitrates(1_000_000, &layers);
        assert_eq!(shares[1], 0);
        assert_eq!(shares[0], 1_000_000);
    }

    #[test]
    fn test_vbv_buffer_size_formula() {
        // 5 Mbps at 30 fps: one frame interval is 166_666 bits, x5.
        assert_eq!(vbv_buffer_size(5_000_000, 30, 1), 833_330);
        assert_eq!(vbv_buffer_size(5_000_000, 0, 1), 0);
    }
}
