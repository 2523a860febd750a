//! Marker rendering.

use crate::Dictionary;
use marker_distances_core::GrayImage;

/// Render marker `id` with a one-cell black border, `cell_px` pixels per cell.
///
/// Returns `None` for ids outside the dictionary or a zero cell size.
pub fn draw_marker(dict: &Dictionary, id: u32, cell_px: usize) -> Option<GrayImage> {
    let code = *dict.codes.get(id as usize)?;
    if cell_px == 0 {
        return None;
    }

    let bits = dict.marker_size;
    let border = 1;
    let cells = bits + 2 * border;
    let side = cells * cell_px;
    let mut data = vec![255u8; side * side];

    for cy in 0..cells {
        for cx in 0..cells {
            let is_border = cx < border || cy < border || cx + border >= cells || cy + border >= cells;
            let is_black = is_border || {
                let idx = (cy - border) * bits + (cx - border);
                (code >> idx) & 1 == 1
            };
            if !is_black {
                continue;
            }
            for yy in 0..cell_px {
                let row = (cy * cell_px + yy) * side;
                data[row + cx * cell_px..row + (cx + 1) * cell_px].fill(0);
            }
        }
    }

    Some(GrayImage {
        width: side,
        height: side,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_is_black_and_bits_follow_code() {
        let dict = Dictionary::new("DICT_TEST", 4, 0, vec![0b1]).expect("dictionary");
        let img = draw_marker(&dict, 0, 5).expect("render");
        assert_eq!(img.width, 30);
        let view = img.view();
        assert_eq!(view.get(0, 0), 0);
        assert_eq!(view.get(29, 29), 0);
        // bit 0 -> first inner cell black, bit 1 -> white
        assert_eq!(view.get(7, 7), 0);
        assert_eq!(view.get(12, 7), 255);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let dict = Dictionary::new("DICT_TEST", 4, 0, vec![0b1]).expect("dictionary");
        assert!(draw_marker(&dict, 1, 5).is_none());
        assert!(draw_marker(&dict, 0, 0).is_none());
    }
}
