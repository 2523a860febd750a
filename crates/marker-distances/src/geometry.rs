use marker_distances_core::Marker;
use serde::Serialize;

/// Pixel distance between the centers of two markers of one detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PairwiseDistance {
    /// Identifier of the marker that comes first in detection order.
    pub first: u32,
    pub second: u32,
    pub pixels: f64,
}

/// Distances for every unordered pair, enumerated `(i, j)` with `i < j` over
/// detection order: `(0,1), (0,2), .., (1,2), ..`.
pub fn pairwise_distances(markers: &[Marker]) -> Vec<PairwiseDistance> {
    let centers: Vec<_> = markers.iter().map(Marker::center).collect();
    let n = markers.len();
    let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(PairwiseDistance {
                first: markers[i].id,
                second: markers[j].id,
                pixels: nalgebra::distance(&centers[i], &centers[j]),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn square_at(id: u32, cx: f32, cy: f32) -> Marker {
        Marker::new(
            id,
            [
                Point2::new(cx - 5.0, cy - 5.0),
                Point2::new(cx + 5.0, cy - 5.0),
                Point2::new(cx + 5.0, cy + 5.0),
                Point2::new(cx - 5.0, cy + 5.0),
            ],
        )
    }

    #[test]
    fn three_four_five() {
        let d = pairwise_distances(&[square_at(7, 0.0, 0.0), square_at(9, 3.0, 4.0)]);
        assert_eq!(d.len(), 1);
        assert_eq!((d[0].first, d[0].second), (7, 9));
        assert_relative_eq!(d[0].pixels, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn pairs_follow_detection_order() {
        let markers = [
            square_at(30, 0.0, 0.0),
            square_at(10, 10.0, 0.0),
            square_at(20, 0.0, 20.0),
            square_at(5, 30.0, 40.0),
        ];
        let pairs: Vec<(u32, u32)> = pairwise_distances(&markers)
            .iter()
            .map(|d| (d.first, d.second))
            .collect();
        assert_eq!(
            pairs,
            vec![(30, 10), (30, 20), (30, 5), (10, 20), (10, 5), (20, 5)]
        );
    }

    #[test]
    fn fewer_than_two_markers_have_no_pairs() {
        assert!(pairwise_distances(&[]).is_empty());
        assert!(pairwise_distances(&[square_at(1, 0.0, 0.0)]).is_empty());
    }

    #[test]
    fn coincident_centers_are_zero_apart() {
        let d = pairwise_distances(&[square_at(1, 4.0, 4.0), square_at(1, 4.0, 4.0)]);
        assert_relative_eq!(d[0].pixels, 0.0);
    }
}
