//! Marker geometry report and cache update.

use crate::cache::LastAnalysisCache;
use crate::detector::{DetectError, MarkerDetector};
use crate::geometry::{pairwise_distances, PairwiseDistance};
use marker_distances_core::{GrayImage, GrayImageView, Marker};
use serde::Serialize;
use std::{path::Path, sync::Arc};

#[cfg(feature = "tracing")]
use tracing::instrument;

const ID_SEPARATOR: &str = " | ";

#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Detect(#[from] DetectError),
}

/// Decode an image file into a grayscale buffer.
pub fn load_gray(path: impl AsRef<Path>) -> Result<GrayImage, image::ImageError> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_luma8();
    Ok(GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
    })
}

/// How many markers an analysis found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCount {
    Zero,
    Single,
    Multiple,
}

/// Outcome of one [`GeometryReporter::analyze`] call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    source_label: String,
    outcome: MarkerCount,
    marker_ids: Vec<u32>,
    messages: Vec<String>,
    distances: Vec<PairwiseDistance>,
}

impl AnalysisResult {
    fn from_markers(source_label: &str, markers: &[Marker]) -> Self {
        let marker_ids: Vec<u32> = markers.iter().map(|m| m.id).collect();
        let (outcome, messages, distances) = match markers {
            [] => (MarkerCount::Zero, vec![no_marker_message(source_label)], Vec::new()),
            [only] => (
                MarkerCount::Single,
                vec![single_marker_message(source_label, only.id)],
                Vec::new(),
            ),
            _ => {
                let distances = pairwise_distances(markers);
                let mut messages = Vec::with_capacity(distances.len() + 1);
                messages.push(header_message(source_label, &marker_ids));
                messages.extend(distances.iter().map(distance_message));
                (MarkerCount::Multiple, messages, distances)
            }
        };

        Self {
            source_label: source_label.to_string(),
            outcome,
            marker_ids,
            messages,
            distances,
        }
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn outcome(&self) -> MarkerCount {
        self.outcome
    }

    /// Identifiers in detection order.
    pub fn marker_ids(&self) -> &[u32] {
        &self.marker_ids
    }

    /// Every report line; in the multiple-marker case the identifier header
    /// comes first, followed by one line per pair.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The lines exposed to status pollers. The identifier header is not
    /// part of it.
    pub fn status_messages(&self) -> &[String] {
        match self.outcome {
            MarkerCount::Multiple => &self.messages[1..],
            MarkerCount::Zero | MarkerCount::Single => &self.messages,
        }
    }

    /// One entry per unordered pair, in detection-order enumeration.
    pub fn distances(&self) -> &[PairwiseDistance] {
        &self.distances
    }

    /// The whole report on a single line.
    pub fn full_message(&self) -> String {
        self.messages.join(" ")
    }
}

fn no_marker_message(source_label: &str) -> String {
    format!("No fiducial marker detected in image {source_label}.")
}

fn single_marker_message(source_label: &str, id: u32) -> String {
    format!("One fiducial marker detected in image {source_label}, with identifier {id}.")
}

fn header_message(source_label: &str, ids: &[u32]) -> String {
    let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
    format!(
        "Fiducial markers detected in image {source_label} with identifiers {};",
        ids.join(ID_SEPARATOR)
    )
}

fn distance_message(d: &PairwiseDistance) -> String {
    format!(
        "Distance between marker {} and {} is {:.2} pixels.",
        d.first, d.second, d.pixels
    )
}

/// Observer notified after each completed analysis.
pub trait AnalysisListener: Send + Sync {
    fn on_analysis(&self, result: &AnalysisResult);
}

/// Logs every report at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogListener;

impl AnalysisListener for LogListener {
    fn on_analysis(&self, result: &AnalysisResult) {
        log::info!("{}", result.full_message());
    }
}

/// Runs detection, builds the report and overwrites the shared cache.
pub struct GeometryReporter<D> {
    detector: D,
    cache: Arc<LastAnalysisCache>,
    listeners: Vec<Arc<dyn AnalysisListener>>,
}

impl<D: MarkerDetector> GeometryReporter<D> {
    pub fn new(detector: D, cache: Arc<LastAnalysisCache>) -> Self {
        Self {
            detector,
            cache,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn AnalysisListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn cache(&self) -> &Arc<LastAnalysisCache> {
        &self.cache
    }

    /// Analyze one decoded image.
    ///
    /// On success the cache holds exactly this result's status messages. On
    /// a detection error the cache keeps its previous contents.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn analyze(
        &self,
        image: &GrayImageView<'_>,
        source_label: &str,
    ) -> Result<AnalysisResult, AnalyzeError> {
        let markers = self.detector.detect(image)?;
        log::debug!("{} markers in {source_label}", markers.len());

        let result = AnalysisResult::from_markers(source_label, &markers);
        self.cache.store(result.status_messages().to_vec());

        for listener in &self.listeners {
            listener.on_analysis(&result);
        }
        Ok(result)
    }

    /// Decode `path` and analyze it, labelled with the path as given.
    ///
    /// A file that does not decode fails with [`AnalyzeError::Decode`] and
    /// leaves the cache untouched.
    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<AnalysisResult, AnalyzeError> {
        let path = path.as_ref();
        let img = load_gray(path)?;
        self.analyze(&img.view(), &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marker_distances_core::GrayImage;
    use nalgebra::Point2;
    use std::sync::Mutex;

    struct Fixed(Vec<Marker>);

    impl MarkerDetector for Fixed {
        fn detect(&self, _image: &GrayImageView<'_>) -> Result<Vec<Marker>, DetectError> {
            Ok(self.0.clone())
        }
    }

    fn centered(id: u32, cx: f32, cy: f32) -> Marker {
        Marker::new(
            id,
            [
                Point2::new(cx - 2.0, cy - 2.0),
                Point2::new(cx + 2.0, cy - 2.0),
                Point2::new(cx + 2.0, cy + 2.0),
                Point2::new(cx - 2.0, cy + 2.0),
            ],
        )
    }

    fn run(markers: Vec<Marker>, label: &str) -> (AnalysisResult, Arc<LastAnalysisCache>) {
        let cache = Arc::new(LastAnalysisCache::default());
        let reporter = GeometryReporter::new(Fixed(markers), Arc::clone(&cache));
        let img = GrayImage::filled(8, 8, 255);
        let result = reporter.analyze(&img.view(), label).expect("analyze");
        (result, cache)
    }

    #[test]
    fn zero_markers() {
        let (result, cache) = run(Vec::new(), "foo.jpg");
        assert_eq!(result.outcome(), MarkerCount::Zero);
        assert_eq!(
            result.messages(),
            ["No fiducial marker detected in image foo.jpg.".to_string()]
        );
        assert!(result.distances().is_empty());
        assert_eq!(cache.snapshot(), result.messages());
    }

    #[test]
    fn single_marker() {
        let (result, cache) = run(vec![centered(42, 10.0, 10.0)], "uploads/a.png");
        assert_eq!(result.outcome(), MarkerCount::Single);
        assert_eq!(
            result.messages(),
            ["One fiducial marker detected in image uploads/a.png, with identifier 42.".to_string()]
        );
        assert_eq!(cache.snapshot(), result.messages());
    }

    #[test]
    fn two_markers_three_four_five() {
        let (result, cache) = run(
            vec![centered(3, 0.0, 0.0), centered(8, 3.0, 4.0)],
            "img.png",
        );
        assert_eq!(result.outcome(), MarkerCount::Multiple);
        assert_eq!(
            result.messages(),
            [
                "Fiducial markers detected in image img.png with identifiers 3 | 8;".to_string(),
                "Distance between marker 3 and 8 is 5.00 pixels.".to_string(),
            ]
        );
        assert_eq!(
            cache.snapshot(),
            vec!["Distance between marker 3 and 8 is 5.00 pixels.".to_string()]
        );
    }

    #[test]
    fn pairs_use_detection_order_not_id_order() {
        let (result, _) = run(
            vec![
                centered(1, 0.0, 0.0),
                centered(2, 10.0, 0.0),
                centered(3, 0.0, 10.0),
            ],
            "three.png",
        );
        assert_eq!(
            result.status_messages(),
            [
                "Distance between marker 1 and 2 is 10.00 pixels.".to_string(),
                "Distance between marker 1 and 3 is 10.00 pixels.".to_string(),
                "Distance between marker 2 and 3 is 14.14 pixels.".to_string(),
            ]
        );

        let (result, _) = run(
            vec![
                centered(3, 0.0, 10.0),
                centered(1, 0.0, 0.0),
                centered(2, 10.0, 0.0),
            ],
            "three.png",
        );
        let pairs: Vec<(u32, u32)> = result
            .distances()
            .iter()
            .map(|d| (d.first, d.second))
            .collect();
        assert_eq!(pairs, vec![(3, 1), (3, 2), (1, 2)]);
        assert_eq!(
            result.messages()[0],
            "Fiducial markers detected in image three.png with identifiers 3 | 1 | 2;"
        );
    }

    #[test]
    fn n_markers_give_n_choose_two_rounded_lines() {
        let markers: Vec<Marker> = (0..6)
            .map(|i| centered(i, i as f32 * 7.3, (i * i) as f32 * 1.1))
            .collect();
        let (result, cache) = run(markers, "six.png");
        let cached = cache.snapshot();
        assert_eq!(cached.len(), 15);
        for line in &cached {
            let value = line
                .strip_prefix("Distance between marker ")
                .and_then(|rest| rest.rsplit_once(" is "))
                .and_then(|(_, v)| v.strip_suffix(" pixels."))
                .expect("distance line");
            let (_, decimals) = value.split_once('.').expect("decimal point");
            assert_eq!(decimals.len(), 2, "{line}");
            assert!(value.parse::<f64>().expect("number") >= 0.0);
        }
        assert_eq!(result.messages().len(), 16);
    }

    #[test]
    fn repeated_ids_pass_through() {
        let (result, _) = run(
            vec![centered(5, 0.0, 0.0), centered(5, 6.0, 8.0)],
            "dup.png",
        );
        assert_eq!(
            result.status_messages(),
            ["Distance between marker 5 and 5 is 10.00 pixels.".to_string()]
        );
    }

    #[test]
    fn analysis_is_idempotent() {
        let cache = Arc::new(LastAnalysisCache::default());
        let reporter = GeometryReporter::new(
            Fixed(vec![centered(1, 0.0, 0.0), centered(2, 1.0, 1.0)]),
            Arc::clone(&cache),
        );
        let img = GrayImage::filled(8, 8, 255);
        let a = reporter.analyze(&img.view(), "x.png").expect("analyze");
        let b = reporter.analyze(&img.view(), "x.png").expect("analyze");
        assert_eq!(a, b);
    }

    #[test]
    fn later_analysis_replaces_cache() {
        let cache = Arc::new(LastAnalysisCache::default());
        let img = GrayImage::filled(8, 8, 255);

        let many = GeometryReporter::new(
            Fixed(vec![
                centered(1, 0.0, 0.0),
                centered(2, 1.0, 1.0),
                centered(3, 2.0, 2.0),
            ]),
            Arc::clone(&cache),
        );
        many.analyze(&img.view(), "x.png").expect("analyze");
        assert_eq!(cache.snapshot().len(), 3);

        let none = GeometryReporter::new(Fixed(Vec::new()), Arc::clone(&cache));
        let y = none.analyze(&img.view(), "y.png").expect("analyze");
        assert_eq!(cache.snapshot(), y.status_messages());
    }

    struct Failing;

    impl MarkerDetector for Failing {
        fn detect(&self, _image: &GrayImageView<'_>) -> Result<Vec<Marker>, DetectError> {
            Err(DetectError::Backend("sensor glitch".into()))
        }
    }

    #[test]
    fn failed_analysis_keeps_previous_cache() {
        let cache = Arc::new(LastAnalysisCache::default());
        let img = GrayImage::filled(8, 8, 255);
        GeometryReporter::new(Fixed(vec![centered(9, 0.0, 0.0)]), Arc::clone(&cache))
            .analyze(&img.view(), "ok.png")
            .expect("analyze");
        let before = cache.snapshot();

        let err = GeometryReporter::new(Failing, Arc::clone(&cache))
            .analyze(&img.view(), "bad.png")
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::Detect(DetectError::Backend(_))));
        assert_eq!(cache.snapshot(), before);
    }

    fn write_png(path: &Path, value: u8) {
        image::GrayImage::from_pixel(8, 8, image::Luma([value]))
            .save(path)
            .expect("write png");
    }

    #[test]
    fn load_gray_converts_to_luma() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("x.png");
        write_png(&path, 200);
        let img = load_gray(&path).expect("decode");
        assert_eq!((img.width, img.height), (8, 8));
        assert!(img.data.iter().all(|&v| v == 200));
    }

    #[test]
    fn analyze_path_labels_with_path() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("one.png");
        write_png(&path, 255);
        let cache = Arc::new(LastAnalysisCache::default());
        let reporter = GeometryReporter::new(Fixed(vec![centered(7, 1.0, 1.0)]), cache);

        let result = reporter.analyze_path(&path).expect("analyze");
        assert_eq!(result.source_label(), path.display().to_string());
        assert_eq!(result.marker_ids(), [7]);
    }

    #[test]
    fn undecodable_file_is_a_decode_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = Arc::new(LastAnalysisCache::default());
        let reporter =
            GeometryReporter::new(Fixed(vec![centered(7, 1.0, 1.0)]), Arc::clone(&cache));

        let good = tmp.path().join("good.png");
        write_png(&good, 255);
        reporter.analyze_path(&good).expect("analyze");
        let before = cache.snapshot();

        let bad = tmp.path().join("bad.png");
        std::fs::write(&bad, b"definitely not a png").expect("write");
        let err = reporter.analyze_path(&bad).unwrap_err();
        assert!(matches!(err, AnalyzeError::Decode(_)));
        assert!(err.to_string().starts_with("failed to decode image"));
        assert_eq!(cache.snapshot(), before);
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl AnalysisListener for Recorder {
        fn on_analysis(&self, result: &AnalysisResult) {
            self.0
                .lock()
                .expect("lock")
                .push(result.full_message());
        }
    }

    #[test]
    fn listeners_receive_full_report() {
        let recorder = Arc::new(Recorder::default());
        let reporter = GeometryReporter::new(
            Fixed(vec![centered(4, 0.0, 0.0), centered(6, 0.0, 2.5)]),
            Arc::new(LastAnalysisCache::default()),
        )
        .with_listener(recorder.clone())
        .with_listener(Arc::new(LogListener));

        let img = GrayImage::filled(8, 8, 255);
        reporter.analyze(&img.view(), "l.png").expect("analyze");
        let seen = recorder.0.lock().expect("lock").clone();
        assert_eq!(
            seen,
            vec![
                "Fiducial markers detected in image l.png with identifiers 4 | 6; \
                 Distance between marker 4 and 6 is 2.50 pixels."
                    .to_string()
            ]
        );
    }
}
