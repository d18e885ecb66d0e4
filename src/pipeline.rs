// THEORY:
// The `pipeline` module is the top-level API of the merge engine. It takes the
// raw contours one frame's segmentation produced and returns the canonical
// sunspots of that frame, with every merge and every rejected pair accounted for.
//
// Key architectural principles:
// 1.  **Frame-Owned State**: Each call to `process_frame` builds its own
//     `SunspotRegistry` and `IdentityTracker` and drops them when it returns.
//     Nothing carries over between frames, so frames are independent and can be
//     handed to separate workers (see `parallel_pipeline`).
// 2.  **Contained Failures**: A contour that cannot form a polygon, or a pair
//     whose splice fails, becomes a `Diagnostic` in the report. No single bad
//     input aborts the frame, and a frame with no usable contours simply yields
//     an empty report.
// 3.  **Deterministic Order**: Close pairs are merged in ascending pair-key order,
//     so the same input always produces the same ids.
//
// Pipeline stages:
// 1.  Validate contours and assign dense ids (optionally dropping tiny ones).
// 2.  Detect close pairs among the canonical sunspots.
// 3.  Merge them one by one, updating registry and ledger as we go.
// 4.  Optionally repeat 2-3 while merges keep happening.
// 5.  Collect the canonical sunspots into a `FrameReport`.

use crate::core_modules::contour::Contour;
use crate::core_modules::contour_merger::{ContourMerger, MergeOutcome};
use crate::core_modules::error::{ConfigError, MergeError};
use crate::core_modules::identity_tracker::IdentityTracker;
use crate::core_modules::proximity_detector::proximity_detector;
use crate::core_modules::sunspot::SunspotRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Re-export key data structures for the public API.
pub use crate::core_modules::contour_merger::MergeRecord;
pub use crate::core_modules::geometry::Point;
pub use crate::core_modules::sunspot::{Sunspot, SunspotId};

/// Tunable thresholds of the merge engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest rotated-frame edge gap (exclusive) for a pair to count as close.
    pub max_edge_gap: f64,
    /// Largest center distance (exclusive) for a pair to be considered at all.
    pub max_center_distance: f64,
    /// Largest distance (exclusive) between two boundary points for them to touch.
    pub max_union_distance: f64,
    /// Touching point pairs needed before a merge is attempted.
    pub min_union_points: usize,
    /// Contour points gathered on each side of a junction for the bridge fit.
    pub bridge_window: usize,
    /// Take every `bridge_stride`-th point inside the window.
    pub bridge_stride: usize,
    /// Curve parameter step used when resampling a bridge.
    pub resample_step: f64,
    /// Contours enclosing less area than this are dropped before ids are assigned.
    pub min_contour_area: f64,
    /// Detection/merge passes per frame. Passes stop early once nothing merges.
    pub max_passes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_edge_gap: 15.0,
            max_center_distance: 500.0,
            max_union_distance: 25.0,
            min_union_points: 3,
            bridge_window: 15,
            bridge_stride: 3,
            resample_step: 0.1,
            min_contour_area: 0.0,
            max_passes: 1,
        }
    }
}

impl PipelineConfig {
    /// Parses a JSON config. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_edge_gap", self.max_edge_gap),
            ("max_center_distance", self.max_center_distance),
            ("max_union_distance", self.max_union_distance),
            ("resample_step", self.resample_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }

        let counts = [
            ("min_union_points", self.min_union_points),
            ("bridge_window", self.bridge_window),
            ("bridge_stride", self.bridge_stride),
            ("max_passes", self.max_passes),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }

        if !(self.min_contour_area.is_finite() && self.min_contour_area >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_contour_area must be non-negative, got {}",
                self.min_contour_area
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An input contour was excluded from the frame.
    DegenerateContour,
    /// A close pair did not share enough boundary to merge.
    InsufficientOverlap,
    /// A close pair carried junction indices that do not fit its contours.
    InvalidPieceRange,
    /// A pair was superseded by earlier merges and is no longer close.
    NoLongerClose,
    /// Any other per-pair failure.
    MergeFailed,
}

/// Structured record of something that did not go through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Sunspot ids involved, if any were assigned.
    pub ids: Vec<SunspotId>,
    /// Position in the input contour list, for contours rejected before id assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_index: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    fn for_pair(kind: DiagnosticKind, left: SunspotId, right: SunspotId, message: String) -> Self {
        Self {
            kind,
            ids: vec![left, right],
            input_index: None,
            message,
        }
    }
}

impl From<&MergeError> for DiagnosticKind {
    fn from(error: &MergeError) -> Self {
        match error {
            MergeError::DegenerateContour { .. } => DiagnosticKind::DegenerateContour,
            MergeError::InvalidPieceRange { .. } => DiagnosticKind::InvalidPieceRange,
            _ => DiagnosticKind::MergeFailed,
        }
    }
}

/// Everything one frame produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// The canonical sunspots, ascending by id.
    pub sunspots: Vec<Sunspot>,
    /// Canonical id of every id issued during the frame, indexed by id.
    pub identity: Vec<SunspotId>,
    /// Successful merges, in the order they happened.
    pub merges: Vec<MergeRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Detection passes actually run.
    pub passes: usize,
}

/// Single-frame merge engine.
#[derive(Debug, Clone, Default)]
pub struct SunspotPipeline {
    config: PipelineConfig,
}

impl SunspotPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn process_frame(&self, contours: Vec<Vec<Point>>) -> FrameReport {
        let contour_count = contours.len();
        let mut diagnostics = Vec::new();

        // Stage 1: Validation & Id Assignment
        let mut registry = self.build_registry(contours, &mut diagnostics);
        let mut tracker = IdentityTracker::with_roots(registry.len());

        // Stages 2-4: Detection & Merging
        let merger = ContourMerger::new(&self.config);
        let mut merges = Vec::new();
        let mut settled: HashSet<(SunspotId, SunspotId)> = HashSet::new();
        let mut passes = 0;

        while passes < self.config.max_passes {
            passes += 1;

            let pairs = {
                let canonical: Vec<&Sunspot> = tracker.roots().filter_map(|id| registry.get(id).ok()).collect();
                proximity_detector::find_close_pairs(&canonical, &self.config)
            };

            let merged_before = merges.len();
            for pair in &pairs {
                if settled.contains(&pair.key()) {
                    continue;
                }
                match merger.merge(&mut registry, &mut tracker, pair) {
                    Ok(MergeOutcome::Merged(record)) => merges.push(record),
                    Ok(MergeOutcome::InsufficientOverlap { left_id, right_id, found }) => {
                        settled.insert(pair.key());
                        diagnostics.push(Diagnostic::for_pair(
                            DiagnosticKind::InsufficientOverlap,
                            left_id,
                            right_id,
                            format!(
                                "only {found} boundary point pairs within {} px",
                                self.config.max_union_distance
                            ),
                        ));
                    }
                    Ok(MergeOutcome::AlreadyMerged { root }) => {
                        log::debug!("pair {:?} already resolved to sunspot {}", pair.key(), root);
                    }
                    Ok(MergeOutcome::NoLongerClose { left_id, right_id }) => {
                        diagnostics.push(Diagnostic::for_pair(
                            DiagnosticKind::NoLongerClose,
                            left_id,
                            right_id,
                            format!("pair {:?} is no longer close after earlier merges", pair.key()),
                        ));
                    }
                    Err(err) => {
                        log::warn!("skipping pair {:?}: {}", pair.key(), err);
                        settled.insert(pair.key());
                        diagnostics.push(Diagnostic::for_pair(
                            DiagnosticKind::from(&err),
                            pair.left_id,
                            pair.right_id,
                            err.to_string(),
                        ));
                    }
                }
            }

            if merges.len() == merged_before {
                break;
            }
        }

        // Stage 5: Report
        let sunspots: Vec<Sunspot> = tracker
            .roots()
            .filter_map(|id| registry.get(id).ok().cloned())
            .collect();
        let identity: Vec<SunspotId> = (0..tracker.len()).filter_map(|id| tracker.root(id).ok()).collect();

        log::info!(
            "frame done: {} contours in, {} sunspots out, {} merges, {} diagnostics, {} passes",
            contour_count,
            sunspots.len(),
            merges.len(),
            diagnostics.len(),
            passes
        );

        FrameReport {
            sunspots,
            identity,
            merges,
            diagnostics,
            passes,
        }
    }

    fn build_registry(&self, contours: Vec<Vec<Point>>, diagnostics: &mut Vec<Diagnostic>) -> SunspotRegistry {
        let mut registry = SunspotRegistry::new();

        for (index, points) in contours.into_iter().enumerate() {
            match Contour::new(points) {
                Ok(contour) if contour.area() < self.config.min_contour_area => {
                    log::debug!(
                        "dropping contour {} with area {:.1} below {:.1}",
                        index,
                        contour.area(),
                        self.config.min_contour_area
                    );
                }
                Ok(contour) => {
                    registry.push(contour);
                }
                Err(err) => {
                    log::warn!("excluding contour {}: {}", index, err);
                    diagnostics.push(Diagnostic {
                        kind: DiagnosticKind::from(&err),
                        ids: Vec::new(),
                        input_index: Some(index),
                        message: err.to_string(),
                    });
                }
            }
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::test_utils::{circle_contour, contains, polygon};

    fn raw(contour: Contour) -> Vec<Point> {
        contour.into()
    }

    fn circles(centers: &[(i32, i32)]) -> Vec<Vec<Point>> {
        centers.iter().map(|&(x, y)| raw(circle_contour(x, y, 20))).collect()
    }

    #[test]
    fn default_config_matches_documented_thresholds() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_edge_gap, 15.0);
        assert_eq!(config.max_center_distance, 500.0);
        assert_eq!(config.max_union_distance, 25.0);
        assert_eq!((config.min_union_points, config.bridge_window, config.bridge_stride), (3, 15, 3));
        assert_eq!(config.resample_step, 0.1);
        assert_eq!(config.max_passes, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_config_fills_in_defaults_and_is_validated() {
        let config = PipelineConfig::from_json_str(r#"{ "max_edge_gap": 20.0, "max_passes": 3 }"#).unwrap();
        assert_eq!(config.max_edge_gap, 20.0);
        assert_eq!(config.max_passes, 3);
        assert_eq!(config.bridge_window, 15);

        assert!(matches!(
            PipelineConfig::from_json_str(r#"{ "bridge_stride": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{ "resample_step": -0.5 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(PipelineConfig::from_json_str("{ nope"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn touching_circles_become_one_sunspot() {
        let pipeline = SunspotPipeline::default();
        let report = pipeline.process_frame(circles(&[(100, 100), (150, 100)]));

        assert_eq!(report.sunspots.len(), 1);
        assert_eq!(report.identity, vec![2, 2, 2]);
        assert_eq!(report.merges.len(), 1);
        assert!(report.diagnostics.is_empty());

        let merged = &report.sunspots[0];
        assert_eq!(merged.id, 2);
        assert!(contains(&merged.contour, Point::new(100, 100)));
        assert!(contains(&merged.contour, Point::new(150, 100)));
    }

    #[test]
    fn far_apart_circles_stay_separate() {
        let pipeline = SunspotPipeline::new(PipelineConfig {
            max_edge_gap: 1000.0,
            ..PipelineConfig::default()
        });
        let report = pipeline.process_frame(circles(&[(100, 100), (1100, 100)]));

        assert_eq!(report.sunspots.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(report.identity, vec![0, 1]);
        assert!(report.merges.is_empty());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn close_pair_without_shared_boundary_is_left_alone() {
        let left = polygon(&[(0, 0), (60, 0), (60, 50), (110, 50), (110, 60), (0, 60)]);
        let right = polygon(&[(210, 60), (150, 60), (150, 10), (100, 10), (100, 0), (210, 0)]);
        let input = vec![raw(left.clone()), raw(right.clone())];

        let report = SunspotPipeline::default().process_frame(input);

        assert_eq!(report.identity, vec![0, 1]);
        assert_eq!(report.sunspots[0].contour, left);
        assert_eq!(report.sunspots[1].contour, right);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::InsufficientOverlap);
        assert_eq!(report.diagnostics[0].ids, vec![0, 1]);
    }

    #[test]
    fn degenerate_contours_are_excluded_without_breaking_the_frame() {
        let flat = vec![Point::new(0, 0), Point::new(5, 0), Point::new(10, 0)];
        let mut input = vec![flat, vec![Point::new(3, 3)]];
        input.extend(circles(&[(100, 100), (150, 100)]));

        let report = SunspotPipeline::default().process_frame(input);

        let rejected: Vec<_> = report.diagnostics.iter().map(|d| (d.kind, d.input_index)).collect();
        assert_eq!(
            rejected,
            vec![
                (DiagnosticKind::DegenerateContour, Some(0)),
                (DiagnosticKind::DegenerateContour, Some(1)),
            ]
        );
        assert_eq!(report.identity, vec![2, 2, 2]);
    }

    #[test]
    fn frame_without_usable_contours_is_empty() {
        let report = SunspotPipeline::default().process_frame(vec![vec![Point::new(1, 1)]]);
        assert!(report.sunspots.is_empty());
        assert!(report.identity.is_empty());
        assert_eq!(report.diagnostics.len(), 1);

        let empty = SunspotPipeline::default().process_frame(Vec::new());
        assert!(empty.sunspots.is_empty() && empty.diagnostics.is_empty());
    }

    #[test]
    fn small_contours_can_be_filtered_out() {
        let pipeline = SunspotPipeline::new(PipelineConfig {
            min_contour_area: 500.0,
            ..PipelineConfig::default()
        });
        let mut input = circles(&[(100, 100)]);
        input.push(raw(polygon(&[(300, 300), (310, 300), (310, 310), (300, 310)])));

        let report = pipeline.process_frame(input);
        assert_eq!(report.sunspots.len(), 1);
        assert_eq!(report.sunspots[0].center, Point::new(100, 100));
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn chain_of_circles_collapses_through_stale_pairs() {
        let report = SunspotPipeline::default().process_frame(circles(&[(100, 100), (150, 100), (200, 100)]));

        assert_eq!(report.passes, 1);
        assert_eq!(report.sunspots.len(), 1);
        assert_eq!(report.sunspots[0].id, 4);
        assert_eq!(report.identity, vec![4, 4, 4, 4, 4]);
    }

    #[test]
    fn extra_passes_catch_spots_made_adjacent_by_a_merge() {
        // B and C are 17 px apart edge to edge: too far on their own, but close to
        // the merged A+B region along the new center line.
        let input = circles(&[(100, 100), (150, 100), (150, 157)]);

        let single = SunspotPipeline::default().process_frame(input.clone());
        assert_eq!(single.sunspots.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 3]);

        let repeated = SunspotPipeline::new(PipelineConfig {
            max_passes: 3,
            ..PipelineConfig::default()
        })
        .process_frame(input);
        assert_eq!(repeated.sunspots.iter().map(|s| s.id).collect::<Vec<_>>(), vec![4]);
        assert_eq!(repeated.merges.len(), 2);
        assert_eq!(repeated.passes, 3);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = SunspotPipeline::default().process_frame(circles(&[(100, 100)]));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["identity"], serde_json::json!([0]));
        assert_eq!(json["sunspots"][0]["center"], serde_json::json!({ "x": 100, "y": 100 }));
    }
}
