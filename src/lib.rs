// THEORY:
// This file is the main entry point for the `sunspot_merge` library crate.
// It exposes the merge engine through two front ends: `SunspotPipeline`, which
// processes a single frame's contours synchronously, and `ParallelPipeline`,
// which spreads independent frames over a tokio worker pool.
//
// The building blocks (`core_modules`) stay public so callers can run the
// proximity test, the identity ledger or the contour splice on their own, but
// the pipelines are the intended interface.

pub mod core_modules;
pub mod pipeline;
pub mod parallel_pipeline;
