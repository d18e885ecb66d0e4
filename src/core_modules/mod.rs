pub mod contour;
pub mod contour_merger;
pub mod error;
pub mod geometry;
pub mod identity_tracker;
pub mod proximity_detector;
pub mod spline;
pub mod sunspot;

#[cfg(test)]
pub mod test_utils;
