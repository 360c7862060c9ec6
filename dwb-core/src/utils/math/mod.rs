//! Math utilities for the Differential-Wheel Bot.
//!
//! This module provides the angle and distance helpers used by the heading
//! and approach controllers.

pub mod geometry;
