//! Stop rules of the path propagator.
//!
//! A fiber stops on the first rule that fires after a step. Rules are
//! checked in a fixed order: CSF, mask, primary RTOP, free water,
//! curvature, reconstruction error, step count. Only the CSF rule marks the
//! fiber as discarded; every other stop keeps it.
use crate::tractography::core::options::TractographyOptions;

/// CSF probability above which a fiber is stopped and discarded.
pub const CSF_THRESHOLD: f64 = 0.5;

/// Why a fiber stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    OutsideMask,
    InCsf,
    LowRtop,
    HighFreeWater,
    Curvature,
    HighError,
    MaxSteps,
}

impl StopReason {
    /// Whether the fiber ending with this reason is dropped from the output.
    pub fn discards(self) -> bool {
        matches!(self, StopReason::InCsf)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::OutsideMask => "left the brain mask",
            StopReason::InCsf => "entered CSF",
            StopReason::LowRtop => "primary RTOP below floor",
            StopReason::HighFreeWater => "free-water weight above ceiling",
            StopReason::Curvature => "curvature radius below minimum",
            StopReason::HighError => "reconstruction error above ceiling",
            StopReason::MaxSteps => "maximum step count exceeded",
        };
        f.write_str(text)
    }
}

/// Quantities the rules look at after one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProbe {
    /// Steps taken so far, starting at 1 after the first step.
    pub step: usize,
    pub mask: f64,
    pub csf: Option<f64>,
    pub rtop1: f64,
    pub free_water_weight: f64,
    pub curve_radius: f64,
    pub nmse: f64,
}

/// Thresholds of the stop rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRules {
    pub min_radius: f64,
    pub max_nmse: f64,
    pub rtop1_min_stop: f64,
    pub fw_thresh: f64,
    pub max_steps: usize,
}

impl StopRules {
    pub fn from_options(opts: &TractographyOptions) -> Self {
        Self {
            min_radius: opts.min_radius,
            max_nmse: opts.max_nmse,
            rtop1_min_stop: opts.rtop1_min_stop,
            fw_thresh: opts.fw_thresh,
            max_steps: opts.max_steps(),
        }
    }

    /// First rule that fires for `probe`, if any.
    ///
    /// Comparisons are written so that a NaN mask stops the fiber.
    pub fn check(&self, probe: &StepProbe) -> Option<StopReason> {
        if probe.csf.is_some_and(|c| c > CSF_THRESHOLD) {
            return Some(StopReason::InCsf);
        }
        if !(probe.mask > 0.0) {
            return Some(StopReason::OutsideMask);
        }
        if probe.rtop1 < self.rtop1_min_stop {
            return Some(StopReason::LowRtop);
        }
        if probe.free_water_weight > self.fw_thresh {
            return Some(StopReason::HighFreeWater);
        }
        if probe.curve_radius < self.min_radius {
            return Some(StopReason::Curvature);
        }
        if probe.nmse > self.max_nmse {
            return Some(StopReason::HighError);
        }
        if probe.step > self.max_steps {
            return Some(StopReason::MaxSteps);
        }
        None
    }
}
