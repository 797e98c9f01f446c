//! EMA50/EMA200 cross detection.
//!
//! A transition at `index` (fast crossing the slow EMA between `index - 1` and
//! `index`) wins over the steady-state reading at the same bar.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossKind {
    Golden,
    Death,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossSignal {
    pub kind: CrossKind,
    /// 1-10 when a cross state is reported, 0 for `CrossKind::None`.
    pub strength: u8,
    pub confirmed: bool,
    /// True only on the bar where the transition happened.
    pub transition: bool,
}

impl CrossSignal {
    pub const NONE: CrossSignal = CrossSignal {
        kind: CrossKind::None,
        strength: 0,
        confirmed: false,
        transition: false,
    };
}

const TRANSITION_SCALE: f64 = 5.0;
const STEADY_SCALE: f64 = 2.0;

pub fn detect_cross(fast: &[Option<f64>], slow: &[Option<f64>], index: usize) -> CrossSignal {
    if index < 1 || index >= fast.len() || index >= slow.len() {
        return CrossSignal::NONE;
    }

    let (prev_fast, curr_fast, prev_slow, curr_slow) =
        match (fast[index - 1], fast[index], slow[index - 1], slow[index]) {
            (Some(pf), Some(cf), Some(ps), Some(cs)) => (pf, cf, ps, cs),
            _ => return CrossSignal::NONE,
        };

    let golden = prev_fast <= prev_slow && curr_fast > curr_slow;
    let death = prev_fast >= prev_slow && curr_fast < curr_slow;

    if golden {
        return cross(CrossKind::Golden, curr_fast, curr_slow, TRANSITION_SCALE, true);
    }
    if death {
        return cross(CrossKind::Death, curr_fast, curr_slow, TRANSITION_SCALE, true);
    }
    if curr_fast > curr_slow {
        return cross(CrossKind::Golden, curr_fast, curr_slow, STEADY_SCALE, false);
    }
    if curr_fast < curr_slow {
        return cross(CrossKind::Death, curr_fast, curr_slow, STEADY_SCALE, false);
    }

    CrossSignal::NONE
}

fn cross(kind: CrossKind, fast: f64, slow: f64, scale: f64, transition: bool) -> CrossSignal {
    CrossSignal {
        kind,
        strength: cross_strength(fast, slow, scale),
        confirmed: true,
        transition,
    }
}

/// clamp(round(|fast - slow| / (slow * 1%) * scale), 1, 10)
pub fn cross_strength(fast: f64, slow: f64, scale: f64) -> u8 {
    let one_percent = slow * 0.01;
    if one_percent == 0.0 {
        return 1;
    }
    let raw = ((fast - slow).abs() / one_percent * scale).round();
    raw.clamp(1.0, 10.0) as u8
}
