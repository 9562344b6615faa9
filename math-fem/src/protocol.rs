//! Stimulation patterns and measurement selection
//!
//! A stimulation pattern lists the (source, sink) electrode pairs driven in
//! turn. For every driven pair, differential voltages are read between
//! electrodes `m` and `m + step`, skipping any pair that touches a driving
//! electrode.

use crate::error::{FemError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the measurement sweep starts for each stimulation line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementParser {
    /// Always start from electrode 0
    #[default]
    Std,
    /// Start from the source electrode of the current line
    Fmmu,
}

/// `[i, (i + dist) % n_el]` for every electrode `i`
pub fn scan_lines(n_el: usize, dist: usize) -> Vec<[usize; 2]> {
    (0..n_el).map(|i| [i, (i + dist) % n_el]).collect()
}

/// Measurement pairs `[n, m]` (voltage `f[n] - f[m]`) for one driven line
pub fn voltage_meter(
    line: [usize; 2],
    n_el: usize,
    step: usize,
    parser: MeasurementParser,
) -> Vec<[usize; 2]> {
    let [drv_a, drv_b] = line;
    let start = match parser {
        MeasurementParser::Std => 0,
        MeasurementParser::Fmmu => drv_a,
    };
    (start..start + n_el)
        .filter_map(|a| {
            let m = a % n_el;
            let n = (m + step) % n_el;
            let touches_driver = [m, n].iter().any(|&e| e == drv_a || e == drv_b);
            (!touches_driver).then_some([n, m])
        })
        .collect()
}

/// Ordered list of driven electrode pairs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulationPattern(Vec<[usize; 2]>);

impl StimulationPattern {
    /// Validate explicit pairs against the electrode count
    pub fn from_pairs(pairs: Vec<[usize; 2]>, n_el: usize) -> Result<Self> {
        if pairs.is_empty() {
            return Err(FemError::Configuration(
                "stimulation pattern is empty".into(),
            ));
        }
        for (i, &[a, b]) in pairs.iter().enumerate() {
            if a >= n_el || b >= n_el {
                return Err(FemError::Configuration(format!(
                    "stimulation line {i} ({a}, {b}) exceeds {n_el} electrodes"
                )));
            }
            if a == b {
                return Err(FemError::Configuration(format!(
                    "stimulation line {i} drives electrode {a} against itself"
                )));
            }
        }
        Ok(Self(pairs))
    }

    /// Default pattern: each electrode against the one `dist` further on
    pub fn scan(n_el: usize, dist: usize) -> Result<Self> {
        if dist == 0 || dist >= n_el {
            return Err(FemError::Configuration(format!(
                "excitation distance {dist} must lie in 1..{n_el}"
            )));
        }
        Self::from_pairs(scan_lines(n_el, dist), n_el)
    }

    /// Neighbouring electrodes
    pub fn adjacent(n_el: usize) -> Result<Self> {
        Self::scan(n_el, 1)
    }

    /// Diametrically opposed electrodes
    pub fn opposition(n_el: usize) -> Result<Self> {
        Self::scan(n_el, n_el / 2)
    }

    /// Parse whitespace-separated `a,b` tokens.
    ///
    /// Returns `Ok(None)` when a token is not a pair of integers, and an
    /// error when the pairs parse but do not describe one line per
    /// electrode.
    pub fn parse(text: &str, n_el: usize) -> Result<Option<Self>> {
        let mut pairs = Vec::new();
        for token in text.split_whitespace() {
            let parsed = token.split_once(',').and_then(|(a, b)| {
                Some([a.trim().parse::<usize>().ok()?, b.trim().parse::<usize>().ok()?])
            });
            match parsed {
                Some(pair) => pairs.push(pair),
                None => return Ok(None),
            }
        }
        if pairs.is_empty() {
            return Ok(None);
        }
        if pairs.len() != n_el {
            return Err(FemError::Configuration(format!(
                "stimulation file has {} lines for {n_el} electrodes",
                pairs.len()
            )));
        }
        Self::from_pairs(pairs, n_el).map(Some)
    }

    pub fn lines(&self) -> &[[usize; 2]] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read a custom pattern, falling back to `scan(n_el, dist)` when the file is
/// absent or unparsable
pub fn load_stimulation_file(path: &Path, n_el: usize, dist: usize) -> Result<StimulationPattern> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!(
                "no stimulation file at {}, using distance-{dist} scan",
                path.display()
            );
            return StimulationPattern::scan(n_el, dist);
        }
        Err(e) => return Err(e.into()),
    };
    match StimulationPattern::parse(&text, n_el)? {
        Some(pattern) => {
            log::info!(
                "loaded {} stimulation lines from {}",
                pattern.len(),
                path.display()
            );
            Ok(pattern)
        }
        None => {
            log::warn!(
                "malformed stimulation file {}, using distance-{dist} scan",
                path.display()
            );
            StimulationPattern::scan(n_el, dist)
        }
    }
}

/// Stimulation pattern together with the measurement rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub pattern: StimulationPattern,
    pub n_el: usize,
    pub step: usize,
    pub parser: MeasurementParser,
}

impl Protocol {
    pub fn new(
        pattern: StimulationPattern,
        n_el: usize,
        step: usize,
        parser: MeasurementParser,
    ) -> Result<Self> {
        if step == 0 || step >= n_el {
            return Err(FemError::Configuration(format!(
                "measurement step {step} must lie in 1..{n_el}"
            )));
        }
        let protocol = Self {
            pattern,
            n_el,
            step,
            parser,
        };
        if protocol.num_measurements() == 0 {
            return Err(FemError::Configuration(
                "protocol yields no measurements".into(),
            ));
        }
        Ok(protocol)
    }

    /// Measurement pairs of stimulation line `line`
    pub fn pairs(&self, line: usize) -> Vec<[usize; 2]> {
        voltage_meter(self.pattern.lines()[line], self.n_el, self.step, self.parser)
    }

    /// Total length of one frame
    pub fn num_measurements(&self) -> usize {
        (0..self.pattern.len()).map(|i| self.pairs(i).len()).sum()
    }
}
