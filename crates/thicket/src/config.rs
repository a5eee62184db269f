//! generation and recovery parameters

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// largest per-layer threshold the combinatorial search accepts
pub const MAX_THRESHOLD: usize = 12;

/// default number of search workers per step
pub const DEFAULT_WORKERS: usize = 16;

/// how the share tree and its verification material are built
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Scheme {
    /// additive upper layer, salted-hash verification
    #[default]
    Additive,
    /// threshold upper layer, encrypted markers
    Thresholded,
    /// additive upper layer, markers carrying trustee hints
    Hinted,
    /// full-threshold tree of any depth, hash and marker chains
    Layered,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Additive => write!(f, "additive"),
            Scheme::Thresholded => write!(f, "thresholded"),
            Scheme::Hinted => write!(f, "hinted"),
            Scheme::Layered => write!(f, "layered"),
        }
    }
}

/// field backend selection for drivers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Backend {
    /// ristretto255 scalars
    #[default]
    Ristretto,
    /// vectors over gf(2^16)
    Gf16,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Ristretto => write!(f, "ristretto"),
            Backend::Gf16 => write!(f, "gf16"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub scheme: Scheme,
    /// number of real trustees
    pub trustees: usize,
    /// requested anonymity set size, never below `trustees`
    pub anonymity_size: usize,
    /// leaves needed to rebuild one subsecret
    pub absolute_threshold: usize,
    /// subsecrets in the upper layer (two-layer schemes)
    pub no_of_subsecrets: usize,
    /// leaves-layer threshold as a percentage of leaves per subsecret
    pub percentage: usize,
    /// upper-layer threshold as a percentage of subsecrets (thresholded)
    pub percentage_upper: usize,
    /// largest fan-out per layer (layered)
    pub largest: usize,
    /// smallest fan-out per layer (layered)
    pub smallest: usize,
    /// trim leaf parents so every trustee holds exactly one leaf (layered)
    pub distinguishable: bool,
    /// size of the hinted trustee set (hinted)
    pub hints: usize,
    /// search workers per step
    pub workers: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            scheme: Scheme::Additive,
            trustees: 20,
            anonymity_size: 30,
            absolute_threshold: 4,
            no_of_subsecrets: 5,
            percentage: 50,
            percentage_upper: 60,
            largest: 5,
            smallest: 3,
            distinguishable: false,
            hints: 3,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Params {
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// number of packets in the anonymity set
    pub fn anonymity_set_size(&self) -> usize {
        self.anonymity_size.max(self.trustees)
    }

    /// floor(100 · absolute_threshold / percentage)
    pub fn leaves_per_subsecret(&self) -> usize {
        100 * self.absolute_threshold / self.percentage.max(1)
    }

    /// ceil(percentage_upper · no_of_subsecrets / 100)
    pub fn upper_threshold(&self) -> usize {
        (self.percentage_upper * self.no_of_subsecrets).div_ceil(100)
    }

    /// largest subset size the recovery search tries per step
    pub fn search_bound(&self) -> usize {
        match self.scheme {
            Scheme::Layered => self.largest,
            _ => self.absolute_threshold,
        }
    }

    /// reject parameter sets before any share is generated
    pub fn validate(&self) -> Result<()> {
        if self.trustees < 2 {
            return Err(Error::Config(format!("need at least 2 trustees, got {}", self.trustees)));
        }
        if self.absolute_threshold < 2 || self.absolute_threshold > self.trustees {
            return Err(Error::InvalidThreshold {
                threshold: self.absolute_threshold,
                parts: self.trustees,
            });
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be positive".into()));
        }
        match self.scheme {
            Scheme::Additive | Scheme::Thresholded | Scheme::Hinted => self.validate_two_layer()?,
            Scheme::Layered => self.validate_layered()?,
        }
        let bound = self.search_bound();
        if bound > MAX_THRESHOLD {
            return Err(Error::VeryLargeThreshold { threshold: bound, bound: MAX_THRESHOLD });
        }
        Ok(())
    }

    fn validate_two_layer(&self) -> Result<()> {
        if self.percentage == 0 || self.percentage > 100 {
            return Err(Error::Config(format!("percentage {} outside 1..=100", self.percentage)));
        }
        if self.no_of_subsecrets < 2 {
            return Err(Error::Config("need at least 2 subsecrets".into()));
        }
        if self.scheme == Scheme::Thresholded {
            if self.percentage_upper == 0 || self.percentage_upper > 100 {
                return Err(Error::Config(format!(
                    "upper percentage {} outside 1..=100",
                    self.percentage_upper
                )));
            }
            let t = self.upper_threshold();
            if t < 2 {
                return Err(Error::InvalidThreshold { threshold: t, parts: self.no_of_subsecrets });
            }
        }
        if self.scheme == Scheme::Hinted && (self.hints == 0 || self.hints > self.trustees) {
            return Err(Error::Config(format!(
                "hinted set of {} outside 1..={}",
                self.hints, self.trustees
            )));
        }
        Ok(())
    }

    fn validate_layered(&self) -> Result<()> {
        if self.smallest < 2 || self.smallest > self.largest {
            return Err(Error::Config(format!(
                "fan-out range [{}, {}] is empty or below 2",
                self.smallest, self.largest
            )));
        }
        Ok(())
    }
}
