use {
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

/// WACCM4 sea-ice perturbation experiments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Experiment {
    Hit,
    Fit,
    Fict,
    Fic,
    Cit,
    Fsub,
    Fpol,
    /// Control run, single catalog source
    Ctlq,
}

impl Experiment {
    pub const ALL: [Experiment; 8] = [
        Experiment::Hit,
        Experiment::Fit,
        Experiment::Fict,
        Experiment::Fic,
        Experiment::Cit,
        Experiment::Fsub,
        Experiment::Fpol,
        Experiment::Ctlq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Experiment::Hit => "HIT",
            Experiment::Fit => "FIT",
            Experiment::Fict => "FICT",
            Experiment::Fic => "FIC",
            Experiment::Cit => "CIT",
            Experiment::Fsub => "FSUB",
            Experiment::Fpol => "FPOL",
            Experiment::Ctlq => "CTLQ",
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Experiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Experiment::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown experiment {:?}", s))
    }
}

/// QBO phase used to classify ensemble members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Westerly phase (QBO-W)
    Positive,
    /// QBO-N
    Neutral,
    /// Easterly phase (QBO-E)
    Negative,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Positive, Phase::Neutral, Phase::Negative];

    /// Tag used in catalog file names
    pub fn tag(self) -> &'static str {
        match self {
            Phase::Positive => "pos",
            Phase::Neutral => "non",
            Phase::Negative => "neg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Positive => "QBO-W",
            Phase::Neutral => "QBO-N",
            Phase::Negative => "QBO-E",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Phase::Positive => "positive",
            Phase::Neutral => "neutral",
            Phase::Negative => "negative",
        })
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" | "pos" => Ok(Phase::Positive),
            "neutral" | "non" => Ok(Phase::Neutral),
            "negative" | "neg" => Ok(Phase::Negative),
            _ => Err(format!("unknown QBO phase {:?}", s)),
        }
    }
}

/// Vertical extent of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Single level, `[members, time, lat, lon]`
    Surface,
    /// Spatially averaged profile, `[members, time, level]`
    Profile,
}

/// Output frequency of the model archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Monthly,
}

impl Frequency {
    pub fn directory(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
        }
    }
}
