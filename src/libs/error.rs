#[derive(Debug, Clone, PartialEq)]
pub enum MutkError {
    /// Structural contradiction in the pedigree: (member name, reason)
    PedigreeInvalid((String, String)),
    /// The Newick parser rejected a somatic sample string: (member name, reason)
    SomaticParseError((String, String)),
    /// A sex-linked model found a vertex with descendants but no resolved sex:
    /// (vertex label, model name)
    InvalidSex((String, String)),
    /// Inheritance model name not recognized
    ModelUnsupported(String),
}

impl std::fmt::Display for MutkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PedigreeInvalid((_, reason)) => {
                write!(f, "Unable to construct graph for pedigree; {reason}")
            }
            Self::SomaticParseError((name, reason)) => write!(
                f,
                "Unable to parse somatic data for individual '{name}'; {reason}"
            ),
            Self::InvalidSex((label, model)) => write!(
                f,
                "{model} inheritance requires every individual to have a known sex; the sex of '{label}' is unresolved"
            ),
            Self::ModelUnsupported(name) => write!(
                f,
                "Inheritance model '{name}' is invalid or not implemented"
            ),
        }
    }
}

impl std::error::Error for MutkError {}

impl MutkError {
    /// Name of the member or vertex the error points at.
    pub fn subject(&self) -> &str {
        match self {
            Self::PedigreeInvalid((name, _))
            | Self::SomaticParseError((name, _))
            | Self::InvalidSex((name, _))
            | Self::ModelUnsupported(name) => name,
        }
    }
}
