use std::path::PathBuf;

use crate::graphs::relationship::InheritanceModel;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct StandardArgs {
    /// Pedigree table file
    pub file: PathBuf,

    /// Inheritance model: autosomal, maternal, paternal, mitochondrial,
    /// x-linked, y-linked, w-linked or z-linked
    #[cfg_attr(feature = "clap", arg(short = 'M', long, default_value = "autosomal"))]
    pub model: InheritanceModel,

    /// Germline mutation rate, scales pedigree branch lengths
    #[cfg_attr(feature = "clap", arg(long, default_value_t = 1.0))]
    pub mu: f64,

    /// Somatic mutation rate, scales sample-tree branch lengths
    #[cfg_attr(feature = "clap", arg(long, default_value_t = 1.0))]
    pub mu_somatic: f64,

    /// List of known sequenced samples (one ID per row)
    #[cfg_attr(feature = "clap", arg(short = 'S', long))]
    pub samples: Option<PathBuf>,

    /// Rescale every somatic tree to a total leaf depth of 1
    #[cfg_attr(feature = "clap", arg(long))]
    pub normalize: bool,

    /// Output file (stdout if omitted)
    #[cfg_attr(feature = "clap", arg(short = 'o', long))]
    pub output: Option<PathBuf>,
}

impl Default for StandardArgs {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            model: InheritanceModel::Autosomal,
            mu: 1.0,
            mu_somatic: 1.0,
            samples: None,
            normalize: false,
            output: None,
        }
    }
}
