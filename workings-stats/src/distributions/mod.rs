//! Probability distributions: normal, t, chi-squared, F, and the discrete
//! probability calculators (Poisson, hypergeometric)

pub mod chi;
mod discrete;
pub mod f;
pub mod normal;
pub mod t;

pub use chi::{chi_cdf, chi_inv};
pub use discrete::{
    hypergeometric, poisson_exact, poisson_normal, Hypergeometric, HypergeometricResult,
    PoissonApproxResult, PoissonExact, PoissonExactResult, PoissonNormal, PoissonTerm,
    POISSON_EXACT_CEILING,
};
pub use f::{f_cdf, f_inv};
pub use normal::{normal_cdf, standard_normal_cdf};
pub use t::{t_cdf, t_inv};
