//! Statistical primitives for evaluating time-to-event forecasts.
//!
//! This crate provides the building blocks the forecast error metrics are
//! computed from:
//!
//! - **Descriptive statistics**: Mean and root mean square used to pool per-case values
//! - **Empirical CDF**: Right-continuous step CDF of a sample, with an exact L1 distance
//! - **Adaptive quadrature**: Gauss-Kronrod integration that reports, rather than hides,
//!   failure to reach its tolerance
//!
//! # Modules
//!
//! - [`descriptive`]: Summary statistics for pooling values
//! - [`ecdf`]: Empirical cumulative distribution functions
//! - [`quadrature`]: Adaptive numerical integration on finite intervals
//!
//! # Examples
//!
//! ## Comparing two samples through their CDFs
//!
//! ```
//! use tte_stats::{ecdf::EmpiricalCdf, quadrature::AdaptiveQuadrature};
//!
//! let predicted = EmpiricalCdf::new([4.0, 6.0]).unwrap();
//! let observed = EmpiricalCdf::new([5.0, 6.0]).unwrap();
//!
//! let jumps = [predicted.values(), observed.values()].concat();
//! let outcome = AdaptiveQuadrature::default().integrate_with_points(
//!     |x| (predicted.eval(x) - observed.eval(x)).abs(),
//!     0.0,
//!     25.0,
//!     &jumps,
//! );
//! let exact = predicted.l1_distance(&observed, 0.0, 25.0);
//! assert_eq!(exact, 0.5);
//! assert!((outcome.value - exact).abs() < 1e-12);
//! ```

pub mod descriptive;
pub mod ecdf;
pub mod quadrature;
